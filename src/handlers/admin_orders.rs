use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    entities::order::OrderStatus,
    errors::ServiceError,
    handlers::common::PaginatedResponse,
    services::orders::{OrderDetails, OrderFilter},
    AppState,
};

/// Creates the router for administrative order endpoints.
pub fn admin_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/status", post(change_status))
}

#[derive(Debug, Deserialize)]
struct AdminListQuery {
    #[serde(default = "default_page")]
    page: u64,
    #[serde(default = "default_per_page")]
    per_page: u64,
    status: Option<String>,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

/// List all orders, optionally filtered by status.
async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AdminListQuery>,
) -> Result<Json<PaginatedResponse<OrderDetails>>, ServiceError> {
    let status = query
        .status
        .as_deref()
        .map(parse_status)
        .transpose()?;

    let filter = OrderFilter {
        user_id: None,
        status,
    };

    let (orders, total) = state
        .services
        .orders
        .list_orders(filter, query.page, query.per_page)
        .await?;

    Ok(Json(PaginatedResponse::new(
        orders,
        query.page,
        query.per_page,
        total,
    )))
}

/// Fetch any order.
async fn get_order(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetails>, ServiceError> {
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(order))
}

/// Change an order's status.
///
/// Shipped orders cannot be canceled; changing to `canceled` from any
/// other status restores stock.
async fn change_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeStatusRequest>,
) -> Result<Json<OrderDetails>, ServiceError> {
    let new_status = parse_status(&payload.status)?;

    let order = state
        .services
        .order_status
        .change_status(id, new_status)
        .await?;
    let details = state.services.orders.details(&*state.db, order).await?;
    Ok(Json(details))
}

fn parse_status(raw: &str) -> Result<OrderStatus, ServiceError> {
    OrderStatus::from_str(raw)
        .map_err(|_| ServiceError::ValidationError("Invalid status".to_string()))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeStatusRequest {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_accepts_known_values() {
        assert_eq!(parse_status("pending").unwrap(), OrderStatus::Pending);
        assert_eq!(parse_status("paid").unwrap(), OrderStatus::Paid);
        assert_eq!(parse_status("shipped").unwrap(), OrderStatus::Shipped);
        assert_eq!(parse_status("canceled").unwrap(), OrderStatus::Canceled);
    }

    #[test]
    fn parse_status_rejects_unknown_values() {
        assert!(parse_status("refunded").is_err());
        assert!(parse_status("").is_err());
    }
}
