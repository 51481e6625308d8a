use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    errors::ServiceError,
    handlers::common::{PaginatedResponse, PaginationParams},
    services::orders::{OrderDetails, OrderFilter},
    AppState,
};

/// Creates the router for customer-facing order endpoints.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/:id/cancel", post(cancel_order))
}

/// List the caller's orders, newest first. Admins see every order.
async fn list_orders(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<PaginatedResponse<OrderDetails>>, ServiceError> {
    let filter = if user.is_admin() {
        OrderFilter::default()
    } else {
        OrderFilter {
            user_id: Some(user.user_id),
            ..Default::default()
        }
    };

    let (orders, total) = state
        .services
        .orders
        .list_orders(filter, pagination.page, pagination.per_page)
        .await?;

    Ok(Json(PaginatedResponse::new(
        orders,
        pagination.page,
        pagination.per_page,
        total,
    )))
}

/// Fetch one order the caller is allowed to see.
async fn get_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetails>, ServiceError> {
    let order = state.services.orders.get_order(id).await?;

    if !user.is_admin() && order.user_id != user.user_id {
        return Err(ServiceError::Forbidden("Forbidden".to_string()));
    }

    Ok(Json(order))
}

/// Cancel a pending order.
///
/// Customers may cancel only their own orders; admins may cancel any
/// pending order. Cancellation restores each item's stock.
async fn cancel_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderDetails>, ServiceError> {
    let order = state.services.order_status.cancel_order(id, &user).await?;
    let details = state.services.orders.details(&*state.db, order).await?;
    Ok(Json(details))
}
