use crate::handlers::common::validate_input;
use crate::{errors::ServiceError, sessions::SessionId, AppState};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::services::cart::CartSummary;

/// Creates the router for session cart endpoints.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_summary))
        .route(
            "/items/:product_id",
            post(add_item).put(update_item).delete(remove_item),
        )
        .route("/clear", post(clear_cart))
}

/// Current cart summary
async fn get_summary(
    State(state): State<AppState>,
    SessionId(session): SessionId,
) -> Result<Json<CartSummary>, ServiceError> {
    let summary = state.services.cart.summary(&session).await?;
    Ok(Json(summary))
}

/// Add a product to the cart (quantity defaults to 1)
async fn add_item(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<AddItemRequest>,
) -> Result<Json<CartSummary>, ServiceError> {
    validate_input(&payload)?;

    let summary = state
        .services
        .cart
        .add_item(&session, product_id, payload.qty)
        .await?;
    Ok(Json(summary))
}

/// Set the quantity of a cart entry; zero or less removes it
async fn update_item(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<CartSummary>, ServiceError> {
    let summary = state
        .services
        .cart
        .update_item(&session, product_id, payload.qty)
        .await?;
    Ok(Json(summary))
}

/// Remove a cart entry, if present
async fn remove_item(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    Path(product_id): Path<Uuid>,
) -> Result<Json<CartSummary>, ServiceError> {
    let summary = state.services.cart.remove_item(&session, product_id).await?;
    Ok(Json(summary))
}

/// Destroy the cart
async fn clear_cart(
    State(state): State<AppState>,
    SessionId(session): SessionId,
) -> Result<Json<CartSummary>, ServiceError> {
    let summary = state.services.cart.clear(&session).await?;
    Ok(Json(summary))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddItemRequest {
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    #[serde(default = "default_qty")]
    pub qty: i32,
}

fn default_qty() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub qty: i32,
}
