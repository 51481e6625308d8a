use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    errors::ServiceError,
    services::{cart::CartSummary, checkout::CheckoutConfirmation},
    sessions::SessionId,
    AppState,
};

/// Creates the router for checkout endpoints.
pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/", get(review_checkout).post(process_checkout))
}

/// Checkout review: the cart summary about to be purchased.
async fn review_checkout(
    State(state): State<AppState>,
    SessionId(session): SessionId,
) -> Result<Json<CartSummary>, ServiceError> {
    let summary = state.services.cart.summary(&session).await?;
    Ok(Json(summary))
}

/// Run the checkout pipeline and report the outcome.
///
/// Failures respond with `{"success": false, "error": ...}` at the status
/// code of the underlying error; a declined payment is 402 and leaves the
/// order compensated to `canceled`.
async fn process_checkout(
    State(state): State<AppState>,
    SessionId(session): SessionId,
    user: CurrentUser,
) -> Response {
    match state.services.checkout.process(user.user_id, &session).await {
        Ok(confirmation) => (
            StatusCode::OK,
            Json(CheckoutResponse::approved(confirmation)),
        )
            .into_response(),
        Err(err) => (
            err.status_code(),
            Json(CheckoutResponse::failed(err.response_message())),
        )
            .into_response(),
    }
}

/// Checkout outcome envelope.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_estimate: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckoutResponse {
    fn approved(confirmation: CheckoutConfirmation) -> Self {
        Self {
            success: true,
            order_id: Some(confirmation.order_id),
            total_cents: Some(confirmation.total_cents),
            delivery_estimate: Some(confirmation.delivery_estimate),
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            order_id: None,
            total_cents: None,
            delivery_estimate: None,
            error: Some(error),
        }
    }
}
