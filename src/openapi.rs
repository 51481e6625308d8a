use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::order::OrderStatus;
use crate::entities::product::ProductStatus;
use crate::errors::ErrorResponse;
use crate::handlers::admin_orders::ChangeStatusRequest;
use crate::handlers::carts::{AddItemRequest, UpdateItemRequest};
use crate::handlers::checkout::CheckoutResponse;
use crate::services::cart::{CartLine, CartSummary, StockStatus};
use crate::services::checkout::CheckoutConfirmation;
use crate::services::orders::{OrderDetails, OrderItemDetails};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Orderflow API",
        version = "0.1.0",
        description = "Checkout and order lifecycle API: session carts, inventory-guarded \
checkout with simulated asynchronous payment, and customer/admin order state management. \
All currency values are integer cents. Identity is supplied by an upstream collaborator \
via the X-User-Id and X-User-Role headers; carts are scoped by X-Session-Id."
    ),
    components(schemas(
        CartSummary,
        CartLine,
        StockStatus,
        AddItemRequest,
        UpdateItemRequest,
        CheckoutResponse,
        CheckoutConfirmation,
        OrderDetails,
        OrderItemDetails,
        OrderStatus,
        ProductStatus,
        ChangeStatusRequest,
        ErrorResponse,
    )),
    tags(
        (name = "cart", description = "Session cart operations"),
        (name = "checkout", description = "Checkout pipeline"),
        (name = "orders", description = "Customer order access and cancellation"),
        (name = "admin", description = "Administrative order management"),
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at /docs, serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
