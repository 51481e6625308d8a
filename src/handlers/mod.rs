pub mod admin_orders;
pub mod carts;
pub mod checkout;
pub mod common;
pub mod orders;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        CartService, CheckoutService, InventoryService, OrderService, OrderStatusService,
        PaymentGateway,
    },
    sessions::SessionStore,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub cart: Arc<CartService>,
    pub inventory: Arc<InventoryService>,
    pub orders: Arc<OrderService>,
    pub order_status: Arc<OrderStatusService>,
    pub checkout: Arc<CheckoutService>,
}

impl AppServices {
    /// Wires the service graph with a caller-supplied payment gateway.
    pub fn new(
        db: Arc<DbPool>,
        sessions: Arc<SessionStore>,
        event_sender: Arc<EventSender>,
        gateway: Arc<dyn PaymentGateway>,
        config: Arc<AppConfig>,
    ) -> Self {
        let cart = Arc::new(CartService::new(
            db.clone(),
            sessions.clone(),
            event_sender.clone(),
            config.clone(),
        ));
        let inventory = Arc::new(InventoryService::new());
        let orders = Arc::new(OrderService::new(db.clone()));
        let order_status = Arc::new(OrderStatusService::new(
            db.clone(),
            orders.clone(),
            inventory.clone(),
            event_sender.clone(),
        ));
        let checkout = Arc::new(CheckoutService::new(
            db,
            cart.clone(),
            inventory.clone(),
            orders.clone(),
            order_status.clone(),
            gateway,
            event_sender,
            config,
        ));

        Self {
            cart,
            inventory,
            orders,
            order_status,
            checkout,
        }
    }
}
