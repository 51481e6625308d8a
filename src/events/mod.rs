use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the checkout and order lifecycle subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(Uuid),
    OrderPaid(Uuid),
    OrderCancelled(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },

    // Payment events
    PaymentApproved {
        order_id: Uuid,
        amount_cents: i64,
    },
    PaymentDeclined {
        order_id: Uuid,
        amount_cents: i64,
    },

    // Inventory events
    StockDeducted {
        order_id: Uuid,
    },
    StockRestored {
        order_id: Uuid,
    },

    // Cart events
    CartItemAdded {
        session_id: String,
        product_id: Uuid,
    },
    CartUpdated {
        session_id: String,
    },
    CartCleared {
        session_id: String,
    },

    // Checkout events
    CheckoutCompleted {
        order_id: Uuid,
        user_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the bus is down.
    /// Event delivery is best-effort and must never fail a request.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event not delivered: {}", e);
        }
    }
}

/// Consumes events from the bus and dispatches them to their handlers.
/// Runs for the lifetime of the process; exits when all senders drop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated(order_id) => {
                info!(order_id = %order_id, "Order created");
            }
            Event::OrderPaid(order_id) => {
                info!(order_id = %order_id, "Order paid");
            }
            Event::OrderCancelled(order_id) => {
                info!(order_id = %order_id, "Order cancelled");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    order_id = %order_id,
                    from = %old_status,
                    to = %new_status,
                    "Order status changed"
                );
            }
            Event::PaymentApproved {
                order_id,
                amount_cents,
            } => {
                info!(order_id = %order_id, amount_cents, "Payment approved");
            }
            Event::PaymentDeclined {
                order_id,
                amount_cents,
            } => {
                warn!(order_id = %order_id, amount_cents, "Payment declined");
            }
            Event::StockDeducted { order_id } => {
                info!(order_id = %order_id, "Stock deducted for order");
            }
            Event::StockRestored { order_id } => {
                info!(order_id = %order_id, "Stock restored for order");
            }
            Event::CartItemAdded {
                session_id,
                product_id,
            } => {
                info!(session_id = %session_id, product_id = %product_id, "Cart item added");
            }
            Event::CartUpdated { session_id } => {
                info!(session_id = %session_id, "Cart updated");
            }
            Event::CartCleared { session_id } => {
                info!(session_id = %session_id, "Cart cleared");
            }
            Event::CheckoutCompleted { order_id, user_id } => {
                info!(order_id = %order_id, user_id = %user_id, "Checkout completed");
            }
        }
    }

    info!("Event processing loop stopped");
}
