use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        cart::CartService,
        inventory::InventoryService,
        order_status::OrderStatusService,
        orders::OrderService,
        payments::{PaymentGateway, PaymentOutcome},
    },
};

/// Successful checkout result.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutConfirmation {
    pub order_id: Uuid,
    pub total_cents: i64,
    pub delivery_estimate: DateTime<Utc>,
}

/// The checkout pipeline: cart -> validate -> reserve -> pay -> finalize.
///
/// Reservation (order creation + stock deduction) commits as one
/// transaction before the payment await, so no inventory row is held
/// while the gateway call is in flight. Every exit after reservation
/// leaves the order in exactly one of `paid` or `canceled`.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    cart: Arc<CartService>,
    inventory: Arc<InventoryService>,
    orders: Arc<OrderService>,
    order_status: Arc<OrderStatusService>,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CheckoutService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<DatabaseConnection>,
        cart: Arc<CartService>,
        inventory: Arc<InventoryService>,
        orders: Arc<OrderService>,
        order_status: Arc<OrderStatusService>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            cart,
            inventory,
            orders,
            order_status,
            gateway,
            event_sender,
            config,
        }
    }

    /// Runs the full checkout pipeline for one user session.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn process(
        &self,
        user_id: Uuid,
        session_id: &str,
    ) -> Result<CheckoutConfirmation, ServiceError> {
        // ReadCart: nothing to sell means nothing to reserve.
        let summary = self.cart.summary(session_id).await?;
        if summary.item_count == 0 {
            return Err(ServiceError::InvalidOperation("Cart is empty.".to_string()));
        }

        // Validate: surface a friendly guard failure before creating anything.
        self.inventory.validate_stock(&*self.db, &summary.items).await?;

        // Reserve: order creation and stock deduction commit as one unit.
        // The conditional decrement re-checks stock, so a concurrent
        // checkout that won the race rolls this transaction back instead
        // of overselling.
        let txn = self.db.begin().await?;
        let order = self.orders.create_order(&txn, user_id, &summary).await?;
        self.inventory.deduct_stock(&txn, &summary.items).await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order.id))
            .await;
        self.event_sender
            .send_or_log(Event::StockDeducted { order_id: order.id })
            .await;

        // Pay: the single suspension point. No lock or transaction is held
        // across this await; a timeout or transport failure resolves to a
        // decline and runs the same compensation.
        let deadline = Duration::from_secs(self.config.payment_timeout_secs);
        let outcome = match tokio::time::timeout(
            deadline,
            self.gateway.process_payment(order.total_cents, user_id),
        )
        .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                warn!(order_id = %order.id, error = %err, "Payment call failed; treating as declined");
                PaymentOutcome::Declined
            }
            Err(_) => {
                warn!(order_id = %order.id, "Payment call timed out; treating as declined");
                PaymentOutcome::Declined
            }
        };

        match outcome {
            PaymentOutcome::Declined => {
                // Compensate: the order flips to canceled. Stock stays at
                // the post-deduction level on this path (see DESIGN.md).
                self.order_status.mark_payment_declined(order.id).await?;
                self.event_sender
                    .send_or_log(Event::PaymentDeclined {
                        order_id: order.id,
                        amount_cents: order.total_cents,
                    })
                    .await;

                Err(ServiceError::PaymentDeclined(
                    "Payment declined.".to_string(),
                ))
            }
            PaymentOutcome::Approved => {
                let order = self.order_status.mark_paid(order.id).await?;
                self.cart.clear(session_id).await?;

                self.event_sender
                    .send_or_log(Event::PaymentApproved {
                        order_id: order.id,
                        amount_cents: order.total_cents,
                    })
                    .await;
                self.event_sender
                    .send_or_log(Event::CheckoutCompleted {
                        order_id: order.id,
                        user_id,
                    })
                    .await;

                info!(order_id = %order.id, total_cents = order.total_cents, "Checkout completed");
                Ok(CheckoutConfirmation {
                    order_id: order.id,
                    total_cents: order.total_cents,
                    delivery_estimate: self.estimate_delivery(),
                })
            }
        }
    }

    fn estimate_delivery(&self) -> DateTime<Utc> {
        Utc::now() + ChronoDuration::days(self.config.delivery_estimate_days)
    }
}
