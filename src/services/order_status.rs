use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, TransactionTrait};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::CurrentUser,
    entities::{
        order::{self, OrderStatus},
        Order,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{inventory::InventoryService, orders::OrderService},
};

/// The authoritative order state machine.
///
/// Applied by the checkout pipeline (system-driven transitions out of
/// `pending`) and by customer/admin actions. Guards are asymmetric by
/// initiator: customers may only cancel their own pending orders, while
/// admins may set any status except canceling a shipped order.
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DatabaseConnection>,
    orders: Arc<OrderService>,
    inventory: Arc<InventoryService>,
    event_sender: Arc<EventSender>,
}

impl OrderStatusService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        orders: Arc<OrderService>,
        inventory: Arc<InventoryService>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            orders,
            inventory,
            event_sender,
        }
    }

    /// Whether an administrative status change is allowed.
    ///
    /// The only blocked edge is `shipped -> canceled`; everything else,
    /// including re-opening transitions like `canceled -> shipped`, is
    /// permitted.
    pub fn transition_allowed(from: OrderStatus, to: OrderStatus) -> bool {
        !(from == OrderStatus::Shipped && to == OrderStatus::Canceled)
    }

    /// System transition after an approved payment: `pending -> paid`.
    #[instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let updated = self
            .apply_system_transition(order_id, OrderStatus::Paid)
            .await?;

        self.event_sender
            .send_or_log(Event::OrderPaid(order_id))
            .await;
        self.notify_status_change(order_id, OrderStatus::Pending, OrderStatus::Paid)
            .await;

        Ok(updated)
    }

    /// System transition after a declined payment: `pending -> canceled`.
    ///
    /// Stock is not restored on this path; see DESIGN.md for the recorded
    /// asymmetry with user-initiated cancellation.
    #[instrument(skip(self))]
    pub async fn mark_payment_declined(&self, order_id: Uuid) -> Result<order::Model, ServiceError> {
        let updated = self
            .apply_system_transition(order_id, OrderStatus::Canceled)
            .await?;

        self.event_sender
            .send_or_log(Event::OrderCancelled(order_id))
            .await;
        self.notify_status_change(order_id, OrderStatus::Pending, OrderStatus::Canceled)
            .await;

        Ok(updated)
    }

    /// Customer- or admin-initiated cancellation of a pending order.
    ///
    /// Restores each item's quantity to product stock in the same
    /// transaction that flips the status.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id, role = %actor.role))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        actor: &CurrentUser,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if !actor.is_admin() && order.user_id != actor.user_id {
            return Err(ServiceError::Forbidden("Forbidden".to_string()));
        }

        if order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidOperation(
                "Only pending orders can be canceled".to_string(),
            ));
        }

        let items = self.orders.items(&txn, order_id).await?;
        self.inventory.restore_stock(&txn, &items).await?;

        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Canceled);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(order_id = %order_id, "Order canceled, stock restored");
        self.event_sender
            .send_or_log(Event::StockRestored { order_id })
            .await;
        self.event_sender
            .send_or_log(Event::OrderCancelled(order_id))
            .await;
        self.notify_status_change(order_id, OrderStatus::Pending, OrderStatus::Canceled)
            .await;

        Ok(updated)
    }

    /// Administrative status change.
    ///
    /// Setting the current status again is a no-op (in particular, no
    /// repeated stock restoration). Changing to `canceled` from any other
    /// status restores stock, except that shipped orders cannot be
    /// canceled at all.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let previous = order.status;

        if !Self::transition_allowed(previous, new_status) {
            return Err(ServiceError::InvalidOperation(
                "Cannot cancel a shipped order".to_string(),
            ));
        }

        if previous == new_status {
            return Ok(order);
        }

        if new_status == OrderStatus::Canceled {
            let items = self.orders.items(&txn, order_id).await?;
            self.inventory.restore_stock(&txn, &items).await?;
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(
            order_id = %order_id,
            from = %previous,
            to = %new_status,
            "Order status updated"
        );
        if new_status == OrderStatus::Canceled {
            self.event_sender
                .send_or_log(Event::StockRestored { order_id })
                .await;
        }
        self.notify_status_change(order_id, previous, new_status).await;

        Ok(updated)
    }

    /// Guarded `pending -> *` transition used by the checkout pipeline.
    async fn apply_system_transition(
        &self,
        order_id: Uuid,
        to: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if order.status != OrderStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is not pending",
                order_id
            )));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(to);
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&txn).await?;

        txn.commit().await?;
        Ok(updated)
    }

    async fn notify_status_change(&self, order_id: Uuid, from: OrderStatus, to: OrderStatus) {
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: from.to_string(),
                new_status: to.to_string(),
            })
            .await;
    }
}
