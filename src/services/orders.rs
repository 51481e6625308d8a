use crate::{
    entities::{
        order::{self, OrderStatus},
        order_item, Order, OrderItem, Product,
    },
    errors::ServiceError,
    services::cart::CartSummary,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Serialized order line, including a best-effort product snapshot for
/// display. Product name and sku are `None` when the product has since
/// been removed from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemDetails {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub sku: Option<String>,
    pub unit_price_cents: i64,
    pub qty: i32,
    pub subtotal_cents: i64,
}

/// Serialized order including its immutable item snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub placed_at: DateTime<Utc>,
    pub items: Vec<OrderItemDetails>,
}

/// Filter for order listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

/// Durable order ledger: creates orders as immutable price/quantity
/// snapshots and serves them back for display.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates an order from a cart summary inside the caller's transaction.
    ///
    /// Each line's unit price, quantity, and subtotal are frozen as the
    /// permanent snapshot; later product price changes never touch them.
    #[instrument(skip(self, txn, summary), fields(user_id = %user_id))]
    pub async fn create_order<C: ConnectionTrait>(
        &self,
        txn: &C,
        user_id: Uuid,
        summary: &CartSummary,
    ) -> Result<order::Model, ServiceError> {
        let order_id = Uuid::new_v4();
        let now = Utc::now();

        let order = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            status: Set(OrderStatus::Pending),
            total_cents: Set(summary.total_cents),
            placed_at: Set(now),
            updated_at: Set(Some(now)),
        };
        let order = order.insert(txn).await?;

        for line in &summary.items {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                unit_price_cents: Set(line.unit_price_cents),
                qty: Set(line.qty),
                subtotal_cents: Set(line.subtotal_cents),
            };
            item.insert(txn).await?;
        }

        info!(order_id = %order_id, total_cents = summary.total_cents, "Order created");
        Ok(order)
    }

    /// Recomputes `total_cents` from the item snapshots.
    ///
    /// For orders assembled programmatically rather than from a cart
    /// summary. Item prices are immutable, so this never "repairs" totals
    /// after catalog price drift.
    #[instrument(skip(self, conn))]
    pub async fn recompute_total<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(conn)
            .await?;

        let total_cents: i64 = items.iter().map(|item| item.subtotal_cents).sum();

        let mut active: order::ActiveModel = order.into();
        active.total_cents = Set(total_cents);
        active.updated_at = Set(Some(Utc::now()));
        Ok(active.update(conn).await?)
    }

    /// Fetches a single order with its items.
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetails, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        self.details(&*self.db, order).await
    }

    /// Lists orders newest first, optionally scoped to one user or status.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        filter: OrderFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderDetails>, u64), ServiceError> {
        let mut query = Order::find().order_by_desc(order::Column::PlacedAt);

        if let Some(user_id) = filter.user_id {
            query = query.filter(order::Column::UserId.eq(user_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(order::Column::Status.eq(status));
        }

        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            details.push(self.details(&*self.db, order).await?);
        }

        Ok((details, total))
    }

    /// Materializes an order model into its serialized form, joining item
    /// rows against the catalog for display names.
    pub async fn details<C: ConnectionTrait>(
        &self,
        conn: &C,
        order: order::Model,
    ) -> Result<OrderDetails, ServiceError> {
        let rows = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .find_also_related(Product)
            .all(conn)
            .await?;

        let items = rows
            .into_iter()
            .map(|(item, product)| OrderItemDetails {
                id: item.id,
                order_id: item.order_id,
                product_id: item.product_id,
                product_name: product.as_ref().map(|p| p.name.clone()),
                sku: product.as_ref().map(|p| p.sku.clone()),
                unit_price_cents: item.unit_price_cents,
                qty: item.qty,
                subtotal_cents: item.subtotal_cents,
            })
            .collect();

        Ok(OrderDetails {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            total_cents: order.total_cents,
            placed_at: order.placed_at,
            items,
        })
    }

    /// Loads the raw item rows for an order (for stock restoration).
    pub async fn items<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
    ) -> Result<Vec<order_item::Model>, ServiceError> {
        Ok(OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(conn)
            .await?)
    }
}
