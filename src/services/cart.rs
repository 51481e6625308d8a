use crate::{
    config::AppConfig,
    entities::{
        product::{self, ProductStatus},
        Product,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    sessions::SessionStore,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Stock availability label shown on cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

/// Priced cart line, derived fresh from live product state on every
/// summary request. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub qty: i32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub stock_available: i32,
    pub stock_status: StockStatus,
    pub image_url: Option<String>,
}

/// Structured cart contents: priced lines plus aggregates.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartSummary {
    pub items: Vec<CartLine>,
    pub total_cents: i64,
    pub item_count: usize,
}

impl CartSummary {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_cents: 0,
            item_count: 0,
        }
    }
}

/// Session cart operations and summary materialization.
///
/// Raw carts live in the session store as product-id/quantity pairs; this
/// service joins them against live catalog state to price them.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    sessions: Arc<SessionStore>,
    event_sender: Arc<EventSender>,
    config: Arc<AppConfig>,
}

impl CartService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sessions: Arc<SessionStore>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            db,
            sessions,
            event_sender,
            config,
        }
    }

    /// Adds a product to the session cart, merging additively into any
    /// existing quantity. The product must exist and be active.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        session_id: &str,
        product_id: Uuid,
        qty: i32,
    ) -> Result<CartSummary, ServiceError> {
        if qty <= 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be positive".to_string(),
            ));
        }

        let product = Product::find_by_id(product_id)
            .filter(product::Column::Status.eq(ProductStatus::Active))
            .one(&*self.db)
            .await?;
        if product.is_none() {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }

        self.sessions
            .with_cart(session_id, |cart| cart.add(product_id, qty));

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                session_id: session_id.to_string(),
                product_id,
            })
            .await;

        info!(session_id, %product_id, qty, "Added item to cart");
        self.summary(session_id).await
    }

    /// Sets the quantity of a cart entry; a non-positive quantity removes it.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        session_id: &str,
        product_id: Uuid,
        qty: i32,
    ) -> Result<CartSummary, ServiceError> {
        self.sessions
            .with_cart(session_id, |cart| cart.set(product_id, qty));

        self.event_sender
            .send_or_log(Event::CartUpdated {
                session_id: session_id.to_string(),
            })
            .await;

        self.summary(session_id).await
    }

    /// Removes a cart entry, if present.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        session_id: &str,
        product_id: Uuid,
    ) -> Result<CartSummary, ServiceError> {
        self.sessions
            .with_cart(session_id, |cart| cart.remove(product_id));

        self.event_sender
            .send_or_log(Event::CartUpdated {
                session_id: session_id.to_string(),
            })
            .await;

        self.summary(session_id).await
    }

    /// Destroys the session cart. Idempotent.
    #[instrument(skip(self))]
    pub async fn clear(&self, session_id: &str) -> Result<CartSummary, ServiceError> {
        self.sessions.clear_cart(session_id);

        self.event_sender
            .send_or_log(Event::CartCleared {
                session_id: session_id.to_string(),
            })
            .await;

        info!(session_id, "Cleared cart");
        Ok(CartSummary::empty())
    }

    /// Materializes the session cart into priced lines.
    ///
    /// Only active products are joined; entries whose product is missing or
    /// inactive are dropped silently. Quantities are clamped to at least 1.
    #[instrument(skip(self))]
    pub async fn summary(&self, session_id: &str) -> Result<CartSummary, ServiceError> {
        let cart = self.sessions.cart(session_id);
        if cart.is_empty() {
            return Ok(CartSummary::empty());
        }

        let products = Product::find()
            .filter(product::Column::Id.is_in(cart.product_ids()))
            .filter(product::Column::Status.eq(ProductStatus::Active))
            .all(&*self.db)
            .await?;

        let products_by_id: HashMap<Uuid, product::Model> =
            products.into_iter().map(|p| (p.id, p)).collect();

        let mut items = Vec::new();
        let mut total_cents: i64 = 0;

        for (product_id, qty) in cart.entries() {
            let Some(product) = products_by_id.get(&product_id) else {
                // Product deleted or archived since it was added; skip it.
                continue;
            };

            let qty = qty.max(1);
            let subtotal_cents = product.price_cents * i64::from(qty);
            total_cents += subtotal_cents;

            items.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                sku: product.sku.clone(),
                qty,
                unit_price_cents: product.price_cents,
                subtotal_cents,
                stock_available: product.qty,
                stock_status: stock_status(product.qty, self.config.low_stock_threshold),
                image_url: product.image_url.clone(),
            });
        }

        let item_count = items.len();
        Ok(CartSummary {
            items,
            total_cents,
            item_count,
        })
    }
}

/// Labels a stock level relative to the low-stock threshold.
fn stock_status(available: i32, threshold: i32) -> StockStatus {
    if available <= 0 {
        StockStatus::OutOfStock
    } else if available <= threshold {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}
