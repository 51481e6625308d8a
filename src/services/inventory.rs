use crate::{
    entities::{
        order_item,
        product::{self, ProductStatus},
        Product,
    },
    errors::ServiceError,
    services::cart::CartLine,
};
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Explicit stock mutation command: a signed quantity delta for one product.
///
/// Applied through a single conditional update so that check and mutation
/// are one atomic step; concurrent checkouts cannot both pass a stale
/// stock check.
#[derive(Debug, Clone, Copy)]
pub struct StockAdjustment {
    pub product_id: Uuid,
    pub delta: i32,
}

impl StockAdjustment {
    pub fn deduct(product_id: Uuid, qty: i32) -> Self {
        Self {
            product_id,
            delta: -qty,
        }
    }

    pub fn restore(product_id: Uuid, qty: i32) -> Self {
        Self {
            product_id,
            delta: qty,
        }
    }
}

/// Guards product stock against the demand of concurrent checkouts.
#[derive(Clone, Default)]
pub struct InventoryService;

impl InventoryService {
    pub fn new() -> Self {
        Self
    }

    /// Read-only precheck that every requested line can be fulfilled.
    ///
    /// All validation completes before any mutation is attempted, so a
    /// failure here leaves no partial state behind.
    #[instrument(skip(self, conn, lines), fields(lines = lines.len()))]
    pub async fn validate_stock<C: ConnectionTrait>(
        &self,
        conn: &C,
        lines: &[CartLine],
    ) -> Result<(), ServiceError> {
        for line in lines {
            let product = Product::find_by_id(line.product_id).one(conn).await?;

            let product = match product {
                Some(p) if p.status == ProductStatus::Active => p,
                _ => {
                    return Err(ServiceError::ProductUnavailable(format!(
                        "Product {} is unavailable.",
                        line.product_id
                    )))
                }
            };

            if product.qty < line.qty {
                return Err(ServiceError::InsufficientStock(format!(
                    "Insufficient stock for product {} ('{}').",
                    product.id, product.name
                )));
            }
        }

        Ok(())
    }

    /// Deducts the purchased quantities from product stock.
    ///
    /// Must run inside the same transaction that creates the order, so
    /// deduction and order existence commit as one unit. A concurrent
    /// shortfall fails the transaction instead of overselling.
    #[instrument(skip(self, txn, lines), fields(lines = lines.len()))]
    pub async fn deduct_stock<C: ConnectionTrait>(
        &self,
        txn: &C,
        lines: &[CartLine],
    ) -> Result<(), ServiceError> {
        for line in lines {
            let affected = self
                .apply_adjustment(txn, StockAdjustment::deduct(line.product_id, line.qty))
                .await?;

            if affected == 0 {
                return Err(ServiceError::InsufficientStock(format!(
                    "Insufficient stock for product {} ('{}').",
                    line.product_id, line.name
                )));
            }
        }

        Ok(())
    }

    /// Adds each item's quantity back to its product's stock.
    ///
    /// Items whose product was removed from the catalog are skipped.
    #[instrument(skip(self, txn, items), fields(items = items.len()))]
    pub async fn restore_stock<C: ConnectionTrait>(
        &self,
        txn: &C,
        items: &[order_item::Model],
    ) -> Result<(), ServiceError> {
        for item in items {
            let affected = self
                .apply_adjustment(txn, StockAdjustment::restore(item.product_id, item.qty))
                .await?;

            if affected == 0 {
                warn!(product_id = %item.product_id, "Product gone; stock not restored");
            }
        }

        Ok(())
    }

    /// Applies one stock adjustment as a conditional update.
    ///
    /// A negative delta only succeeds when the resulting stock stays
    /// non-negative; the returned row count tells the caller whether the
    /// product matched.
    async fn apply_adjustment<C: ConnectionTrait>(
        &self,
        conn: &C,
        adjustment: StockAdjustment,
    ) -> Result<u64, ServiceError> {
        let query = if adjustment.delta < 0 {
            let amount = -adjustment.delta;
            Product::update_many()
                .col_expr(
                    product::Column::Qty,
                    Expr::col(product::Column::Qty).sub(amount),
                )
                .filter(product::Column::Id.eq(adjustment.product_id))
                .filter(product::Column::Qty.gte(amount))
        } else {
            Product::update_many()
                .col_expr(
                    product::Column::Qty,
                    Expr::col(product::Column::Qty).add(adjustment.delta),
                )
                .filter(product::Column::Id.eq(adjustment.product_id))
        };

        let result = query.exec(conn).await?;
        debug!(
            product_id = %adjustment.product_id,
            delta = adjustment.delta,
            rows = result.rows_affected,
            "Applied stock adjustment"
        );
        Ok(result.rows_affected)
    }
}
