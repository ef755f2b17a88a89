use sqlx::PgExecutor;
use tracing::info;

use crate::auth::Session;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::stock::{self, StockChange};
use crate::ledger::Ledger;
use crate::models::movement::{StockMovement, StockMovementType};
use crate::models::product::{Product, PromoteReturned, StockAdjustment};
use crate::models::is_blank;
use crate::permissions::{require, Capability};

const PRODUCT_COLUMNS: &str =
    "id, code, category, size, sell_price, buy_price, stock_normal, stock_returned, created_at";

pub(crate) async fn product_by_code<'e, E: PgExecutor<'e>>(
    executor: E,
    code: &str,
) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {} FROM productos WHERE code = $1",
        PRODUCT_COLUMNS
    ))
    .bind(code)
    .fetch_optional(executor)
    .await
}

/// Looks up a product by SKU; an unknown code is a validation failure on
/// intake forms.
pub(crate) async fn require_product<'e, E: PgExecutor<'e>>(executor: E, code: &str) -> LedgerResult<Product> {
    product_by_code(executor, code)
        .await?
        .ok_or_else(|| LedgerError::validation(format!("unknown product code {}", code)))
}

impl Ledger {
    pub async fn list_products(&self, session: &Session) -> LedgerResult<Vec<Product>> {
        require(session, Capability::ViewInventory)?;
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM productos ORDER BY code",
            PRODUCT_COLUMNS
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(products)
    }

    pub async fn get_product(&self, session: &Session, code: &str) -> LedgerResult<Product> {
        require(session, Capability::ViewInventory)?;
        product_by_code(self.pool(), code)
            .await?
            .ok_or_else(|| LedgerError::not_found("product", code))
    }

    /// Manual correction of sellable stock from the inventory page.
    pub async fn adjust_stock(
        &self,
        session: &Session,
        code: &str,
        adjustment: StockAdjustment,
    ) -> LedgerResult<StockChange> {
        require(session, Capability::AdjustInventory)?;
        if adjustment.delta == 0 {
            return Err(LedgerError::validation("adjustment delta cannot be zero"));
        }
        if is_blank(&adjustment.reason) {
            return Err(LedgerError::validation("adjustment reason is required"));
        }

        let mut tx = self.pool().begin().await?;
        let product = product_by_code(&mut *tx, code)
            .await?
            .ok_or_else(|| LedgerError::not_found("product", code))?;
        let change = stock::apply_stock_delta(
            &mut tx,
            product.id,
            adjustment.delta,
            StockMovementType::Adjustment,
            None,
            session.user_id,
            Some(adjustment.reason.trim()),
        )
        .await?;
        tx.commit().await?;

        info!(code, delta = adjustment.delta, user_id = %session.user_id, "Manual stock adjustment");
        Ok(change)
    }

    /// Promotes quarantined returned pairs back to sellable stock.
    pub async fn promote_returned_stock(
        &self,
        session: &Session,
        code: &str,
        request: PromoteReturned,
    ) -> LedgerResult<StockChange> {
        require(session, Capability::AdjustInventory)?;
        if request.quantity <= 0 {
            return Err(LedgerError::validation("quantity must be positive"));
        }

        let mut tx = self.pool().begin().await?;
        let product = product_by_code(&mut *tx, code)
            .await?
            .ok_or_else(|| LedgerError::not_found("product", code))?;
        let change = stock::promote_returned(&mut tx, product.id, request.quantity, session.user_id).await?;
        tx.commit().await?;
        Ok(change)
    }

    pub async fn stock_movements(
        &self,
        session: &Session,
        code: Option<&str>,
        limit: i64,
    ) -> LedgerResult<Vec<StockMovement>> {
        require(session, Capability::ViewHistory)?;
        let product_id = match code {
            Some(code) => Some(
                product_by_code(self.pool(), code)
                    .await?
                    .ok_or_else(|| LedgerError::not_found("product", code))?
                    .id,
            ),
            None => None,
        };
        stock::list_stock_movements(self.pool(), product_id, limit.clamp(1, 500)).await
    }
}
