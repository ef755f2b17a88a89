use sqlx::PgExecutor;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Session;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::cash::{self, sale_cash_delta};
use crate::ledger::products::require_product;
use crate::ledger::stock::{self, stock_shortfall};
use crate::ledger::Ledger;
use crate::models::movement::{CashMovementType, StockMovementType};
use crate::models::sale::{NewSale, RejectSale, Sale, SaleFilter};
use crate::models::non_blank;
use crate::permissions::{require, Capability};

pub(crate) const SALE_COLUMNS: &str = "id, sale_date, sale_time, seller_id, product_id, invoice_number, \
     customer_name, customer_id, amount, quantity, payment_method, invoice_photo_url, \
     proof_photo_url, verified, notes, created_at";

pub(crate) async fn sale_by_invoice<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice_number: &str,
) -> Result<Option<Sale>, sqlx::Error> {
    sqlx::query_as::<_, Sale>(&format!(
        "SELECT {} FROM ventas WHERE invoice_number = $1 ORDER BY created_at DESC LIMIT 1",
        SALE_COLUMNS
    ))
    .bind(invoice_number)
    .fetch_optional(executor)
    .await
}

impl Ledger {
    /// Records a sale, takes the pairs out of sellable stock and, for cash
    /// sales, credits the register.
    ///
    /// Asking for more pairs than are on hand returns an `Advisory` unless
    /// `confirm_insufficient_stock` is set; stock may then go negative.
    pub async fn register_sale(&self, session: &Session, input: NewSale) -> LedgerResult<Sale> {
        require(session, Capability::RegisterSales)?;
        let input = input.validate()?;
        self.ensure_close_gate_open().await?;

        let mut tx = self.pool().begin().await?;
        let product = require_product(&mut *tx, &input.product_code).await?;

        if let Some(advisory) = stock_shortfall(&product.code, input.quantity, product.stock_normal) {
            if !input.confirm_insufficient_stock {
                return Err(LedgerError::Advisory(advisory));
            }
            warn!(
                code = %product.code,
                requested = input.quantity,
                available = product.stock_normal,
                user_id = %session.user_id,
                "Sale confirmed past available stock"
            );
        }

        let now = self.clock().now_local();
        let sale = sqlx::query_as::<_, Sale>(&format!(
            r#"
            INSERT INTO ventas (
                id, sale_date, sale_time, seller_id, product_id, invoice_number,
                customer_name, customer_id, amount, quantity, payment_method,
                invoice_photo_url, proof_photo_url, verified, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, false, $14)
            RETURNING {}
            "#,
            SALE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(now.date_naive())
        .bind(now.time())
        .bind(session.user_id)
        .bind(product.id)
        .bind(&input.invoice_number)
        .bind(&input.customer_name)
        .bind(&input.customer_id)
        .bind(input.amount)
        .bind(input.quantity)
        .bind(input.payment_method)
        .bind(input.invoice_photo_url.trim())
        .bind(&input.proof_photo_url)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        stock::apply_stock_delta(
            &mut tx,
            product.id,
            -sale.quantity,
            StockMovementType::Outbound,
            Some(sale.id),
            session.user_id,
            Some(&sale.invoice_number),
        )
        .await?;

        let credit = sale_cash_delta(sale.payment_method, sale.amount);
        if !credit.is_zero() {
            cash::apply_cash_delta(
                &mut tx,
                credit,
                CashMovementType::Sale,
                Some(sale.id),
                session.user_id,
                Some(&sale.invoice_number),
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            invoice = %sale.invoice_number,
            code = %product.code,
            quantity = sale.quantity,
            amount = %sale.amount,
            method = ?sale.payment_method,
            "Sale registered"
        );
        Ok(sale)
    }

    /// Marks a sale as checked by an admin. Idempotent.
    pub async fn verify_sale(&self, session: &Session, sale_id: Uuid) -> LedgerResult<Sale> {
        require(session, Capability::VerifySales)?;
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "UPDATE ventas SET verified = true WHERE id = $1 RETURNING {}",
            SALE_COLUMNS
        ))
        .bind(sale_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| LedgerError::not_found("sale", sale_id))?;

        info!(%sale_id, user_id = %session.user_id, "Sale verified");
        Ok(sale)
    }

    /// Deletes an unverified sale, reversing its cash credit first.
    ///
    /// Stock taken by the sale is not put back. The reason is logged only.
    pub async fn reject_sale(&self, session: &Session, sale_id: Uuid, request: RejectSale) -> LedgerResult<()> {
        require(session, Capability::RejectSales)?;

        let mut tx = self.pool().begin().await?;
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {} FROM ventas WHERE id = $1 FOR UPDATE",
            SALE_COLUMNS
        ))
        .bind(sale_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LedgerError::not_found("sale", sale_id))?;

        if sale.verified {
            return Err(LedgerError::Conflict(format!(
                "sale {} is already verified",
                sale.invoice_number
            )));
        }

        let reversal = -sale_cash_delta(sale.payment_method, sale.amount);
        if !reversal.is_zero() {
            cash::apply_cash_delta(
                &mut tx,
                reversal,
                CashMovementType::SaleReversal,
                Some(sale.id),
                session.user_id,
                Some(&sale.invoice_number),
            )
            .await?;
        }

        sqlx::query("DELETE FROM ventas WHERE id = $1")
            .bind(sale.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let reason = non_blank(request.reason).unwrap_or_else(|| "-".to_string());
        info!(
            %sale_id,
            invoice = %sale.invoice_number,
            %reason,
            user_id = %session.user_id,
            "Sale rejected and deleted"
        );
        Ok(())
    }

    pub async fn get_sale(&self, session: &Session, sale_id: Uuid) -> LedgerResult<Sale> {
        require(session, Capability::ViewReports)?;
        sqlx::query_as::<_, Sale>(&format!("SELECT {} FROM ventas WHERE id = $1", SALE_COLUMNS))
            .bind(sale_id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| LedgerError::not_found("sale", sale_id))
    }

    pub async fn list_sales(&self, session: &Session, filter: SaleFilter) -> LedgerResult<Vec<Sale>> {
        require(session, Capability::ViewReports)?;
        let date = filter.date.unwrap_or_else(|| self.clock().today());
        let sales = sqlx::query_as::<_, Sale>(&format!(
            r#"
            SELECT {} FROM ventas
            WHERE sale_date = $1 AND ($2::boolean IS NULL OR verified = $2)
            ORDER BY sale_time DESC
            "#,
            SALE_COLUMNS
        ))
        .bind(date)
        .bind(filter.verified)
        .fetch_all(self.pool())
        .await?;
        Ok(sales)
    }
}
