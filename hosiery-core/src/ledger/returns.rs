use tracing::info;
use uuid::Uuid;

use crate::auth::Session;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::products::require_product;
use crate::ledger::sales::sale_by_invoice;
use crate::ledger::state_machine::{Transition, WorkflowAction};
use crate::ledger::{cash, stock, Ledger, ReturnCashPolicy};
use crate::models::movement::CashMovementType;
use crate::models::sale_return::{InvoiceLookup, NewReturn, ReturnFilter, ReturnState, SaleReturn};
use crate::models::is_blank;
use crate::permissions::{require, Capability};

const RETURN_COLUMNS: &str = "id, return_date, return_time, original_invoice_number, sale_id, product_id, \
     quantity, amount_refunded, reason, state, note_image_url, original_invoice_image_url, \
     registered_by, reviewed_by, created_at";

impl Ledger {
    /// Finds the sale behind an invoice number so the return form can be
    /// pre-filled; flags when a paper invoice photo will be required.
    pub async fn lookup_invoice(&self, session: &Session, invoice_number: &str) -> LedgerResult<InvoiceLookup> {
        require(session, Capability::RegisterReturns)?;
        if is_blank(invoice_number) {
            return Err(LedgerError::validation("invoice number is required"));
        }
        let invoice_number = invoice_number.trim().to_string();
        let sale = sale_by_invoice(self.pool(), &invoice_number).await?;
        Ok(InvoiceLookup::new(invoice_number, sale))
    }

    /// Records a pending return and puts the pairs in the returned bucket.
    ///
    /// The register is not touched here; see `approve_return`.
    pub async fn register_return(&self, session: &Session, input: NewReturn) -> LedgerResult<SaleReturn> {
        require(session, Capability::RegisterReturns)?;
        let input = input.validate()?;

        let mut tx = self.pool().begin().await?;
        let product = require_product(&mut *tx, &input.product_code).await?;

        let sale = match &input.original_invoice_number {
            Some(number) => sale_by_invoice(&mut *tx, number).await?,
            None => None,
        };
        if sale.is_none() && input.original_invoice_image_url.is_none() {
            return Err(LedgerError::validation(
                "no recorded sale matches this invoice; attach a photo of the original invoice",
            ));
        }

        let now = self.clock().now_local();
        let sale_return = sqlx::query_as::<_, SaleReturn>(&format!(
            r#"
            INSERT INTO devoluciones (
                id, return_date, return_time, original_invoice_number, sale_id, product_id,
                quantity, amount_refunded, reason, state, note_image_url,
                original_invoice_image_url, registered_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            RETURN_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(now.date_naive())
        .bind(now.time())
        .bind(&input.original_invoice_number)
        .bind(sale.as_ref().map(|s| s.id))
        .bind(product.id)
        .bind(input.quantity)
        .bind(input.amount_refunded)
        .bind(input.reason)
        .bind(ReturnState::initial_state())
        .bind(input.note_image_url.trim())
        .bind(&input.original_invoice_image_url)
        .bind(session.user_id)
        .fetch_one(&mut *tx)
        .await?;

        stock::increment_returned(&mut tx, product.id, sale_return.quantity, sale_return.id, session.user_id).await?;

        tx.commit().await?;

        info!(
            return_id = %sale_return.id,
            code = %product.code,
            quantity = sale_return.quantity,
            matched_sale = sale_return.sale_id.is_some(),
            "Return registered"
        );
        Ok(sale_return)
    }

    /// Approves a pending return. Debits the refund from the register only
    /// under `ReturnCashPolicy::DebitOnApproval`.
    pub async fn approve_return(&self, session: &Session, return_id: Uuid) -> LedgerResult<SaleReturn> {
        self.review_return(session, return_id, WorkflowAction::Approve).await
    }

    /// Rejects a pending return. The returned bucket keeps the pairs.
    pub async fn reject_return(&self, session: &Session, return_id: Uuid) -> LedgerResult<SaleReturn> {
        self.review_return(session, return_id, WorkflowAction::Reject).await
    }

    async fn review_return(
        &self,
        session: &Session,
        return_id: Uuid,
        action: WorkflowAction,
    ) -> LedgerResult<SaleReturn> {
        require(session, Capability::ApproveReturns)?;

        let mut tx = self.pool().begin().await?;
        let current = sqlx::query_as::<_, SaleReturn>(&format!(
            "SELECT {} FROM devoluciones WHERE id = $1 FOR UPDATE",
            RETURN_COLUMNS
        ))
        .bind(return_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LedgerError::not_found("return", return_id))?;

        let next = current.state.transition(action)?;

        let updated = sqlx::query_as::<_, SaleReturn>(&format!(
            "UPDATE devoluciones SET state = $2, reviewed_by = $3 WHERE id = $1 RETURNING {}",
            RETURN_COLUMNS
        ))
        .bind(return_id)
        .bind(next)
        .bind(session.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let debit_refund = next == ReturnState::Approved
            && self.policy().return_cash == ReturnCashPolicy::DebitOnApproval
            && !updated.amount_refunded.is_zero();
        if debit_refund {
            cash::apply_cash_delta(
                &mut tx,
                -updated.amount_refunded,
                CashMovementType::Refund,
                Some(updated.id),
                session.user_id,
                updated.original_invoice_number.as_deref(),
            )
            .await?;
        }

        tx.commit().await?;

        info!(%return_id, from = %current.state, to = %next, refund_debited = debit_refund, "Return reviewed");
        Ok(updated)
    }

    pub async fn list_returns(&self, session: &Session, filter: ReturnFilter) -> LedgerResult<Vec<SaleReturn>> {
        require(session, Capability::ViewReports)?;
        let rows = sqlx::query_as::<_, SaleReturn>(&format!(
            r#"
            SELECT {} FROM devoluciones
            WHERE ($1::varchar IS NULL OR state = $1)
            ORDER BY created_at DESC
            "#,
            RETURN_COLUMNS
        ))
        .bind(filter.state)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}
