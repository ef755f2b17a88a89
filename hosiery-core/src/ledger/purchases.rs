use sqlx::PgExecutor;
use tracing::info;
use uuid::Uuid;

use crate::auth::Session;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::products::require_product;
use crate::ledger::state_machine::{Transition, WorkflowAction};
use crate::ledger::{stock, Ledger};
use crate::models::movement::StockMovementType;
use crate::models::purchase::{
    NewPurchase, Purchase, PurchaseFilter, PurchaseLineItem, PurchaseState, PurchaseWithItems,
};
use crate::permissions::{require, Capability};

const PURCHASE_COLUMNS: &str =
    "id, supplier, total, document_url, state, registered_by, approved_by, received_at, created_at";

/// Lines in product order, so concurrent receipts lock `productos` rows
/// in the same sequence.
async fn line_items<'e, E: PgExecutor<'e>>(executor: E, purchase_id: Uuid) -> Result<Vec<PurchaseLineItem>, sqlx::Error> {
    sqlx::query_as::<_, PurchaseLineItem>(
        r#"
        SELECT id, purchase_id, product_id, quantity_pairs, unit_price, subtotal
        FROM compras_detalle
        WHERE purchase_id = $1
        ORDER BY product_id, id
        "#,
    )
    .bind(purchase_id)
    .fetch_all(executor)
    .await
}

impl Ledger {
    /// Registers a supplier purchase awaiting arrival. Stock is untouched.
    pub async fn register_purchase(&self, session: &Session, input: NewPurchase) -> LedgerResult<PurchaseWithItems> {
        require(session, Capability::RegisterPurchases)?;
        let input = input.validate()?;
        let total = input.effective_total();

        let mut tx = self.pool().begin().await?;

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            r#"
            INSERT INTO compras (id, supplier, total, document_url, state, registered_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.supplier)
        .bind(total)
        .bind(&input.document_url)
        .bind(PurchaseState::initial_state())
        .bind(session.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let product = require_product(&mut *tx, &item.product_code).await?;
            let line = sqlx::query_as::<_, PurchaseLineItem>(
                r#"
                INSERT INTO compras_detalle (id, purchase_id, product_id, quantity_pairs, unit_price, subtotal)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, purchase_id, product_id, quantity_pairs, unit_price, subtotal
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(purchase.id)
            .bind(product.id)
            .bind(item.quantity_pairs)
            .bind(item.unit_price)
            .bind(item.subtotal())
            .fetch_one(&mut *tx)
            .await?;
            items.push(line);
        }

        tx.commit().await?;

        info!(
            purchase_id = %purchase.id,
            supplier = %purchase.supplier,
            lines = items.len(),
            total = %purchase.total,
            "Purchase registered"
        );
        Ok(PurchaseWithItems { purchase, items })
    }

    /// Confirms arrival: adds every line's pairs to sellable stock and
    /// writes one `entrada` movement per line, all in one transaction.
    pub async fn receive_purchase(&self, session: &Session, purchase_id: Uuid) -> LedgerResult<PurchaseWithItems> {
        require(session, Capability::ReceivePurchases)?;

        let mut tx = self.pool().begin().await?;
        let current = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {} FROM compras WHERE id = $1 FOR UPDATE",
            PURCHASE_COLUMNS
        ))
        .bind(purchase_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LedgerError::not_found("purchase", purchase_id))?;

        let next = current.state.transition(WorkflowAction::ConfirmArrival)?;
        let items = line_items(&mut *tx, purchase_id).await?;

        for item in &items {
            stock::apply_stock_delta(
                &mut tx,
                item.product_id,
                item.quantity_pairs,
                StockMovementType::Inbound,
                Some(purchase_id),
                session.user_id,
                Some(&current.supplier),
            )
            .await?;
        }

        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            r#"
            UPDATE compras
            SET state = $2, approved_by = $3, received_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(purchase_id)
        .bind(next)
        .bind(session.user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(%purchase_id, lines = items.len(), "Purchase received into stock");
        Ok(PurchaseWithItems { purchase, items })
    }

    pub async fn get_purchase(&self, session: &Session, purchase_id: Uuid) -> LedgerResult<PurchaseWithItems> {
        require(session, Capability::RegisterPurchases)?;
        let purchase = sqlx::query_as::<_, Purchase>(&format!(
            "SELECT {} FROM compras WHERE id = $1",
            PURCHASE_COLUMNS
        ))
        .bind(purchase_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| LedgerError::not_found("purchase", purchase_id))?;
        let items = line_items(self.pool(), purchase_id).await?;
        Ok(PurchaseWithItems { purchase, items })
    }

    pub async fn list_purchases(&self, session: &Session, filter: PurchaseFilter) -> LedgerResult<Vec<Purchase>> {
        require(session, Capability::RegisterPurchases)?;
        let rows = sqlx::query_as::<_, Purchase>(&format!(
            r#"
            SELECT {} FROM compras
            WHERE ($1::varchar IS NULL OR state = $1)
            ORDER BY created_at DESC
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(filter.state)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}
