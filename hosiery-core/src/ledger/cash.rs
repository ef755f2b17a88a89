use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::auth::Session;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::Ledger;
use crate::permissions::{require, Capability};
use crate::models::cash::CashRegister;
use crate::models::movement::{CashMovement, CashMovementType};
use crate::models::sale::PaymentMethod;

/// Id of the singleton `caja_efectivo` row.
pub const REGISTER_ID: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CashChange {
    pub before: Decimal,
    pub after: Decimal,
}

impl CashChange {
    pub fn from_after(after: Decimal, delta: Decimal) -> Self {
        CashChange {
            before: after - delta,
            after,
        }
    }

    pub fn delta(&self) -> Decimal {
        self.after - self.before
    }
}

/// Register delta for a sale: only cash sales touch the drawer.
pub fn sale_cash_delta(method: PaymentMethod, amount: Decimal) -> Decimal {
    if method.is_cash() {
        amount
    } else {
        Decimal::ZERO
    }
}

/// Atomically adds `delta` to the register balance and logs the movement.
pub(crate) async fn apply_cash_delta(
    tx: &mut Transaction<'_, Postgres>,
    delta: Decimal,
    movement_type: CashMovementType,
    reference_id: Option<Uuid>,
    user_id: Uuid,
    note: Option<&str>,
) -> Result<CashChange, LedgerError> {
    let after: Option<Decimal> = sqlx::query_scalar(
        r#"
        UPDATE caja_efectivo
        SET balance = balance + $2, updated_at = NOW()
        WHERE id = $1
        RETURNING balance
        "#,
    )
    .bind(REGISTER_ID)
    .bind(delta)
    .fetch_optional(&mut **tx)
    .await?;

    let after = after.ok_or_else(|| LedgerError::not_found("cash register", REGISTER_ID))?;
    let change = CashChange::from_after(after, delta);

    sqlx::query(
        r#"
        INSERT INTO movimientos_efectivo (
            id, movement_type, amount, balance_before, balance_after,
            reference_id, user_id, note
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(movement_type)
    .bind(delta)
    .bind(change.before)
    .bind(change.after)
    .bind(reference_id)
    .bind(user_id)
    .bind(note)
    .execute(&mut **tx)
    .await?;

    info!(
        %delta,
        before = %change.before,
        after = %change.after,
        movement = ?movement_type,
        "Cash register updated"
    );
    Ok(change)
}

pub async fn get_register(pool: &PgPool) -> Result<CashRegister, LedgerError> {
    sqlx::query_as::<_, CashRegister>(
        "SELECT id, balance, last_pickup_id, last_pickup_date, updated_at FROM caja_efectivo WHERE id = $1",
    )
    .bind(REGISTER_ID)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| LedgerError::not_found("cash register", REGISTER_ID))
}

pub async fn list_cash_movements(pool: &PgPool, limit: i64) -> Result<Vec<CashMovement>, LedgerError> {
    let rows = sqlx::query_as::<_, CashMovement>(
        r#"
        SELECT id, movement_type, amount, balance_before, balance_after,
               reference_id, user_id, note, created_at
        FROM movimientos_efectivo
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

impl Ledger {
    pub async fn cash_register(&self, session: &Session) -> LedgerResult<CashRegister> {
        require(session, Capability::ViewCash)?;
        get_register(self.pool()).await
    }

    pub async fn cash_movements(&self, session: &Session, limit: i64) -> LedgerResult<Vec<CashMovement>> {
        require(session, Capability::ViewHistory)?;
        list_cash_movements(self.pool(), limit.clamp(1, 500)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn only_cash_sales_move_the_drawer() {
        assert_eq!(sale_cash_delta(PaymentMethod::Cash, dec!(175000)), dec!(175000));
        assert_eq!(sale_cash_delta(PaymentMethod::Card, dec!(175000)), Decimal::ZERO);
        assert_eq!(sale_cash_delta(PaymentMethod::Transfer, dec!(175000)), Decimal::ZERO);
    }

    #[test]
    fn sale_then_reversal_restores_balance() {
        let start = dec!(40000);
        let credit = sale_cash_delta(PaymentMethod::Cash, dec!(175000));
        let after_sale = CashChange::from_after(start + credit, credit);
        let after_reject = CashChange::from_after(after_sale.after - credit, -credit);
        assert_eq!(after_sale.before, start);
        assert_eq!(after_reject.after, start);
    }

    #[test]
    fn pickup_debits_counted_amount() {
        let change = CashChange::from_after(dec!(20000), dec!(-280000));
        assert_eq!(change.before, dec!(300000));
        assert_eq!(change.delta(), dec!(-280000));
    }
}
