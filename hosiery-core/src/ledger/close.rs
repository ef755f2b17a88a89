use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Session;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::Ledger;
use crate::models::daily_close::{CloseStatus, DailyClose};
use crate::models::sale::PaymentMethod;
use crate::permissions::{require, Capability};

const CLOSE_COLUMNS: &str = "id, close_date, cash_total, card_total, transfer_total, grand_total, \
     sale_count, closed_by, created_at";

/// Per-method totals of a day's verified sales.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseTotals {
    pub cash: Decimal,
    pub card: Decimal,
    pub transfer: Decimal,
    pub count: i64,
}

impl CloseTotals {
    pub fn from_sales<I>(sales: I) -> Self
    where
        I: IntoIterator<Item = (PaymentMethod, Decimal)>,
    {
        sales.into_iter().fold(CloseTotals::default(), |mut totals, (method, amount)| {
            match method {
                PaymentMethod::Cash => totals.cash += amount,
                PaymentMethod::Card => totals.card += amount,
                PaymentMethod::Transfer => totals.transfer += amount,
            }
            totals.count += 1;
            totals
        })
    }

    pub fn grand_total(&self) -> Decimal {
        self.cash + self.card + self.transfer
    }
}

/// A day with sales and no close row blocks the following day.
pub fn needs_close(sale_count: i64, closed: bool) -> bool {
    sale_count > 0 && !closed
}

impl Ledger {
    /// Gate state for yesterday (store time).
    pub async fn close_status(&self) -> LedgerResult<CloseStatus> {
        let date = self.clock().yesterday();

        let sale_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ventas WHERE sale_date = $1")
            .bind(date)
            .fetch_one(self.pool())
            .await?;
        let closed: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM cierres_diarios WHERE close_date = $1)")
            .bind(date)
            .fetch_one(self.pool())
            .await?;

        Ok(CloseStatus {
            date,
            sale_count,
            closed,
            blocked: needs_close(sale_count, closed),
        })
    }

    /// Refuses the action when the gate is enforced and yesterday is open.
    pub(crate) async fn ensure_close_gate_open(&self) -> LedgerResult<()> {
        if !self.policy().enforce_close_gate {
            return Ok(());
        }
        let status = self.close_status().await?;
        if status.blocked {
            warn!(date = %status.date, "Action blocked until previous day is closed");
            return Err(LedgerError::Conflict(format!(
                "day {} has {} sales and must be closed first",
                status.date, status.sale_count
            )));
        }
        Ok(())
    }

    /// Snapshots the verified sales of `date` (default: yesterday).
    ///
    /// One close per date; a second close fails with `Conflict`.
    pub async fn close_day(&self, session: &Session, date: Option<NaiveDate>) -> LedgerResult<DailyClose> {
        require(session, Capability::CloseDay)?;
        let date = date.unwrap_or_else(|| self.clock().yesterday());
        if date > self.clock().today() {
            return Err(LedgerError::validation(format!("cannot close future day {}", date)));
        }

        let mut tx = self.pool().begin().await?;

        let sales: Vec<(PaymentMethod, Decimal)> = sqlx::query_as(
            "SELECT payment_method, amount FROM ventas WHERE sale_date = $1 AND verified = true",
        )
        .bind(date)
        .fetch_all(&mut *tx)
        .await?;
        let totals = CloseTotals::from_sales(sales);

        let close = sqlx::query_as::<_, DailyClose>(&format!(
            r#"
            INSERT INTO cierres_diarios (
                id, close_date, cash_total, card_total, transfer_total,
                grand_total, sale_count, closed_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (close_date) DO NOTHING
            RETURNING {}
            "#,
            CLOSE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(date)
        .bind(totals.cash)
        .bind(totals.card)
        .bind(totals.transfer)
        .bind(totals.grand_total())
        .bind(totals.count)
        .bind(session.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LedgerError::Conflict(format!("day {} is already closed", date)))?;

        tx.commit().await?;

        info!(
            %date,
            sales = close.sale_count,
            grand_total = %close.grand_total,
            user_id = %session.user_id,
            "Day closed"
        );
        Ok(close)
    }

    pub async fn list_closes(&self, session: &Session, limit: i64) -> LedgerResult<Vec<DailyClose>> {
        require(session, Capability::ViewReports)?;
        let rows = sqlx::query_as::<_, DailyClose>(&format!(
            "SELECT {} FROM cierres_diarios ORDER BY close_date DESC LIMIT $1",
            CLOSE_COLUMNS
        ))
        .bind(limit.clamp(1, 366))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn totals_split_by_method() {
        let totals = CloseTotals::from_sales(vec![
            (PaymentMethod::Cash, dec!(175000)),
            (PaymentMethod::Card, dec!(70000)),
            (PaymentMethod::Cash, dec!(35000)),
            (PaymentMethod::Transfer, dec!(105000)),
        ]);
        assert_eq!(totals.cash, dec!(210000));
        assert_eq!(totals.card, dec!(70000));
        assert_eq!(totals.transfer, dec!(105000));
        assert_eq!(totals.count, 4);
        assert_eq!(totals.grand_total(), dec!(385000));
    }

    #[test]
    fn empty_day_totals_are_zero() {
        let totals = CloseTotals::from_sales(Vec::new());
        assert_eq!(totals, CloseTotals::default());
        assert_eq!(totals.grand_total(), Decimal::ZERO);
    }

    #[test]
    fn gate_blocks_only_unclosed_days_with_sales() {
        assert!(needs_close(3, false));
        assert!(!needs_close(3, true));
        assert!(!needs_close(0, false));
    }
}
