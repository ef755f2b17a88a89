//! Cash pickups and card/transfer verifications.
//!
//! Both cover a rolling period that starts the day after the previous
//! record's `period_to` and ends today. Only pickups move money.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Session;
use crate::clock::next_day;
use crate::error::{Advisory, LedgerError, LedgerResult};
use crate::ledger::{cash, Ledger};
use crate::models::cash::{CashPickup, NewPickup, NewVerification, PaymentVerification, PeriodPreview};
use crate::models::movement::CashMovementType;
use crate::models::non_blank;
use crate::models::sale::PaymentMethod;
use crate::permissions::{require, Capability};

const PICKUP_COLUMNS: &str = "id, pickup_date, period_from, period_to, system_accumulated_cash, \
     actual_cash_counted, difference, photo_url, notes, collected_by, created_at";

const VERIFICATION_COLUMNS: &str =
    "id, period_from, period_to, accumulated_amount, notes, verified_by, created_at";

/// First day not covered by the previous record, never before `epoch`.
pub fn period_start(last_period_to: Option<NaiveDate>, epoch: NaiveDate) -> NaiveDate {
    match last_period_to {
        Some(last) => next_day(last).max(epoch),
        None => epoch,
    }
}

/// Start of the next period ending `today`.
///
/// Once a record already covers `today`, a new period would start after it
/// ends; that is refused instead of storing an inverted period.
pub fn open_period(
    method: PaymentMethod,
    last_period_to: Option<NaiveDate>,
    epoch: NaiveDate,
    today: NaiveDate,
) -> LedgerResult<NaiveDate> {
    let from = period_start(last_period_to, epoch);
    if from <= today {
        return Ok(from);
    }
    let message = match method {
        PaymentMethod::Cash => format!("cash already collected for {}", today),
        PaymentMethod::Card => format!("card payments already verified for {}", today),
        PaymentMethod::Transfer => format!("transfers already verified for {}", today),
    };
    Err(LedgerError::Conflict(message))
}

/// Counted minus expected; informational only.
pub fn pickup_difference(actual_counted: Decimal, system_accumulated: Decimal) -> Decimal {
    actual_counted - system_accumulated
}

pub fn over_count(counted: Decimal, accumulated: Decimal) -> Option<Advisory> {
    (counted > accumulated).then_some(Advisory::PickupExceedsAccumulated { counted, accumulated })
}

fn verification_table(method: PaymentMethod) -> LedgerResult<&'static str> {
    match method {
        PaymentMethod::Card => Ok("verificaciones_tarjeta"),
        PaymentMethod::Transfer => Ok("verificaciones_transferencia"),
        PaymentMethod::Cash => Err(LedgerError::validation(
            "cash is reconciled through pickups, not verifications",
        )),
    }
}

async fn accumulated_sales<'e, E: PgExecutor<'e>>(
    executor: E,
    method: PaymentMethod,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM ventas
        WHERE payment_method = $1 AND sale_date BETWEEN $2 AND $3
        "#,
    )
    .bind(method)
    .bind(from)
    .bind(to)
    .fetch_one(executor)
    .await
}

async fn last_pickup_period_to<'e, E: PgExecutor<'e>>(executor: E) -> Result<Option<NaiveDate>, sqlx::Error> {
    sqlx::query_scalar("SELECT MAX(period_to) FROM recogidas_efectivo")
        .fetch_one(executor)
        .await
}

impl Ledger {
    async fn preview_period<'e, E: PgExecutor<'e>>(
        &self,
        executor: E,
        method: PaymentMethod,
        last_period_to: Option<NaiveDate>,
    ) -> LedgerResult<PeriodPreview> {
        let period_to = self.clock().today();
        let period_from = open_period(method, last_period_to, self.policy().pickup_epoch, period_to)?;
        let accumulated = accumulated_sales(executor, method, period_from, period_to).await?;
        Ok(PeriodPreview {
            method,
            period_from,
            period_to,
            accumulated,
        })
    }

    /// Period and expected cash for the next pickup.
    pub async fn pickup_preview(&self, session: &Session) -> LedgerResult<PeriodPreview> {
        require(session, Capability::CollectCash)?;
        let last = last_pickup_period_to(self.pool()).await?;
        self.preview_period(self.pool(), PaymentMethod::Cash, last).await
    }

    /// Records physical cash taken out of the register.
    ///
    /// The register is debited by the counted amount, not the expected
    /// one. Counting more than expected needs `confirm_over_count`.
    pub async fn register_pickup(&self, session: &Session, input: NewPickup) -> LedgerResult<CashPickup> {
        require(session, Capability::CollectCash)?;
        let input = input.validate()?;
        self.ensure_close_gate_open().await?;

        let mut tx = self.pool().begin().await?;

        // Serializes pickups on the register row so periods never overlap.
        sqlx::query("SELECT id FROM caja_efectivo WHERE id = $1 FOR UPDATE")
            .bind(cash::REGISTER_ID)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| LedgerError::not_found("cash register", cash::REGISTER_ID))?;

        let last = last_pickup_period_to(&mut *tx).await?;
        let period_to = self.clock().today();
        let period_from = open_period(PaymentMethod::Cash, last, self.policy().pickup_epoch, period_to)?;
        let system_accumulated = accumulated_sales(&mut *tx, PaymentMethod::Cash, period_from, period_to).await?;

        if let Some(advisory) = over_count(input.actual_cash_counted, system_accumulated) {
            if !input.confirm_over_count {
                return Err(LedgerError::Advisory(advisory));
            }
            warn!(
                counted = %input.actual_cash_counted,
                accumulated = %system_accumulated,
                user_id = %session.user_id,
                "Pickup confirmed above accumulated cash"
            );
        }

        let pickup = sqlx::query_as::<_, CashPickup>(&format!(
            r#"
            INSERT INTO recogidas_efectivo (
                id, pickup_date, period_from, period_to, system_accumulated_cash,
                actual_cash_counted, difference, photo_url, notes, collected_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            PICKUP_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(period_to)
        .bind(period_from)
        .bind(period_to)
        .bind(system_accumulated)
        .bind(input.actual_cash_counted)
        .bind(pickup_difference(input.actual_cash_counted, system_accumulated))
        .bind(input.photo_url.trim())
        .bind(&input.notes)
        .bind(session.user_id)
        .fetch_one(&mut *tx)
        .await?;

        let note = format!("{} .. {}", pickup.period_from, pickup.period_to);
        cash::apply_cash_delta(
            &mut tx,
            -pickup.actual_cash_counted,
            CashMovementType::Pickup,
            Some(pickup.id),
            session.user_id,
            Some(&note),
        )
        .await?;

        sqlx::query("UPDATE caja_efectivo SET last_pickup_id = $2, last_pickup_date = $3 WHERE id = $1")
            .bind(cash::REGISTER_ID)
            .bind(pickup.id)
            .bind(pickup.pickup_date)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            pickup_id = %pickup.id,
            period = %note,
            system = %pickup.system_accumulated_cash,
            counted = %pickup.actual_cash_counted,
            difference = %pickup.difference,
            "Cash pickup registered"
        );
        Ok(pickup)
    }

    pub async fn list_pickups(&self, session: &Session) -> LedgerResult<Vec<CashPickup>> {
        require(session, Capability::ViewCash)?;
        let rows = sqlx::query_as::<_, CashPickup>(&format!(
            "SELECT {} FROM recogidas_efectivo ORDER BY period_to DESC, created_at DESC",
            PICKUP_COLUMNS
        ))
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Period and accumulated amount for the next card/transfer review.
    pub async fn verification_preview(&self, session: &Session, method: PaymentMethod) -> LedgerResult<PeriodPreview> {
        require(session, Capability::VerifyPayments)?;
        let table = verification_table(method)?;
        let last: Option<NaiveDate> = sqlx::query_scalar(&format!("SELECT MAX(period_to) FROM {}", table))
            .fetch_one(self.pool())
            .await?;
        self.preview_period(self.pool(), method, last).await
    }

    /// Records that a card or transfer period was checked. No balance moves.
    pub async fn register_verification(
        &self,
        session: &Session,
        input: NewVerification,
    ) -> LedgerResult<PaymentVerification> {
        let preview = self.verification_preview(session, input.method).await?;
        let table = verification_table(input.method)?;

        let mut verification = sqlx::query_as::<_, PaymentVerification>(&format!(
            r#"
            INSERT INTO {} (id, period_from, period_to, accumulated_amount, notes, verified_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            table, VERIFICATION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(preview.period_from)
        .bind(preview.period_to)
        .bind(preview.accumulated)
        .bind(non_blank(input.notes))
        .bind(session.user_id)
        .fetch_one(self.pool())
        .await?;
        verification.method = Some(input.method);

        info!(
            method = ?input.method,
            from = %verification.period_from,
            to = %verification.period_to,
            amount = %verification.accumulated_amount,
            "Payment period verified"
        );
        Ok(verification)
    }

    pub async fn list_verifications(
        &self,
        session: &Session,
        method: PaymentMethod,
    ) -> LedgerResult<Vec<PaymentVerification>> {
        require(session, Capability::VerifyPayments)?;
        let table = verification_table(method)?;
        let mut rows = sqlx::query_as::<_, PaymentVerification>(&format!(
            "SELECT {} FROM {} ORDER BY period_to DESC, created_at DESC",
            VERIFICATION_COLUMNS, table
        ))
        .fetch_all(self.pool())
        .await?;
        for row in &mut rows {
            row.method = Some(method);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn first_pickup_starts_at_epoch() {
        assert_eq!(period_start(None, date(2024, 1, 1)), date(2024, 1, 1));
    }

    #[test]
    fn next_pickup_starts_day_after_previous_period() {
        assert_eq!(period_start(Some(date(2026, 10, 10)), date(2024, 1, 1)), date(2026, 10, 11));
    }

    #[test]
    fn period_never_starts_before_epoch() {
        assert_eq!(period_start(Some(date(2023, 6, 1)), date(2024, 1, 1)), date(2024, 1, 1));
    }

    #[test]
    fn period_already_covering_today_is_refused() {
        let today = date(2026, 10, 19);
        assert_eq!(
            open_period(PaymentMethod::Cash, Some(date(2026, 10, 18)), date(2024, 1, 1), today).unwrap(),
            today
        );
        assert!(matches!(
            open_period(PaymentMethod::Cash, Some(today), date(2024, 1, 1), today),
            Err(LedgerError::Conflict(_))
        ));
        assert!(matches!(
            open_period(PaymentMethod::Transfer, Some(today), date(2024, 1, 1), today),
            Err(LedgerError::Conflict(_))
        ));
    }

    #[test]
    fn difference_is_counted_minus_system() {
        assert_eq!(pickup_difference(dec!(280000), dec!(300000)), dec!(-20000));
        assert_eq!(pickup_difference(dec!(300000), dec!(300000)), Decimal::ZERO);
    }

    #[test]
    fn over_count_is_advisory_only_above_accumulated() {
        assert_eq!(over_count(dec!(280000), dec!(300000)), None);
        assert_eq!(over_count(dec!(300000), dec!(300000)), None);
        assert!(matches!(
            over_count(dec!(300001), dec!(300000)),
            Some(Advisory::PickupExceedsAccumulated { .. })
        ));
    }

    #[test]
    fn cash_has_no_verification_table() {
        assert!(verification_table(PaymentMethod::Cash).is_err());
        assert_eq!(verification_table(PaymentMethod::Card).unwrap(), "verificaciones_tarjeta");
    }
}
