use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::sale::PaymentMethod;
use crate::models::{is_blank, non_blank};

/// Singleton running balance of physical cash (`caja_efectivo`, id = 1).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CashRegister {
    pub id: i32,
    pub balance: Decimal,
    pub last_pickup_id: Option<Uuid>,
    pub last_pickup_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

/// Physical cash removed from the register, maps to `recogidas_efectivo`.
///
/// `difference` is `actual_cash_counted - system_accumulated_cash` and is
/// kept for reporting only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CashPickup {
    pub id: Uuid,
    pub pickup_date: NaiveDate,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub system_accumulated_cash: Decimal,
    pub actual_cash_counted: Decimal,
    pub difference: Decimal,
    pub photo_url: String,
    pub notes: Option<String>,
    pub collected_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPickup {
    pub actual_cash_counted: Decimal,
    pub photo_url: String,
    pub notes: Option<String>,
    /// Proceed even when the counted cash exceeds the accumulated total
    #[serde(default)]
    pub confirm_over_count: bool,
}

impl NewPickup {
    pub fn validate(mut self) -> Result<Self, LedgerError> {
        if self.actual_cash_counted < Decimal::ZERO {
            return Err(LedgerError::validation("counted cash cannot be negative"));
        }
        if is_blank(&self.photo_url) {
            return Err(LedgerError::validation("pickup photo is required"));
        }
        self.notes = non_blank(self.notes);
        Ok(self)
    }
}

/// Period and expected amount covered by the next pickup or verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodPreview {
    pub method: PaymentMethod,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub accumulated: Decimal,
}

/// Cash-less attestation of a card or transfer period.
///
/// Stored in `verificaciones_tarjeta` or `verificaciones_transferencia`
/// depending on `method`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentVerification {
    pub id: Uuid,
    #[sqlx(skip)]
    pub method: Option<PaymentMethod>,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub accumulated_amount: Decimal,
    pub notes: Option<String>,
    pub verified_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVerification {
    pub method: PaymentMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MethodQuery {
    pub method: PaymentMethod,
}
