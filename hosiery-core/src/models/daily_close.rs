use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// End-of-day snapshot of verified sales, maps to `cierres_diarios`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyClose {
    pub id: Uuid,
    pub close_date: NaiveDate,
    pub cash_total: Decimal,
    pub card_total: Decimal,
    pub transfer_total: Decimal,
    pub grand_total: Decimal,
    pub sale_count: i64,
    pub closed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Whether yesterday still needs closing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloseStatus {
    /// The day inspected (yesterday in store time)
    pub date: NaiveDate,
    pub sale_count: i64,
    pub closed: bool,
    /// Sale registration and cash pickup are gated while true
    pub blocked: bool,
}

/// Paging for the close history; defaults to the last 30 closes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloseListQuery {
    pub limit: Option<i64>,
}

impl CloseListQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(30)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloseRequest {
    /// Defaults to yesterday in store time
    pub date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_history_defaults_to_thirty_rows() {
        assert_eq!(CloseListQuery::default().limit(), 30);
        assert_eq!(CloseListQuery { limit: Some(7) }.limit(), 7);
    }
}
