use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stocking style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum Category {
    /// Thigh-high
    #[sqlx(rename = "muslo")]
    #[serde(rename = "muslo")]
    Muslo,
    #[sqlx(rename = "panty")]
    #[serde(rename = "panty")]
    Panty,
    /// Knee-high
    #[sqlx(rename = "rodilla")]
    #[serde(rename = "rodilla")]
    Rodilla,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum Size {
    M,
    L,
    XL,
    XXL,
}

/// Product model, one row per SKU in `productos`.
///
/// `stock_normal` is sellable stock and may go negative when a seller
/// confirms a sale past the available quantity. `stock_returned` is the
/// quarantine bucket fed by returns.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,

    /// SKU, unique
    pub code: String,

    pub category: Category,

    pub size: Size,

    pub sell_price: Decimal,

    pub buy_price: Decimal,

    /// Sellable pairs on hand
    pub stock_normal: i32,

    /// Pairs held back after a return
    pub stock_returned: i32,

    pub created_at: DateTime<Utc>,
}

/// Manual stock adjustment request (admin inventory page).
#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustment {
    pub delta: i32,
    pub reason: String,
}

/// Moves pairs from the returned bucket back to sellable stock.
#[derive(Debug, Clone, Deserialize)]
pub struct PromoteReturned {
    pub quantity: i32,
}
