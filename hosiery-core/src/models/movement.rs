use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Kind of stock delta recorded in `movimientos_inventario`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum StockMovementType {
    /// Purchase arrival
    #[sqlx(rename = "entrada")]
    #[serde(rename = "entrada")]
    Inbound,
    /// Sale
    #[sqlx(rename = "salida")]
    #[serde(rename = "salida")]
    Outbound,
    /// Customer return into the returned bucket
    #[sqlx(rename = "devolucion")]
    #[serde(rename = "devolucion")]
    Return,
    #[sqlx(rename = "ajuste")]
    #[serde(rename = "ajuste")]
    Adjustment,
    /// Returned bucket promoted back to sellable stock
    #[sqlx(rename = "promocion")]
    #[serde(rename = "promocion")]
    Promotion,
}

/// Kind of cash delta recorded in `movimientos_efectivo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum CashMovementType {
    #[sqlx(rename = "venta")]
    #[serde(rename = "venta")]
    Sale,
    #[sqlx(rename = "reverso_venta")]
    #[serde(rename = "reverso_venta")]
    SaleReversal,
    #[sqlx(rename = "gasto")]
    #[serde(rename = "gasto")]
    Expense,
    #[sqlx(rename = "recogida")]
    #[serde(rename = "recogida")]
    Pickup,
    #[sqlx(rename = "devolucion")]
    #[serde(rename = "devolucion")]
    Refund,
}

/// Append-only audit row for a stock change. Never read back to
/// recompute balances.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StockMovement {
    pub id: Uuid,
    pub product_id: Uuid,
    pub movement_type: StockMovementType,
    /// Signed delta
    pub quantity: i32,
    pub stock_before: i32,
    pub stock_after: i32,
    /// Sale, return, purchase or adjustment that caused it
    pub reference_id: Option<Uuid>,
    pub user_id: Uuid,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit row for a cash register change.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CashMovement {
    pub id: Uuid,
    pub movement_type: CashMovementType,
    /// Signed delta
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub reference_id: Option<Uuid>,
    pub user_id: Uuid,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementQuery {
    pub limit: Option<i64>,
}
