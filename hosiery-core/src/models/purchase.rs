use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{is_blank, non_blank};

/// Purchase receipt state: registered, then confirmed on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum PurchaseState {
    #[sqlx(rename = "pendiente_llegada")]
    #[serde(rename = "pendiente_llegada")]
    AwaitingReceipt,
    #[sqlx(rename = "recibida")]
    #[serde(rename = "recibida")]
    Received,
}

/// Supplier purchase header, maps to `compras`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Purchase {
    pub id: Uuid,
    pub supplier: String,
    pub total: Decimal,
    pub document_url: Option<String>,
    pub state: PurchaseState,
    pub registered_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One product line of a purchase, maps to `compras_detalle`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PurchaseLineItem {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub product_id: Uuid,
    pub quantity_pairs: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseWithItems {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub items: Vec<PurchaseLineItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchaseItem {
    pub product_code: String,
    pub quantity_pairs: i32,
    pub unit_price: Decimal,
}

impl NewPurchaseItem {
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity_pairs)
    }
}

/// Purchase registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchase {
    pub supplier: String,
    /// Defaults to the sum of line subtotals
    pub total: Option<Decimal>,
    pub document_url: Option<String>,
    pub items: Vec<NewPurchaseItem>,
}

impl NewPurchase {
    pub fn validate(mut self) -> Result<Self, LedgerError> {
        if is_blank(&self.supplier) {
            return Err(LedgerError::validation("supplier is required"));
        }
        if self.items.is_empty() {
            return Err(LedgerError::validation("a purchase needs at least one line item"));
        }
        for item in &self.items {
            if is_blank(&item.product_code) {
                return Err(LedgerError::validation("line item product code is required"));
            }
            if item.quantity_pairs <= 0 {
                return Err(LedgerError::validation(format!(
                    "line item {} must have a positive quantity",
                    item.product_code
                )));
            }
            if item.unit_price < Decimal::ZERO {
                return Err(LedgerError::validation(format!(
                    "line item {} has a negative unit price",
                    item.product_code
                )));
            }
        }
        if matches!(self.total, Some(total) if total < Decimal::ZERO) {
            return Err(LedgerError::validation("total cannot be negative"));
        }
        self.supplier = self.supplier.trim().to_string();
        self.document_url = non_blank(self.document_url);
        for item in &mut self.items {
            item.product_code = item.product_code.trim().to_string();
        }
        Ok(self)
    }

    /// Declared total, or the sum of line subtotals when none was given.
    pub fn effective_total(&self) -> Decimal {
        self.total
            .unwrap_or_else(|| self.items.iter().map(NewPurchaseItem::subtotal).sum())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseFilter {
    pub state: Option<PurchaseState>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(code: &str, qty: i32, price: Decimal) -> NewPurchaseItem {
        NewPurchaseItem {
            product_code: code.to_string(),
            quantity_pairs: qty,
            unit_price: price,
        }
    }

    #[test]
    fn total_defaults_to_line_sum() {
        let purchase = NewPurchase {
            supplier: "Medias Andinas".to_string(),
            total: None,
            document_url: None,
            items: vec![item("74113", 12, dec!(18000)), item("74120", 6, dec!(21000))],
        };
        assert_eq!(purchase.effective_total(), dec!(342000));
    }

    #[test]
    fn declared_total_wins() {
        let purchase = NewPurchase {
            supplier: "Medias Andinas".to_string(),
            total: Some(dec!(340000)),
            document_url: None,
            items: vec![item("74113", 12, dec!(18000)), item("74120", 6, dec!(21000))],
        };
        assert_eq!(purchase.effective_total(), dec!(340000));
    }

    #[test]
    fn empty_or_zero_lines_rejected() {
        let empty = NewPurchase {
            supplier: "X".to_string(),
            total: None,
            document_url: None,
            items: vec![],
        };
        assert!(empty.validate().is_err());

        let zero = NewPurchase {
            supplier: "X".to_string(),
            total: None,
            document_url: None,
            items: vec![item("74113", 0, dec!(1))],
        };
        assert!(zero.validate().is_err());
    }
}
