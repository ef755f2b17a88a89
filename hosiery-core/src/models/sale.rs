use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{is_blank, non_blank};

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum PaymentMethod {
    #[sqlx(rename = "efectivo")]
    #[serde(rename = "efectivo")]
    Cash,
    #[sqlx(rename = "tarjeta")]
    #[serde(rename = "tarjeta")]
    Card,
    #[sqlx(rename = "transferencia")]
    #[serde(rename = "transferencia")]
    Transfer,
}

impl PaymentMethod {
    pub fn is_cash(self) -> bool {
        self == PaymentMethod::Cash
    }
}

/// Sale model representing one invoice line captured by a seller.
///
/// Maps to the `ventas` table. Created unverified; an admin either flips
/// `verified` or deletes the row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sale {
    pub id: Uuid,

    /// Store-local date of the sale
    pub sale_date: NaiveDate,

    /// Store-local time of the sale
    pub sale_time: NaiveTime,

    pub seller_id: Uuid,

    pub product_id: Uuid,

    /// Invoice number as printed (opaque)
    pub invoice_number: String,

    pub customer_name: Option<String>,

    /// Customer national id
    pub customer_id: Option<String>,

    /// Total charged
    pub amount: Decimal,

    /// Pairs sold
    pub quantity: i32,

    pub payment_method: PaymentMethod,

    pub invoice_photo_url: String,

    /// Card slip or transfer receipt; required for non-cash sales
    pub proof_photo_url: Option<String>,

    pub verified: bool,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Sale creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    pub product_code: String,
    pub quantity: i32,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub invoice_number: String,
    pub customer_name: Option<String>,
    pub customer_id: Option<String>,
    pub invoice_photo_url: String,
    pub proof_photo_url: Option<String>,
    pub notes: Option<String>,
    /// Proceed even when `quantity` exceeds sellable stock
    #[serde(default)]
    pub confirm_insufficient_stock: bool,
}

impl NewSale {
    /// Checks required fields before any write; trims optional text.
    pub fn validate(mut self) -> Result<Self, LedgerError> {
        if is_blank(&self.product_code) {
            return Err(LedgerError::validation("product code is required"));
        }
        if is_blank(&self.invoice_number) {
            return Err(LedgerError::validation("invoice number is required"));
        }
        if self.quantity <= 0 {
            return Err(LedgerError::validation("quantity must be positive"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::validation("amount must be positive"));
        }
        if is_blank(&self.invoice_photo_url) {
            return Err(LedgerError::validation("invoice photo is required"));
        }
        self.proof_photo_url = non_blank(self.proof_photo_url);
        if !self.payment_method.is_cash() && self.proof_photo_url.is_none() {
            return Err(LedgerError::validation(
                "payment proof photo is required for card and transfer sales",
            ));
        }
        self.product_code = self.product_code.trim().to_string();
        self.invoice_number = self.invoice_number.trim().to_string();
        self.customer_name = non_blank(self.customer_name);
        self.customer_id = non_blank(self.customer_id);
        self.notes = non_blank(self.notes);
        Ok(self)
    }
}

/// Optional operator reason shown at rejection time; only logged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectSale {
    pub reason: Option<String>,
}

/// Filter for listing sales.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaleFilter {
    pub date: Option<NaiveDate>,
    pub verified: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cash_sale() -> NewSale {
        NewSale {
            product_code: " 74113 ".to_string(),
            quantity: 5,
            amount: dec!(175000),
            payment_method: PaymentMethod::Cash,
            invoice_number: "F-1001".to_string(),
            customer_name: Some("  ".to_string()),
            customer_id: None,
            invoice_photo_url: "https://cdn.example/f1001.jpg".to_string(),
            proof_photo_url: None,
            notes: None,
            confirm_insufficient_stock: false,
        }
    }

    #[test]
    fn cash_sale_needs_no_proof() {
        let sale = cash_sale().validate().expect("valid");
        assert_eq!(sale.product_code, "74113");
        assert_eq!(sale.customer_name, None);
    }

    #[test]
    fn card_sale_requires_proof() {
        let mut sale = cash_sale();
        sale.payment_method = PaymentMethod::Card;
        sale.proof_photo_url = Some(" ".to_string());
        assert!(matches!(sale.validate(), Err(LedgerError::Validation(_))));
    }

    #[test]
    fn rejects_missing_fields() {
        let mut sale = cash_sale();
        sale.invoice_number = String::new();
        assert!(sale.validate().is_err());

        let mut sale = cash_sale();
        sale.quantity = 0;
        assert!(sale.validate().is_err());

        let mut sale = cash_sale();
        sale.invoice_photo_url = " ".to_string();
        assert!(sale.validate().is_err());
    }

    #[test]
    fn payment_method_uses_store_names() {
        let json = serde_json::to_string(&PaymentMethod::Transfer).unwrap();
        assert_eq!(json, "\"transferencia\"");
    }
}
