use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::sale::Sale;
use crate::models::{is_blank, non_blank};

/// Review state of a return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum ReturnState {
    #[sqlx(rename = "pendiente")]
    #[serde(rename = "pendiente")]
    Pending,
    #[sqlx(rename = "aprobada")]
    #[serde(rename = "aprobada")]
    Approved,
    #[sqlx(rename = "rechazada")]
    #[serde(rename = "rechazada")]
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum ReturnReason {
    #[sqlx(rename = "defectuoso")]
    #[serde(rename = "defectuoso")]
    Defective,
    #[sqlx(rename = "talla_incorrecta")]
    #[serde(rename = "talla_incorrecta")]
    WrongSize,
    #[sqlx(rename = "no_le_gusto")]
    #[serde(rename = "no_le_gusto")]
    CustomerDislike,
    #[sqlx(rename = "error_venta")]
    #[serde(rename = "error_venta")]
    SaleError,
    #[sqlx(rename = "otro")]
    #[serde(rename = "otro")]
    Other,
}

/// Return model, maps to `devoluciones`.
///
/// `sale_id` is `None` when the original invoice was not captured by this
/// system; the row then carries `original_invoice_image_url` instead.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SaleReturn {
    pub id: Uuid,
    pub return_date: NaiveDate,
    pub return_time: NaiveTime,
    pub original_invoice_number: Option<String>,
    pub sale_id: Option<Uuid>,
    pub product_id: Uuid,
    pub quantity: i32,
    pub amount_refunded: Decimal,
    pub reason: ReturnReason,
    pub state: ReturnState,
    pub note_image_url: String,
    pub original_invoice_image_url: Option<String>,
    pub registered_by: Uuid,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Return creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReturn {
    pub original_invoice_number: Option<String>,
    pub product_code: String,
    pub quantity: i32,
    pub amount_refunded: Decimal,
    pub reason: ReturnReason,
    pub note_image_url: String,
    /// Required when the invoice number matches no recorded sale
    pub original_invoice_image_url: Option<String>,
}

impl NewReturn {
    pub fn validate(mut self) -> Result<Self, LedgerError> {
        if is_blank(&self.product_code) {
            return Err(LedgerError::validation("product code is required"));
        }
        if self.quantity <= 0 {
            return Err(LedgerError::validation("quantity must be positive"));
        }
        if self.amount_refunded < Decimal::ZERO {
            return Err(LedgerError::validation("refund amount cannot be negative"));
        }
        if is_blank(&self.note_image_url) {
            return Err(LedgerError::validation("return note photo is required"));
        }
        self.product_code = self.product_code.trim().to_string();
        self.original_invoice_number = non_blank(self.original_invoice_number);
        self.original_invoice_image_url = non_blank(self.original_invoice_image_url);
        Ok(self)
    }
}

/// Result of looking up the invoice a customer brings back.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceLookup {
    pub invoice_number: String,
    /// Matching sale used to pre-fill customer and amount fields
    pub sale: Option<Sale>,
    /// No sale matched; a photo of the paper invoice must be attached
    pub requires_original_invoice: bool,
}

impl InvoiceLookup {
    pub fn new(invoice_number: String, sale: Option<Sale>) -> Self {
        let requires_original_invoice = sale.is_none();
        InvoiceLookup {
            invoice_number,
            sale,
            requires_original_invoice,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceQuery {
    pub invoice: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReturnFilter {
    pub state: Option<ReturnState>,
}
