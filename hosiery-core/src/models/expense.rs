use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::models::{is_blank, non_blank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar")]
pub enum ExpenseState {
    #[sqlx(rename = "pendiente")]
    #[serde(rename = "pendiente")]
    Pending,
    #[sqlx(rename = "aprobado")]
    #[serde(rename = "aprobado")]
    Approved,
}

/// Out-of-pocket expense paid from the register, maps to `gastos_extra`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub concept: String,
    pub amount: Decimal,
    pub category: Option<String>,
    pub document_url: Option<String>,
    pub state: ExpenseState,
    pub registered_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub concept: String,
    pub amount: Decimal,
    pub category: Option<String>,
    pub document_url: Option<String>,
}

impl NewExpense {
    pub fn validate(mut self) -> Result<Self, LedgerError> {
        if is_blank(&self.concept) {
            return Err(LedgerError::validation("concept is required"));
        }
        if self.amount <= Decimal::ZERO {
            return Err(LedgerError::validation("amount must be positive"));
        }
        self.concept = self.concept.trim().to_string();
        self.category = non_blank(self.category);
        self.document_url = non_blank(self.document_url);
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseFilter {
    pub state: Option<ExpenseState>,
}
