//! Error taxonomy shared by the ledger and the HTTP layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::permissions::Capability;

/// A condition the operator may override by resubmitting with confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// Requested quantity exceeds sellable stock
    InsufficientStock {
        product_code: String,
        requested: i32,
        available: i32,
    },
    /// Counted cash is above what the system accumulated for the period
    PickupExceedsAccumulated {
        counted: Decimal,
        accumulated: Decimal,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::InsufficientStock {
                product_code,
                requested,
                available,
            } => write!(
                f,
                "product {} has {} pairs in stock, {} requested",
                product_code, available, requested
            ),
            Advisory::PickupExceedsAccumulated { counted, accumulated } => write!(
                f,
                "counted cash {} exceeds accumulated cash {}",
                counted, accumulated
            ),
        }
    }
}

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("confirmation required: {0}")]
    Advisory(Advisory),

    #[error("missing capability {0}")]
    Forbidden(Capability),

    #[error("unauthorized")]
    Unauthorized,

    #[error("remote service error: {0}")]
    Remote(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation_error",
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::Conflict(_) => "conflict",
            LedgerError::Advisory(_) => "confirmation_required",
            LedgerError::Forbidden(_) => "forbidden",
            LedgerError::Unauthorized => "unauthorized",
            LedgerError::Remote(_) => "remote_service_error",
            LedgerError::Database(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
            LedgerError::Conflict(_) => StatusCode::CONFLICT,
            LedgerError::Advisory(_) => StatusCode::PRECONDITION_REQUIRED,
            LedgerError::Forbidden(_) => StatusCode::FORBIDDEN,
            LedgerError::Unauthorized => StatusCode::UNAUTHORIZED,
            LedgerError::Remote(_) => StatusCode::BAD_GATEWAY,
            LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<Advisory>,
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let message = match &self {
            LedgerError::Database(e) => {
                tracing::error!(error = %e, "Ledger database error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        let warning = match &self {
            LedgerError::Advisory(advisory) => Some(advisory.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.code(),
            message,
            warning,
        };
        (self.status(), Json(body)).into_response()
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn advisory_maps_to_precondition_required() {
        let err = LedgerError::Advisory(Advisory::PickupExceedsAccumulated {
            counted: dec!(310000),
            accumulated: dec!(300000),
        });
        assert_eq!(err.status(), StatusCode::PRECONDITION_REQUIRED);
        assert_eq!(err.code(), "confirmation_required");
    }

    #[test]
    fn insufficient_stock_message_names_product() {
        let advisory = Advisory::InsufficientStock {
            product_code: "74113".to_string(),
            requested: 5,
            available: 2,
        };
        assert_eq!(advisory.to_string(), "product 74113 has 2 pairs in stock, 5 requested");
    }

    #[test]
    fn database_errors_are_internal() {
        let err = LedgerError::from(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
