pub mod cash;
pub mod daily_close;
pub mod expense;
pub mod movement;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod sale_return;
pub mod user;

pub use cash::{CashPickup, CashRegister, PaymentVerification};
pub use daily_close::DailyClose;
pub use expense::Expense;
pub use movement::{CashMovement, StockMovement};
pub use product::Product;
pub use purchase::{Purchase, PurchaseLineItem};
pub use sale::Sale;
pub use sale_return::SaleReturn;
pub use user::User;

/// Trims an optional free-text field, mapping blank input to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// True when a required text field is missing or only whitespace.
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
