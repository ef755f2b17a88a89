use std::fmt;

use crate::error::LedgerError;
use crate::models::expense::ExpenseState;
use crate::models::purchase::PurchaseState;
use crate::models::sale_return::ReturnState;

/// Operator action applied to an approval workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Goods arrived (purchases)
    ConfirmArrival,
    /// Admin approval (expenses, returns)
    Approve,
    /// Admin rejection (returns)
    Reject,
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowAction::ConfirmArrival => write!(f, "confirm_arrival"),
            WorkflowAction::Approve => write!(f, "approve"),
            WorkflowAction::Reject => write!(f, "reject"),
        }
    }
}

/// Trait for the closed two-step approval workflows.
///
/// A transition only succeeds from the expected prior state, so replaying
/// an approval is a `Conflict` instead of a second balance mutation.
pub trait Transition: Sized + Copy + fmt::Display {
    /// Human name of the record kind, used in error messages.
    const ENTITY: &'static str;

    /// State every new record starts in.
    fn initial_state() -> Self;

    /// Determines the next state for `action`, or fails if not allowed.
    fn transition(self, action: WorkflowAction) -> Result<Self, LedgerError>;

    fn is_terminal(self) -> bool;

    fn invalid(self, action: WorkflowAction) -> LedgerError {
        LedgerError::Conflict(format!("cannot {} a {} that is {}", action, Self::ENTITY, self))
    }
}

impl fmt::Display for PurchaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PurchaseState::AwaitingReceipt => write!(f, "pendiente_llegada"),
            PurchaseState::Received => write!(f, "recibida"),
        }
    }
}

impl fmt::Display for ExpenseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpenseState::Pending => write!(f, "pendiente"),
            ExpenseState::Approved => write!(f, "aprobado"),
        }
    }
}

impl fmt::Display for ReturnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnState::Pending => write!(f, "pendiente"),
            ReturnState::Approved => write!(f, "aprobada"),
            ReturnState::Rejected => write!(f, "rechazada"),
        }
    }
}

impl Transition for PurchaseState {
    const ENTITY: &'static str = "purchase";

    fn initial_state() -> Self {
        PurchaseState::AwaitingReceipt
    }

    fn transition(self, action: WorkflowAction) -> Result<Self, LedgerError> {
        match (self, action) {
            (PurchaseState::AwaitingReceipt, WorkflowAction::ConfirmArrival) => Ok(PurchaseState::Received),
            (state, action) => Err(state.invalid(action)),
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, PurchaseState::Received)
    }
}

impl Transition for ExpenseState {
    const ENTITY: &'static str = "expense";

    fn initial_state() -> Self {
        ExpenseState::Pending
    }

    fn transition(self, action: WorkflowAction) -> Result<Self, LedgerError> {
        match (self, action) {
            (ExpenseState::Pending, WorkflowAction::Approve) => Ok(ExpenseState::Approved),
            (state, action) => Err(state.invalid(action)),
        }
    }

    fn is_terminal(self) -> bool {
        matches!(self, ExpenseState::Approved)
    }
}

impl Transition for ReturnState {
    const ENTITY: &'static str = "return";

    fn initial_state() -> Self {
        ReturnState::Pending
    }

    fn transition(self, action: WorkflowAction) -> Result<Self, LedgerError> {
        match (self, action) {
            (ReturnState::Pending, WorkflowAction::Approve) => Ok(ReturnState::Approved),
            (ReturnState::Pending, WorkflowAction::Reject) => Ok(ReturnState::Rejected),
            (state, action) => Err(state.invalid(action)),
        }
    }

    fn is_terminal(self) -> bool {
        !matches!(self, ReturnState::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_arrival_transition() {
        let next = PurchaseState::initial_state()
            .transition(WorkflowAction::ConfirmArrival)
            .unwrap();
        assert_eq!(next, PurchaseState::Received);
        assert!(next.is_terminal());
    }

    #[test]
    fn test_purchase_cannot_be_received_twice() {
        let err = PurchaseState::Received
            .transition(WorkflowAction::ConfirmArrival)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert_eq!(
            err.to_string(),
            "conflict: cannot confirm_arrival a purchase that is recibida"
        );
    }

    #[test]
    fn test_expense_approval_is_single_shot() {
        let approved = ExpenseState::Pending.transition(WorkflowAction::Approve).unwrap();
        assert_eq!(approved, ExpenseState::Approved);
        assert!(approved.transition(WorkflowAction::Approve).is_err());
    }

    #[test]
    fn test_expense_has_no_rejection() {
        assert!(ExpenseState::Pending.transition(WorkflowAction::Reject).is_err());
    }

    #[test]
    fn test_return_review_paths() {
        assert_eq!(
            ReturnState::Pending.transition(WorkflowAction::Reject).unwrap(),
            ReturnState::Rejected
        );
        assert_eq!(
            ReturnState::Pending.transition(WorkflowAction::Approve).unwrap(),
            ReturnState::Approved
        );
        assert!(ReturnState::Rejected.transition(WorkflowAction::Approve).is_err());
        assert!(ReturnState::Approved.is_terminal());
        assert!(!ReturnState::Pending.is_terminal());
    }
}
