use tracing::info;
use uuid::Uuid;

use crate::auth::Session;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::state_machine::{Transition, WorkflowAction};
use crate::ledger::{cash, Ledger};
use crate::models::expense::{Expense, ExpenseFilter, ExpenseState, NewExpense};
use crate::models::movement::CashMovementType;
use crate::permissions::{require, Capability};

const EXPENSE_COLUMNS: &str =
    "id, concept, amount, category, document_url, state, registered_by, approved_by, approved_at, created_at";

impl Ledger {
    /// Registers a pending expense. The register is untouched until approval.
    pub async fn register_expense(&self, session: &Session, input: NewExpense) -> LedgerResult<Expense> {
        require(session, Capability::RegisterExpenses)?;
        let input = input.validate()?;

        let expense = sqlx::query_as::<_, Expense>(&format!(
            r#"
            INSERT INTO gastos_extra (id, concept, amount, category, document_url, state, registered_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.concept)
        .bind(input.amount)
        .bind(&input.category)
        .bind(&input.document_url)
        .bind(ExpenseState::initial_state())
        .bind(session.user_id)
        .fetch_one(self.pool())
        .await?;

        info!(expense_id = %expense.id, concept = %expense.concept, amount = %expense.amount, "Expense registered");
        Ok(expense)
    }

    /// Approves a pending expense and debits it from the register.
    ///
    /// A second approval fails with `Conflict` and debits nothing.
    pub async fn approve_expense(&self, session: &Session, expense_id: Uuid) -> LedgerResult<Expense> {
        require(session, Capability::ApproveExpenses)?;

        let mut tx = self.pool().begin().await?;
        let current = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {} FROM gastos_extra WHERE id = $1 FOR UPDATE",
            EXPENSE_COLUMNS
        ))
        .bind(expense_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| LedgerError::not_found("expense", expense_id))?;

        let next = current.state.transition(WorkflowAction::Approve)?;

        let expense = sqlx::query_as::<_, Expense>(&format!(
            r#"
            UPDATE gastos_extra
            SET state = $2, approved_by = $3, approved_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(expense_id)
        .bind(next)
        .bind(session.user_id)
        .fetch_one(&mut *tx)
        .await?;

        cash::apply_cash_delta(
            &mut tx,
            -expense.amount,
            CashMovementType::Expense,
            Some(expense.id),
            session.user_id,
            Some(&expense.concept),
        )
        .await?;

        tx.commit().await?;

        info!(%expense_id, amount = %expense.amount, "Expense approved");
        Ok(expense)
    }

    pub async fn list_expenses(&self, session: &Session, filter: ExpenseFilter) -> LedgerResult<Vec<Expense>> {
        require(session, Capability::RegisterExpenses)?;
        let rows = sqlx::query_as::<_, Expense>(&format!(
            r#"
            SELECT {} FROM gastos_extra
            WHERE ($1::varchar IS NULL OR state = $1)
            ORDER BY created_at DESC
            "#,
            EXPENSE_COLUMNS
        ))
        .bind(filter.state)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}
