use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use uuid::Uuid;

use crate::auth::Session;
use crate::error::LedgerError;
use crate::models::expense::{Expense, ExpenseFilter, NewExpense};
use crate::AppState;

pub async fn register_expense(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(input): Json<NewExpense>,
) -> Result<(StatusCode, Json<Expense>), LedgerError> {
    let expense = state.ledger.register_expense(&session, input).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn list_expenses(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(filter): Query<ExpenseFilter>,
) -> Result<Json<Vec<Expense>>, LedgerError> {
    Ok(Json(state.ledger.list_expenses(&session, filter).await?))
}

pub async fn approve_expense(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> Result<Json<Expense>, LedgerError> {
    Ok(Json(state.ledger.approve_expense(&session, id).await?))
}
