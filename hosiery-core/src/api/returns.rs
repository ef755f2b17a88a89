use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use uuid::Uuid;

use crate::auth::Session;
use crate::error::LedgerError;
use crate::models::sale_return::{InvoiceLookup, InvoiceQuery, NewReturn, ReturnFilter, SaleReturn};
use crate::AppState;

/// `GET /api/returns/lookup?invoice=...`
pub async fn lookup_invoice(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<InvoiceQuery>,
) -> Result<Json<InvoiceLookup>, LedgerError> {
    Ok(Json(state.ledger.lookup_invoice(&session, &query.invoice).await?))
}

pub async fn register_return(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(input): Json<NewReturn>,
) -> Result<(StatusCode, Json<SaleReturn>), LedgerError> {
    let sale_return = state.ledger.register_return(&session, input).await?;
    Ok((StatusCode::CREATED, Json(sale_return)))
}

pub async fn list_returns(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(filter): Query<ReturnFilter>,
) -> Result<Json<Vec<SaleReturn>>, LedgerError> {
    Ok(Json(state.ledger.list_returns(&session, filter).await?))
}

pub async fn approve_return(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> Result<Json<SaleReturn>, LedgerError> {
    Ok(Json(state.ledger.approve_return(&session, id).await?))
}

pub async fn reject_return(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> Result<Json<SaleReturn>, LedgerError> {
    Ok(Json(state.ledger.reject_return(&session, id).await?))
}
