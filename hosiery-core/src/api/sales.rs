use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use uuid::Uuid;

use crate::auth::Session;
use crate::error::LedgerError;
use crate::models::sale::{NewSale, RejectSale, Sale, SaleFilter};
use crate::AppState;

pub async fn register_sale(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(input): Json<NewSale>,
) -> Result<(StatusCode, Json<Sale>), LedgerError> {
    let sale = state.ledger.register_sale(&session, input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn list_sales(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(filter): Query<SaleFilter>,
) -> Result<Json<Vec<Sale>>, LedgerError> {
    Ok(Json(state.ledger.list_sales(&session, filter).await?))
}

pub async fn get_sale(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> Result<Json<Sale>, LedgerError> {
    Ok(Json(state.ledger.get_sale(&session, id).await?))
}

pub async fn verify_sale(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> Result<Json<Sale>, LedgerError> {
    Ok(Json(state.ledger.verify_sale(&session, id).await?))
}

/// The body is optional; an empty request rejects without a reason.
pub async fn reject_sale(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
    request: Option<Json<RejectSale>>,
) -> Result<StatusCode, LedgerError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    state.ledger.reject_sale(&session, id, request).await?;
    Ok(StatusCode::NO_CONTENT)
}
