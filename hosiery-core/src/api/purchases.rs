use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use uuid::Uuid;

use crate::auth::Session;
use crate::error::LedgerError;
use crate::models::purchase::{NewPurchase, Purchase, PurchaseFilter, PurchaseWithItems};
use crate::AppState;

pub async fn register_purchase(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(input): Json<NewPurchase>,
) -> Result<(StatusCode, Json<PurchaseWithItems>), LedgerError> {
    let purchase = state.ledger.register_purchase(&session, input).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

pub async fn list_purchases(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(filter): Query<PurchaseFilter>,
) -> Result<Json<Vec<Purchase>>, LedgerError> {
    Ok(Json(state.ledger.list_purchases(&session, filter).await?))
}

pub async fn get_purchase(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> Result<Json<PurchaseWithItems>, LedgerError> {
    Ok(Json(state.ledger.get_purchase(&session, id).await?))
}

/// Marks the shipment as arrived and books every line into stock.
pub async fn receive_purchase(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> Result<Json<PurchaseWithItems>, LedgerError> {
    Ok(Json(state.ledger.receive_purchase(&session, id).await?))
}
