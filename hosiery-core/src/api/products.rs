use axum::extract::{Path, Query, State};
use axum::response::Json;
use axum::Extension;
use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::error::LedgerError;
use crate::ledger::stock::StockChange;
use crate::models::movement::StockMovement;
use crate::models::product::{Product, PromoteReturned, StockAdjustment};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct StockChangeResponse {
    pub code: String,
    pub before: i32,
    pub after: i32,
}

impl StockChangeResponse {
    fn new(code: String, change: StockChange) -> Self {
        StockChangeResponse {
            code,
            before: change.before,
            after: change.after,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StockMovementQuery {
    pub code: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_products(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Product>>, LedgerError> {
    Ok(Json(state.ledger.list_products(&session).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(code): Path<String>,
) -> Result<Json<Product>, LedgerError> {
    Ok(Json(state.ledger.get_product(&session, &code).await?))
}

pub async fn adjust_stock(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(code): Path<String>,
    Json(adjustment): Json<StockAdjustment>,
) -> Result<Json<StockChangeResponse>, LedgerError> {
    let change = state.ledger.adjust_stock(&session, &code, adjustment).await?;
    Ok(Json(StockChangeResponse::new(code, change)))
}

pub async fn promote_returned(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(code): Path<String>,
    Json(request): Json<PromoteReturned>,
) -> Result<Json<StockChangeResponse>, LedgerError> {
    let change = state.ledger.promote_returned_stock(&session, &code, request).await?;
    Ok(Json(StockChangeResponse::new(code, change)))
}

pub async fn stock_movements(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<StockMovementQuery>,
) -> Result<Json<Vec<StockMovement>>, LedgerError> {
    let movements = state
        .ledger
        .stock_movements(&session, query.code.as_deref(), query.limit.unwrap_or(100))
        .await?;
    Ok(Json(movements))
}
