use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;

use crate::auth::Session;
use crate::error::LedgerError;
use crate::models::cash::{
    CashPickup, CashRegister, MethodQuery, NewPickup, NewVerification, PaymentVerification, PeriodPreview,
};
use crate::models::movement::{CashMovement, MovementQuery};
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<CashRegister>, LedgerError> {
    Ok(Json(state.ledger.cash_register(&session).await?))
}

pub async fn movements(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<MovementQuery>,
) -> Result<Json<Vec<CashMovement>>, LedgerError> {
    let limit = query.limit.unwrap_or(100);
    Ok(Json(state.ledger.cash_movements(&session, limit).await?))
}

pub async fn pickup_preview(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<PeriodPreview>, LedgerError> {
    Ok(Json(state.ledger.pickup_preview(&session).await?))
}

pub async fn register_pickup(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(input): Json<NewPickup>,
) -> Result<(StatusCode, Json<CashPickup>), LedgerError> {
    let pickup = state.ledger.register_pickup(&session, input).await?;
    Ok((StatusCode::CREATED, Json(pickup)))
}

pub async fn list_pickups(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<CashPickup>>, LedgerError> {
    Ok(Json(state.ledger.list_pickups(&session).await?))
}

/// `GET /api/verifications/preview?method=tarjeta`
pub async fn verification_preview(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<MethodQuery>,
) -> Result<Json<PeriodPreview>, LedgerError> {
    Ok(Json(state.ledger.verification_preview(&session, query.method).await?))
}

pub async fn register_verification(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(input): Json<NewVerification>,
) -> Result<(StatusCode, Json<PaymentVerification>), LedgerError> {
    let verification = state.ledger.register_verification(&session, input).await?;
    Ok((StatusCode::CREATED, Json(verification)))
}

pub async fn list_verifications(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<MethodQuery>,
) -> Result<Json<Vec<PaymentVerification>>, LedgerError> {
    Ok(Json(state.ledger.list_verifications(&session, query.method).await?))
}
