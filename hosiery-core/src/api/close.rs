use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;

use crate::auth::Session;
use crate::error::LedgerError;
use crate::models::daily_close::{CloseListQuery, CloseRequest, CloseStatus, DailyClose};
use crate::AppState;

/// Any signed-in user may see whether yesterday still needs closing.
pub async fn close_status(State(state): State<AppState>) -> Result<Json<CloseStatus>, LedgerError> {
    Ok(Json(state.ledger.close_status().await?))
}

pub async fn close_day(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    request: Option<Json<CloseRequest>>,
) -> Result<(StatusCode, Json<DailyClose>), LedgerError> {
    let date = request.and_then(|Json(r)| r.date);
    let close = state.ledger.close_day(&session, date).await?;
    Ok((StatusCode::CREATED, Json(close)))
}

pub async fn list_closes(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<CloseListQuery>,
) -> Result<Json<Vec<DailyClose>>, LedgerError> {
    Ok(Json(state.ledger.list_closes(&session, query.limit()).await?))
}
