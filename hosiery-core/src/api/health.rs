use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{json, Value};

use crate::ledger::cash::REGISTER_ID;
use crate::AppState;

/// Liveness probe; never touches the database.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe.
///
/// Reads the cash register row, which only exists once the schema has been
/// migrated, so a reachable but empty database also reports unavailable.
pub async fn db_health_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let register: Option<i32> = sqlx::query_scalar("SELECT id FROM caja_efectivo WHERE id = $1")
        .bind(REGISTER_ID)
        .fetch_optional(&state.db)
        .await
        .map_err(|e| {
            tracing::error!("Database health check failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        })?;

    if register.is_none() {
        tracing::warn!("Database reachable but cash register row is missing");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(json!({
        "status": "ok",
        "database": "connected",
        "schema": "ready"
    })))
}
