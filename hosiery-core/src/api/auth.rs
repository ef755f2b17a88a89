use axum::extract::State;
use axum::response::Json;
use axum::Extension;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{self as session_auth, Session};
use crate::error::LedgerError;
use crate::models::user::{LoginRequest, LoginResponse, Role};
use crate::permissions::CapabilitySet;
use crate::AppState;

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, LedgerError> {
    let response = session_auth::login(
        &state.db,
        &state.config.jwt_secret,
        state.config.jwt_ttl_hours,
        request,
    )
    .await?;
    Ok(Json(response))
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user_id: Uuid,
    pub role: Role,
    pub capabilities: CapabilitySet,
}

/// `GET /api/me`: returns the session as the server sees it.
pub async fn me(Extension(session): Extension<Session>) -> Json<MeResponse> {
    let capabilities = if session.role == Role::Admin {
        CapabilitySet::all()
    } else {
        session.capabilities
    };
    Json(MeResponse {
        user_id: session.user_id,
        role: session.role,
        capabilities,
    })
}
