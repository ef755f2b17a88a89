use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::models::user::{LoginRequest, LoginResponse, Role, User};
use crate::permissions::{load_capabilities, CapabilitySet};
use crate::AppState;

/// Authenticated caller, inserted into request extensions by
/// [`session_middleware`] and passed explicitly to every ledger operation.
#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: Uuid,
    pub role: Role,
    pub capabilities: CapabilitySet,
}

/// Claims carried inside the bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - the user's UUID as a string.
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

pub fn issue_token(user: &User, secret: &str, ttl_hours: i64) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (Utc::now() + Duration::hours(ttl_hours)).timestamp().max(0) as usize;
    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role,
        exp,
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, LedgerError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| LedgerError::Unauthorized)?;
    Ok(decoded.claims)
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}

/// Role to act with: the stored one, so a demotion applies to tokens
/// already issued. Unknown or inactive users are refused.
fn session_role(claimed: Role, stored: Option<(Role, bool)>) -> Result<Role, LedgerError> {
    match stored {
        Some((role, true)) => {
            if role != claimed {
                warn!(claimed = ?claimed, stored = ?role, "Token role is stale; using stored role");
            }
            Ok(role)
        }
        _ => Err(LedgerError::Unauthorized),
    }
}

/// Middleware validating the bearer token and building the [`Session`].
///
/// Capabilities are re-read from `permisos_usuario` on every request so
/// that revoking a flag takes effect without a new login.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, LedgerError> {
    let token = bearer_token(&req).ok_or(LedgerError::Unauthorized)?;
    let claims = decode_token(token, &state.config.jwt_secret)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| LedgerError::Unauthorized)?;

    let stored: Option<(Role, bool)> = sqlx::query_as("SELECT role, is_active FROM usuarios WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?;
    let role = session_role(claims.role, stored)?;

    let capabilities = load_capabilities(&state.db, user_id).await?;
    req.extensions_mut().insert(Session {
        user_id,
        role,
        capabilities,
    });

    Ok(next.run(req).await)
}

/// Verifies credentials and issues a session token.
pub async fn login(pool: &PgPool, secret: &str, ttl_hours: i64, request: LoginRequest) -> LedgerResult<LoginResponse> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, full_name, password_hash, role, is_active, created_at
        FROM usuarios
        WHERE username = $1
        "#,
    )
    .bind(request.username.trim())
    .fetch_optional(pool)
    .await?;

    let user = match user {
        Some(user) if user.is_active => user,
        _ => {
            warn!(username = %request.username, "Login rejected: unknown or inactive user");
            return Err(LedgerError::Unauthorized);
        }
    };

    let valid = bcrypt::verify(&request.password, &user.password_hash).unwrap_or(false);
    if !valid {
        warn!(user_id = %user.id, "Login rejected: bad password");
        return Err(LedgerError::Unauthorized);
    }

    let token = issue_token(&user, secret, ttl_hours).map_err(|e| {
        tracing::error!("Failed to sign session token: {}", e);
        LedgerError::Unauthorized
    })?;
    let capabilities = if user.role == Role::Admin {
        CapabilitySet::all()
    } else {
        load_capabilities(pool, user.id).await?
    };

    info!(user_id = %user.id, role = ?user.role, "User logged in");
    Ok(LoginResponse {
        token,
        capabilities,
        user: user.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: "caja1".to_string(),
            full_name: None,
            password_hash: String::new(),
            role,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trips_subject_and_role() {
        let seller = user(Role::Vendedor);
        let token = issue_token(&seller, "test-secret", 1).unwrap();
        let claims = decode_token(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, seller.id.to_string());
        assert_eq!(claims.role, Role::Vendedor);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(&user(Role::Admin), "secret-a", 1).unwrap();
        assert!(matches!(decode_token(&token, "secret-b"), Err(LedgerError::Unauthorized)));
    }

    #[test]
    fn demoted_admin_acts_with_stored_role() {
        assert_eq!(session_role(Role::Admin, Some((Role::Vendedor, true))).unwrap(), Role::Vendedor);
        assert_eq!(session_role(Role::Vendedor, Some((Role::Vendedor, true))).unwrap(), Role::Vendedor);
    }

    #[test]
    fn inactive_or_missing_user_has_no_session() {
        assert!(matches!(
            session_role(Role::Admin, Some((Role::Admin, false))),
            Err(LedgerError::Unauthorized)
        ));
        assert!(matches!(session_role(Role::Admin, None), Err(LedgerError::Unauthorized)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(&user(Role::Admin), "test-secret", -2).unwrap();
        assert!(decode_token(&token, "test-secret").is_err());
    }
}
