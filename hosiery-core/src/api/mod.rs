//! JSON HTTP surface over the ledger.

pub mod auth;
pub mod cash;
pub mod close;
pub mod documents;
pub mod expenses;
pub mod health;
pub mod products;
pub mod purchases;
pub mod returns;
pub mod sales;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::session_middleware;
use crate::services::storage::MAX_UPLOAD_BYTES;
use crate::AppState;

/// Creates the application router.
///
/// Everything under `/api` except login requires a bearer token.
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/me", get(auth::me))
        // Stock ledger
        .route("/api/products", get(products::list_products))
        .route("/api/products/:code", get(products::get_product))
        .route("/api/products/:code/adjust", post(products::adjust_stock))
        .route("/api/products/:code/promote-returned", post(products::promote_returned))
        .route("/api/movements/stock", get(products::stock_movements))
        // Sales
        .route("/api/sales", get(sales::list_sales).post(sales::register_sale))
        .route("/api/sales/:id", get(sales::get_sale))
        .route("/api/sales/:id/verify", post(sales::verify_sale))
        .route("/api/sales/:id/reject", post(sales::reject_sale))
        // Returns
        .route("/api/returns", get(returns::list_returns).post(returns::register_return))
        .route("/api/returns/lookup", get(returns::lookup_invoice))
        .route("/api/returns/:id/approve", post(returns::approve_return))
        .route("/api/returns/:id/reject", post(returns::reject_return))
        // Purchases
        .route("/api/purchases", get(purchases::list_purchases).post(purchases::register_purchase))
        .route("/api/purchases/:id", get(purchases::get_purchase))
        .route("/api/purchases/:id/receive", post(purchases::receive_purchase))
        // Expenses
        .route("/api/expenses", get(expenses::list_expenses).post(expenses::register_expense))
        .route("/api/expenses/:id/approve", post(expenses::approve_expense))
        // Cash register, pickups and verifications
        .route("/api/cash/register", get(cash::register))
        .route("/api/movements/cash", get(cash::movements))
        .route("/api/cash/pickups", get(cash::list_pickups).post(cash::register_pickup))
        .route("/api/cash/pickups/preview", get(cash::pickup_preview))
        .route("/api/verifications", get(cash::list_verifications).post(cash::register_verification))
        .route("/api/verifications/preview", get(cash::verification_preview))
        // Daily close
        .route("/api/close", get(close::list_closes).post(close::close_day))
        .route("/api/close/status", get(close::close_status))
        // Uploads and OCR
        .route(
            "/api/uploads/:kind",
            post(documents::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)),
        )
        .route("/api/ocr/:kind", post(documents::ocr_prefill))
        .route_layer(middleware::from_fn_with_state(state.clone(), session_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/db", get(health::db_health_check))
        .route("/api/auth/login", post(auth::login))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StorageConfig};
    use crate::ledger::LedgerPolicy;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let config = Config {
            database_url: "postgres://localhost/unused".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            db_max_connections: 1,
            jwt_secret: "router-test-secret".to_string(),
            jwt_ttl_hours: 1,
            environment: "test".to_string(),
            storage: StorageConfig {
                base_url: "http://localhost:9/storage/v1".to_string(),
                bucket: "test".to_string(),
                api_key: None,
            },
            ocr: None,
            policy: LedgerPolicy::default(),
            run_migrations: false,
        };
        // Never connects unless a handler reaches the database.
        let pool = PgPoolOptions::new().connect_lazy(&config.database_url).unwrap();
        AppState::new(pool, config)
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_route_without_token_is_unauthorized() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/api/products").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_bearer_token_is_unauthorized() {
        let app = create_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/sales")
                    .header("authorization", "Bearer not-a-jwt")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = create_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
