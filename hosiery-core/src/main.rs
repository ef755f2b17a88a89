use dotenv::dotenv;
use hosiery_core::config::Config;
use hosiery_core::{create_router, db, AppState};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(LevelFilter::INFO.into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!("Starting hosiery back-office server...");

    let config = Config::from_env()?;
    info!(
        environment = %config.environment,
        return_cash = %config.policy.return_cash,
        enforce_close_gate = config.policy.enforce_close_gate,
        "Configuration loaded"
    );
    if config.ocr.is_none() {
        warn!("OCR_ENDPOINT not set; document pre-fill will return empty forms");
    }

    let pool = db::create_pool(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    info!("Database connection pool initialized");

    if config.run_migrations {
        db::run_migrations(&pool).await?;
    }

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let app = create_router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
