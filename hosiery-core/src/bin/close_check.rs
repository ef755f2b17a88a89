use dotenv::dotenv;
use hosiery_core::config::Config;
use hosiery_core::db;
use hosiery_core::ledger::Ledger;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Reports whether yesterday (store time) still needs a daily close.
///
/// Prints the status as JSON and exits with code 2 while the day is
/// blocking, so cron or a shell prompt can nag the operator.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"))
        .add_directive(LevelFilter::WARN.into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url, 1)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    let status = Ledger::new(pool, config.policy).close_status().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);

    if status.blocked {
        warn!(date = %status.date, sales = status.sale_count, "Day still needs closing");
        std::process::exit(2);
    }
    info!(date = %status.date, "Nothing to close");
    Ok(())
}
