//! Service configuration loaded from the environment (`.env` via `dotenv`).

use chrono::NaiveDate;
use std::env;
use std::str::FromStr;

use crate::ledger::{LedgerPolicy, ReturnCashPolicy};

/// Runtime configuration for the back-office service.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Bind host for the HTTP server
    pub server_host: String,

    /// Bind port for the HTTP server
    pub server_port: u16,

    /// Maximum pool connections
    pub db_max_connections: u32,

    /// HS256 secret used to sign session tokens
    pub jwt_secret: String,

    /// Session token lifetime in hours
    pub jwt_ttl_hours: i64,

    /// development | staging | production
    pub environment: String,

    /// Object storage settings
    pub storage: StorageConfig,

    /// OCR extraction service; `None` disables OCR pre-fill
    pub ocr: Option<OcrConfig>,

    /// Ledger behavior switches
    pub policy: LedgerPolicy,

    /// Apply `migrations/` on startup
    pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_url: String,
    pub bucket: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
}

/// Error raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    /// Reads the configuration from process environment variables.
    ///
    /// Malformed values are rejected rather than replaced by defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if environment == "development" => "dev-jwt-secret-not-for-production".to_string(),
            _ => return Err(ConfigError::Missing("JWT_SECRET")),
        };

        let ocr = env::var("OCR_ENDPOINT").ok().filter(|s| !s.is_empty()).map(|endpoint| OcrConfig {
            endpoint,
            api_key: env::var("OCR_API_KEY").ok(),
        });

        let policy = LedgerPolicy {
            return_cash: parse_or("RETURN_CASH_POLICY", ReturnCashPolicy::Manual)?,
            enforce_close_gate: parse_or("ENFORCE_CLOSE_GATE", false)?,
            pickup_epoch: parse_date_or("PICKUP_EPOCH", default_pickup_epoch())?,
        };

        Ok(Config {
            database_url,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: parse_or("SERVER_PORT", 3000)?,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            jwt_secret,
            jwt_ttl_hours: parse_or("JWT_TTL_HOURS", 12)?,
            environment,
            storage: StorageConfig {
                base_url: env::var("STORAGE_BASE_URL").unwrap_or_else(|_| "http://localhost:54321/storage/v1".to_string()),
                bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "comprobantes".to_string()),
                api_key: env::var("STORAGE_API_KEY").ok(),
            },
            ocr,
            policy,
            run_migrations: parse_or("RUN_MIGRATIONS", false)?,
        })
    }
}

pub fn default_pickup_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_date_or(name: &'static str, default: NaiveDate) -> Result<NaiveDate, ConfigError> {
    match env::var(name) {
        Ok(value) => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
