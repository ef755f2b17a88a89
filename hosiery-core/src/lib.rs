//! Back-office ledger for a compression-hosiery store: sales, returns,
//! purchases, expenses, cash pickups, payment verification and the daily
//! close, served as a JSON API.

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod models;
pub mod permissions;
pub mod services;

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::ledger::Ledger;
use crate::services::{OcrClient, StorageClient};

pub use api::create_router;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub db: PgPool,
    pub ledger: Ledger,
    pub config: Arc<Config>,
    pub storage: StorageClient,
    /// `None` when no OCR endpoint is configured
    pub ocr: Option<OcrClient>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let ledger = Ledger::new(db.clone(), config.policy);
        let storage = StorageClient::new(&config.storage);
        let ocr = config.ocr.as_ref().map(OcrClient::new);
        AppState {
            db,
            ledger,
            config: Arc::new(config),
            storage,
            ocr,
        }
    }
}
