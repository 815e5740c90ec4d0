//! # Verde API
//!
//! REST server for the Verde POS reporting and invoice batching engine.
//!
//! ## Architecture
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        Verde API Server                        │
//! │                                                                │
//! │  POS clients ───► axum (8000) ───► repositories ───► SQLite    │
//! │                        │                                       │
//! │                        └──► batch coordinator ──► issuer seam  │
//! └────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod dto;
mod error;
mod handlers;
mod issuer;
mod startup;


use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use verde_db::{Database, DbConfig};

use crate::config::ApiConfig;
use crate::issuer::FolioIssuer;
use crate::startup::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Verde API server...");

    let config = ApiConfig::load()?;
    info!(
        port = config.port,
        database = %config.database_path,
        "Configuration loaded"
    );

    let db = Database::new(DbConfig::new(&config.database_path)).await?;
    info!("Database ready");

    // Folio numbering continues from the batches already on record.
    let issued_so_far = db.invoices().history().await?.len() as u64;
    let issuer = Arc::new(FolioIssuer::new(config.folio_series.clone(), issued_so_far));

    let state = AppState { db, issuer };
    startup::serve(state, config.port).await
}
