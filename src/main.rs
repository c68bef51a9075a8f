//! Refresh runner
//!
//! Downloads all six feeds, publishes a catalog generation and prints the
//! refresh report as JSON.

use anyhow::Context;
use master_contract::{CatalogConfig, CatalogDb, CatalogService};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "master_contract=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CatalogConfig::default();
    let db_path = std::env::temp_dir().join("master-contract.db");
    let db = Arc::new(CatalogDb::new(&db_path).context("opening catalog database")?);

    let service = CatalogService::new(&config, db).context("building catalog service")?;

    let report = service.refresh().await.context("refreshing catalog")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("{}", report.summary());

    Ok(())
}
