//! # Answer Bot Main Entry Point
//!
//! Loads configuration, initializes telemetry and the database (running any
//! pending migrations), then starts the HTTP server.

use answerbot::{config::ConfigLoader, db::init_pool, server::run_server, telemetry};
use migration::{Migrator, MigratorTrait};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "effective configuration");
    }

    let db = init_pool(&config).await?;

    // Schema migrations are additive and safe to run on every startup.
    Migrator::up(&db, None).await?;

    run_server(config, db).await
}
