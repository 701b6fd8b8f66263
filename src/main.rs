//! # Opérateurs Bio API Main Entry Point
//!
//! This is the main entry point for the Opérateurs Bio API service.

use migration::{Migrator, MigratorTrait};
use operateurs_bio::{config::ConfigLoader, db, server::run_server, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = config_loader.load()?;

    telemetry::init_tracing(&config)?;
    tracing::info!(
        profile = %config.profile,
        bind_addr = %config.api_bind_addr,
        feed_url = %config.feed_url,
        "Loaded configuration"
    );

    // Connect and bring the schema up to date before serving
    let db = db::init_pool(&config).await?;
    Migrator::up(&db, None).await?;

    run_server(config, db).await
}
