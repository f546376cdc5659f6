//! price-api - rental price prediction service
//!
//! Loads the model bundle once at startup and serves predictions over HTTP.
//! A bundle that fails to load leaves the service up in degraded mode.

use anyhow::Result;
use price_api::{api, config::ServiceConfig};
use price_lib::{PredictionService, StructuredLogger, SERVICE_NAME};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServiceConfig::load()?;
    info!(
        model_path = %config.model_path,
        strict_features = config.strict_features,
        "Service configured"
    );

    let logger = StructuredLogger::new(SERVICE_NAME);
    logger.log_startup(SERVICE_VERSION, &config.model_path);

    // Load the bundle before accepting any request
    let service = PredictionService::load(&config.model_path, &config.load_options());
    let state = Arc::new(api::AppState::new(service));

    let shutdown_logger = logger.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        shutdown_logger.log_shutdown("SIGINT received");
    };

    api::serve(&config.bind_addr(), state, shutdown).await?;
    info!("Shutting down");

    Ok(())
}
