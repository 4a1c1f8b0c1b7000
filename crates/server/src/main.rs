//! Thermal load prediction server
//!
//! Loads the model artifacts once, then serves predictions and insights
//! over HTTP until interrupted.

use anyhow::{Context, Result};
use std::sync::Arc;
use thermal_core::{
    audit::{AuditLog, LogStatus},
    health::{components, HealthRegistry},
    store::InMemoryPredictionStore,
    FeatureSchema, ModelArtifacts, PredictionService, ServiceMetrics, StructuredLogger,
};
use thermal_server::{api, config::ServerConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance_name,
        model_path = %config.model_path.display(),
        scaler_path = %config.scaler_path.display(),
        max_load = ?config.max_load,
        "Server configured"
    );

    let health_registry = HealthRegistry::new();
    for name in components::ALL {
        health_registry.register(name).await;
    }

    let metrics = ServiceMetrics::new();
    let logger = StructuredLogger::new(&config.instance_name);
    logger.log_startup(SERVICE_VERSION);

    // A broken deployment must not serve: any artifact error ends the process
    let loaded = ModelArtifacts::load(&config.artifact_config(), FeatureSchema::standard());
    health_registry
        .record_check(components::ARTIFACTS, &loaded)
        .await;
    let artifacts = match loaded {
        Ok(artifacts) => Arc::new(artifacts),
        Err(e) => {
            error!(error = %e, "Failed to load model artifacts");
            return Err(e).context("model artifacts could not be loaded");
        }
    };

    metrics.set_model_info(artifacts.version(), artifacts.kind());
    logger.log_artifacts_loaded(artifacts.version(), artifacts.kind());

    let audit = AuditLog::new(config.audit_capacity);
    audit
        .record(
            None,
            "Load artifacts",
            LogStatus::Success,
            format!("model {} ({})", artifacts.version(), artifacts.kind()),
        )
        .await;

    let state = Arc::new(api::AppState::new(
        PredictionService::new(artifacts).with_output_config(config.output_config()),
        Arc::new(InMemoryPredictionStore::new()),
        audit,
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));
    state.metrics.set_stored_predictions(0);

    health_registry.set_ready(true).await;

    let shutdown_logger = logger.clone();
    api::serve(config.api_port, state, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        shutdown_logger.log_shutdown("SIGINT received");
    })
    .await?;

    info!("Shutting down");
    Ok(())
}
