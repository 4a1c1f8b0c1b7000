//! Core library for building thermal load prediction
//!
//! This crate provides:
//! - The fixed building feature schema and request validation
//! - Load-once model artifacts (scaler + regression model)
//! - The prediction service
//! - Automatic and predictive insights over stored predictions
//! - Prediction store and audit log collaborators
//! - Health checks and observability

pub mod artifacts;
pub mod audit;
pub mod error;
pub mod health;
pub mod insights;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod schema;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use artifacts::{ArtifactConfig, ModelArtifacts};
pub use error::{ThermalError, ThermalResult};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use predictor::PredictionService;
pub use schema::FeatureSchema;
