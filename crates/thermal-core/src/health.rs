//! Component health for the liveness and readiness endpoints
//!
//! Components are registered healthy at startup and updated from the
//! outcomes of real operations: artifact loading, model runs and store
//! calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{ThermalError, ThermalResult};

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Still serving, with reduced guarantees
    Degraded,
    /// Component has failed
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the component is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            checked_at: Utc::now(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status across components; no components counts as healthy
    pub fn compute_status(components: &BTreeMap<String, ComponentHealth>) -> ComponentStatus {
        let mut status = ComponentStatus::Healthy;
        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => status = ComponentStatus::Degraded,
                ComponentStatus::Healthy => {}
            }
        }
        status
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names
pub mod components {
    /// Scaler and model files
    pub const ARTIFACTS: &str = "artifacts";
    /// Model runs; degraded after an inference error
    pub const PREDICTOR: &str = "predictor";
    /// Prediction persistence
    pub const STORE: &str = "store";

    pub const ALL: [&str; 3] = [ARTIFACTS, PREDICTOR, STORE];
}

/// Health registry for tracking component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<BTreeMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(BTreeMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component as healthy
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    /// Update component health status
    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components.write().await.insert(name.to_string(), health);
    }

    /// Mark component as healthy
    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    /// Mark component as degraded
    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    /// Mark component as unhealthy
    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Healthy on `Ok`, unhealthy with the error message otherwise
    pub async fn record_check<T, E: Display>(&self, name: &str, outcome: &Result<T, E>) {
        match outcome {
            Ok(_) => self.set_healthy(name).await,
            Err(e) => self.set_unhealthy(name, e.to_string()).await,
        }
    }

    /// Track a prediction outcome against the predictor component.
    ///
    /// Inference errors degrade it and the next success restores it.
    /// Rejected input says nothing about the model and is ignored.
    pub async fn record_prediction<T>(&self, outcome: &ThermalResult<T>) {
        match outcome {
            Ok(_) => {
                let degraded = self
                    .components
                    .read()
                    .await
                    .get(components::PREDICTOR)
                    .is_some_and(|h| h.status != ComponentStatus::Healthy);
                if degraded {
                    self.set_healthy(components::PREDICTOR).await;
                }
            }
            Err(ThermalError::Inference(message)) => {
                self.set_degraded(components::PREDICTOR, message.clone()).await;
            }
            Err(_) => {}
        }
    }

    /// Mark the service as ready (or not)
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Get overall health status
    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Get readiness status
    pub async fn readiness(&self) -> ReadinessResponse {
        if !*self.ready.read().await {
            return ReadinessResponse {
                ready: false,
                reason: Some("Service not yet initialized".to_string()),
            };
        }

        let components = self.components.read().await;
        let failing = components
            .iter()
            .find(|(_, h)| !h.status.is_operational())
            .map(|(name, _)| name.clone());

        match failing {
            Some(name) => ReadinessResponse {
                ready: false,
                reason: Some(format!("Critical component unhealthy: {}", name)),
            },
            None => ReadinessResponse {
                ready: true,
                reason: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_state_is_healthy_but_not_ready() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Service not yet initialized"));
    }

    #[tokio::test]
    async fn test_register_all_components() {
        let registry = HealthRegistry::new();
        for name in components::ALL {
            registry.register(name).await;
        }
        let health = registry.health().await;
        assert_eq!(health.components.len(), 3);
        assert_eq!(
            health.components[components::ARTIFACTS].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_degraded_component_degrades_overall() {
        let registry = HealthRegistry::new();
        registry.register(components::PREDICTOR).await;
        registry.set_degraded(components::STORE, "slow writes").await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);

        registry.set_ready(true).await;
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_unhealthy_component_blocks_readiness() {
        let registry = HealthRegistry::new();
        registry.register(components::PREDICTOR).await;
        registry.set_ready(true).await;

        let probe: Result<(), String> = Err("probe inference failed".to_string());
        registry.record_check(components::ARTIFACTS, &probe).await;

        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(
            readiness.reason.as_deref(),
            Some("Critical component unhealthy: artifacts")
        );
    }

    #[tokio::test]
    async fn test_record_check_recovers() {
        let registry = HealthRegistry::new();
        registry.set_unhealthy(components::STORE, "down").await;
        registry.record_check(components::STORE, &Ok::<_, String>(3usize)).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components[components::STORE].message.is_none());
    }

    #[tokio::test]
    async fn test_inference_error_degrades_predictor() {
        let registry = HealthRegistry::new();
        for name in components::ALL {
            registry.register(name).await;
        }
        registry.set_ready(true).await;

        let failed: ThermalResult<()> = Err(ThermalError::inference("model produced a non-finite load (NaN)"));
        registry.record_prediction(&failed).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[components::PREDICTOR].message.as_deref(),
            Some("model produced a non-finite load (NaN)")
        );
        assert!(registry.readiness().await.ready);

        registry.record_prediction(&Ok::<_, ThermalError>(())).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_rejected_input_leaves_predictor_healthy() {
        let registry = HealthRegistry::new();
        registry.register(components::PREDICTOR).await;

        let rejected: ThermalResult<()> = Err(ThermalError::validation("orientation out of range"));
        registry.record_prediction(&rejected).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }
}
