//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction and what-if counts,
//!   insight reports, store size, model version)
//! - Structured JSON logging with tracing

use crate::models::PredictionResult;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the registered Prometheus metrics
struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_generated: IntCounter,
    whatif_evaluations: IntCounter,
    prediction_errors: IntCounterVec,
    insights_generated: IntCounter,
    stored_predictions: IntGauge,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "thermal_prediction_latency_seconds",
                "Time spent scaling features and running the regression model",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_generated: register_int_counter!(
                "thermal_predictions_generated_total",
                "Total number of successful predictions"
            )
            .expect("Failed to register predictions_generated"),

            whatif_evaluations: register_int_counter!(
                "thermal_whatif_evaluations_total",
                "Total number of model runs for insight scenarios and sweeps"
            )
            .expect("Failed to register whatif_evaluations"),

            prediction_errors: register_int_counter_vec!(
                "thermal_prediction_errors_total",
                "Total number of rejected predictions by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors"),

            insights_generated: register_int_counter!(
                "thermal_insights_generated_total",
                "Total number of insight reports generated"
            )
            .expect("Failed to register insights_generated"),

            stored_predictions: register_int_gauge!(
                "thermal_stored_predictions",
                "Number of predictions currently held by the store"
            )
            .expect("Failed to register stored_predictions"),

            model_info: register_gauge_vec!(
                "thermal_model_info",
                "Information about the loaded model artifacts",
                &["version", "kind"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record a prediction latency observation
    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Increment the user prediction counter
    pub fn inc_predictions_generated(&self) {
        self.inner().predictions_generated.inc();
    }

    /// Current value of the user prediction counter
    pub fn predictions_generated(&self) -> u64 {
        self.inner().predictions_generated.get()
    }

    /// Increment the what-if evaluation counter
    pub fn inc_whatif_evaluations(&self) {
        self.inner().whatif_evaluations.inc();
    }

    /// Current value of the what-if evaluation counter
    pub fn whatif_evaluations(&self) -> u64 {
        self.inner().whatif_evaluations.get()
    }

    /// Increment the rejected prediction counter.
    ///
    /// `kind` is the error code, e.g. `validation_error`
    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner().prediction_errors.with_label_values(&[kind]).inc();
    }

    /// Increment the insight report counter
    pub fn inc_insights_generated(&self) {
        self.inner().insights_generated.inc();
    }

    /// Update the stored predictions gauge
    pub fn set_stored_predictions(&self, count: i64) {
        self.inner().stored_predictions.set(count);
    }

    /// Update model version info
    pub fn set_model_info(&self, version: &str, kind: &str) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[version, kind])
            .set(1.0);
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions,
/// insights, and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            "Thermal load service started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Thermal load service shutting down"
        );
    }

    /// Log a successful artifact load
    pub fn log_artifacts_loaded(&self, model_version: &str, kind: &str) {
        info!(
            event = "artifacts_loaded",
            instance = %self.instance,
            model_version = %model_version,
            kind = %kind,
            "Model artifacts ready"
        );
    }

    /// Log a prediction generation event
    pub fn log_prediction(&self, result: &PredictionResult) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            user_id = %result.user_id,
            heating_load = result.load.heating_load,
            cooling_load = result.load.cooling_load,
            model_version = %result.model_version,
            "Generated thermal load prediction"
        );
    }

    /// Log a rejected prediction request
    pub fn log_prediction_rejected(&self, user_id: &str, code: &str, reason: &str) {
        warn!(
            event = "prediction_rejected",
            instance = %self.instance,
            user_id = %user_id,
            code = %code,
            reason = %reason,
            "Prediction request rejected"
        );
    }

    /// Log a prediction deletion
    pub fn log_prediction_deleted(&self, user_id: &str, prediction_id: u64) {
        info!(
            event = "prediction_deleted",
            instance = %self.instance,
            user_id = %user_id,
            prediction_id = prediction_id,
            "Prediction deleted"
        );
    }

    /// Log an insights or sweep request
    pub fn log_insights(&self, user_id: &str, records: usize, statements: usize) {
        info!(
            event = "insights_generated",
            instance = %self.instance,
            user_id = %user_id,
            records = records,
            statements = statements,
            "Insights generated"
        );
    }
}
