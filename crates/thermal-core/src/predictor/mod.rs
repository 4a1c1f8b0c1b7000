//! Prediction service
//!
//! A synchronous, stateless transform over the immutable model artifacts:
//! validated request → fixed-order vector → scaler → model → [`ThermalLoad`].
//! The async lifecycle operations (`predict_and_store`, `history`,
//! `delete`) wrap that transform with persistence, logging and auditing.

mod output;

pub use output::{OutputConfig, OutputFormatter};

use crate::artifacts::ModelArtifacts;
use crate::audit::{AuditLog, LogStatus};
use crate::error::{ThermalError, ThermalResult};
use crate::models::{
    FeatureInput, PredictionRecord, PredictionRequest, PredictionResult, ThermalLoad, User,
};
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::schema::FeatureSchema;
use crate::store::{self, PredictionStore};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

const CREATE_ACTION: &str = "Create prediction";
const DELETE_ACTION: &str = "Delete prediction";

/// Runs predictions against injected, load-once artifacts
#[derive(Clone)]
pub struct PredictionService {
    artifacts: Arc<ModelArtifacts>,
    formatter: OutputFormatter,
    metrics: Option<ServiceMetrics>,
    logger: Option<StructuredLogger>,
    audit: Option<AuditLog>,
}

impl PredictionService {
    pub fn new(artifacts: Arc<ModelArtifacts>) -> Self {
        Self {
            artifacts,
            formatter: OutputFormatter::new(),
            metrics: None,
            logger: None,
            audit: None,
        }
    }

    /// Clamp outputs with `config` instead of the default `[0, ∞)` range
    pub fn with_output_config(mut self, config: OutputConfig) -> Self {
        self.formatter = OutputFormatter::with_config(config);
        self
    }

    /// Record latency and outcome counts in Prometheus
    pub fn with_metrics(mut self, metrics: ServiceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Write every lifecycle outcome to `audit`
    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.artifacts.schema()
    }

    pub fn model_version(&self) -> &str {
        self.artifacts.version()
    }

    /// Validate raw input and predict
    pub fn predict_input(&self, user: &User, input: &FeatureInput) -> ThermalResult<PredictionResult> {
        let request = self.schema().parse(input).inspect_err(|e| self.count_error(e))?;
        self.predict(user, &request)
    }

    /// Predict for a request and attach the requester's metadata
    pub fn predict(&self, user: &User, request: &PredictionRequest) -> ThermalResult<PredictionResult> {
        let start = Instant::now();
        let load = self.run(request);

        if let Some(metrics) = &self.metrics {
            match &load {
                Ok(_) => {
                    metrics.observe_prediction_latency(start.elapsed().as_secs_f64());
                    metrics.inc_predictions_generated();
                }
                Err(e) => metrics.inc_prediction_errors(e.code()),
            }
        }

        Ok(PredictionResult {
            user_id: user.id.clone(),
            request: *request,
            load: load?,
            model_version: self.artifacts.version().to_string(),
            generated_at: Utc::now(),
        })
    }

    /// Heating and cooling load for a what-if input, without metadata.
    ///
    /// Counted separately from user predictions.
    pub fn estimate(&self, request: &PredictionRequest) -> ThermalResult<ThermalLoad> {
        let load = self.run(request)?;
        if let Some(metrics) = &self.metrics {
            metrics.inc_whatif_evaluations();
        }
        Ok(load)
    }

    /// Predict from raw input and persist the result for `user`
    pub async fn predict_and_store(
        &self,
        user: &User,
        input: &FeatureInput,
        store: &dyn PredictionStore,
    ) -> ThermalResult<PredictionRecord> {
        let result = match self.predict_input(user, input) {
            Ok(result) => result,
            Err(e) => {
                if let Some(logger) = &self.logger {
                    logger.log_prediction_rejected(&user.id, e.code(), &e.to_string());
                }
                self.audit(user, CREATE_ACTION, LogStatus::Error, e.to_string()).await;
                return Err(e);
            }
        };
        if let Some(logger) = &self.logger {
            logger.log_prediction(&result);
        }

        let record = match store.insert(result.into()).await {
            Ok(record) => record,
            Err(e) => {
                self.audit(user, CREATE_ACTION, LogStatus::Error, e.to_string()).await;
                return Err(e);
            }
        };
        self.audit(
            user,
            CREATE_ACTION,
            LogStatus::Success,
            format!("prediction #{} stored", record.id),
        )
        .await;
        Ok(record)
    }

    /// The user's own predictions, newest first
    pub async fn history(
        &self,
        user: &User,
        store: &dyn PredictionStore,
    ) -> ThermalResult<Vec<PredictionRecord>> {
        store.list_for_user(&user.id).await
    }

    /// Delete a prediction owned by `user`, or any prediction for an admin
    pub async fn delete(
        &self,
        user: &User,
        id: u64,
        store: &dyn PredictionStore,
    ) -> ThermalResult<PredictionRecord> {
        match store::delete_visible(store, user, id).await {
            Ok(record) => {
                if let Some(logger) = &self.logger {
                    logger.log_prediction_deleted(&user.id, id);
                }
                self.audit(user, DELETE_ACTION, LogStatus::Success, format!("prediction #{} deleted", id))
                    .await;
                Ok(record)
            }
            Err(e) => {
                self.audit(user, DELETE_ACTION, LogStatus::Warning, e.to_string()).await;
                Err(e)
            }
        }
    }

    fn run(&self, request: &PredictionRequest) -> ThermalResult<ThermalLoad> {
        self.schema().validate(request)?;
        let raw = self
            .artifacts
            .infer(&request.to_vector())
            .map_err(|e| ThermalError::inference(format!("{:#}", e)))?;
        self.formatter.format(&raw)
    }

    fn count_error(&self, error: &ThermalError) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_prediction_errors(error.code());
        }
    }

    async fn audit(&self, user: &User, action: &str, status: LogStatus, message: String) {
        if let Some(audit) = &self.audit {
            audit.record(Some(&user.id), action, status, message).await;
        }
    }
}
