//! Insights over a user's prediction history
//!
//! Two independent parts:
//! - automatic: descriptive statistics and trend statements over stored records
//! - predictive: scenarios and sweeps produced by re-running the predictor

pub mod predictive;
pub mod statistics;

pub use predictive::{
    Baseline, PredictiveInsights, Scenario, SweepPoint, SweepRequest, SweepResult, Trend,
    MAX_SWEEP_POINTS,
};
pub use statistics::{DashboardSummary, LoadStats, OrientationAverage, ScatterPoint, SeriesPoint};

use crate::error::ThermalResult;
use crate::models::PredictionRecord;
use crate::observability::ServiceMetrics;
use crate::predictor::PredictionService;
use serde::{Deserialize, Serialize};

/// Everything the insights page shows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightReport {
    pub summary: DashboardSummary,
    pub automatic: Vec<String>,
    pub predictive: PredictiveInsights,
}

impl InsightReport {
    pub fn statement_count(&self) -> usize {
        self.automatic.len() + self.predictive.statements.len()
    }
}

/// Computes insights for records already scoped to the requesting user
#[derive(Clone)]
pub struct InsightsService {
    predictor: PredictionService,
    metrics: Option<ServiceMetrics>,
}

impl InsightsService {
    pub fn new(predictor: PredictionService) -> Self {
        Self {
            predictor,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ServiceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn summarize(&self, records: &[PredictionRecord]) -> DashboardSummary {
        DashboardSummary::from_records(records)
    }

    pub fn automatic(&self, records: &[PredictionRecord]) -> Vec<String> {
        statistics::automatic_statements(records)
    }

    pub fn predictive(&self, records: &[PredictionRecord], baseline: Baseline) -> PredictiveInsights {
        predictive::scenarios(&self.predictor, records, baseline)
    }

    pub fn sweep(&self, records: &[PredictionRecord], request: &SweepRequest) -> ThermalResult<SweepResult> {
        predictive::sweep(&self.predictor, records, request)
    }

    /// Full report: summary, automatic and predictive statements
    pub fn report(&self, records: &[PredictionRecord], baseline: Baseline) -> InsightReport {
        let report = InsightReport {
            summary: self.summarize(records),
            automatic: self.automatic(records),
            predictive: self.predictive(records, baseline),
        };
        if let Some(metrics) = &self.metrics {
            metrics.inc_insights_generated();
        }
        report
    }
}
