//! Descriptive statistics over stored predictions
//!
//! Purely a read/aggregate over persisted records; the model is not
//! involved. Empty input always yields a neutral summary.

use crate::models::PredictionRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correlation above which height is reported as driving heating load
pub const HEIGHT_HEATING_CORRELATION: f64 = 0.3;

/// Population std-dev of cooling load above which cooling is reported as unstable
pub const COOLING_STD_DEV_THRESHOLD: f64 = 1.5;

/// Correlation above which surface area is reported as driving heating load
pub const SURFACE_HEATING_CORRELATION: f64 = 0.25;

pub const NO_DATA_STATEMENT: &str =
    "No predictions have been made yet, so there is nothing to summarize.";

/// Summary statistics of one load series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation, 0 for fewer than two values
    pub std_dev: f64,
}

impl LoadStats {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        Self {
            mean: mean(values),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            std_dev: variance(values).sqrt(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// `dd/mm` of the prediction date
    pub label: String,
    pub heating_load: f64,
    pub cooling_load: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationAverage {
    pub orientation: i64,
    pub mean_cooling_load: f64,
}

/// Dashboard aggregates, ready for charts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total: usize,
    pub heating: LoadStats,
    pub cooling: LoadStats,
    pub max_heating_load: f64,
    pub min_cooling_load: f64,
    pub heating_std_dev: f64,
    /// Median over heating and cooling values combined
    pub overall_median: f64,
    pub cooling_by_orientation: Vec<OrientationAverage>,
    /// Oldest first
    pub series: Vec<SeriesPoint>,
    pub height_vs_heating: Vec<ScatterPoint>,
    pub surface_area_vs_cooling: Vec<ScatterPoint>,
}

impl DashboardSummary {
    /// Aggregate records in any order
    pub fn from_records(records: &[PredictionRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut ordered: Vec<&PredictionRecord> = records.iter().collect();
        ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let heating: Vec<f64> = ordered.iter().map(|r| r.load.heating_load).collect();
        let cooling: Vec<f64> = ordered.iter().map(|r| r.load.cooling_load).collect();
        let heating_stats = LoadStats::from_values(&heating);
        let cooling_stats = LoadStats::from_values(&cooling);

        let mut combined = heating.clone();
        combined.extend_from_slice(&cooling);

        let mut by_orientation: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
        for r in &ordered {
            by_orientation
                .entry(r.features.orientation.round() as i64)
                .or_default()
                .push(r.load.cooling_load);
        }

        Self {
            total: ordered.len(),
            heating: heating_stats,
            cooling: cooling_stats,
            max_heating_load: round2(heating_stats.max),
            min_cooling_load: round2(cooling_stats.min),
            heating_std_dev: round2(heating_stats.std_dev),
            overall_median: round2(median(&combined)),
            cooling_by_orientation: by_orientation
                .into_iter()
                .map(|(orientation, values)| OrientationAverage {
                    orientation,
                    mean_cooling_load: mean(&values),
                })
                .collect(),
            series: ordered
                .iter()
                .map(|r| SeriesPoint {
                    label: r.created_at.format("%d/%m").to_string(),
                    heating_load: r.load.heating_load,
                    cooling_load: r.load.cooling_load,
                })
                .collect(),
            height_vs_heating: ordered
                .iter()
                .map(|r| ScatterPoint {
                    x: r.features.overall_height,
                    y: r.load.heating_load,
                })
                .collect(),
            surface_area_vs_cooling: ordered
                .iter()
                .map(|r| ScatterPoint {
                    x: r.features.surface_area,
                    y: r.load.cooling_load,
                })
                .collect(),
        }
    }
}

/// Narrative statements derived from trends in stored predictions
pub fn automatic_statements(records: &[PredictionRecord]) -> Vec<String> {
    if records.is_empty() {
        return vec![NO_DATA_STATEMENT.to_string()];
    }

    let heights: Vec<f64> = records.iter().map(|r| r.features.overall_height).collect();
    let surfaces: Vec<f64> = records.iter().map(|r| r.features.surface_area).collect();
    let heating: Vec<f64> = records.iter().map(|r| r.load.heating_load).collect();
    let cooling: Vec<f64> = records.iter().map(|r| r.load.cooling_load).collect();

    let mut statements = Vec::new();

    if correlation(&heights, &heating).is_some_and(|c| c > HEIGHT_HEATING_CORRELATION) {
        statements.push("Heating loads tend to increase as overall height increases.".to_string());
    }

    if population_std_dev(&cooling) > COOLING_STD_DEV_THRESHOLD {
        statements.push("Cooling loads vary sharply across recent predictions.".to_string());
    }

    if correlation(&surfaces, &heating).is_some_and(|c| c > SURFACE_HEATING_CORRELATION) {
        statements.push(
            "Buildings with a larger surface area tend to produce higher thermal loads.".to_string(),
        );
    }

    if statements.is_empty() {
        statements.push("Predictions are stable with no marked trends.".to_string());
    }

    statements
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance
fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

fn population_std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (sum_sq / values.len() as f64).sqrt()
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Pearson correlation; `None` when either series has zero variance
pub fn correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let cov: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let sx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum::<f64>().sqrt();
    let sy: f64 = ys.iter().map(|y| (y - my).powi(2)).sum::<f64>().sqrt();
    let denom = sx * sy;
    if denom.abs() < f64::EPSILON {
        return None;
    }
    Some(cov / denom)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
