//! What-if analysis: re-run the predictor on constructed inputs
//!
//! Every scenario and sweep point is an ordinary prediction against a
//! baseline derived from the user's history; nothing here touches the
//! model directly.

use super::statistics::mean;
use crate::error::{ThermalError, ThermalResult};
use crate::models::{PredictionRecord, PredictionRequest, ThermalLoad, FEATURE_COUNT};
use crate::predictor::PredictionService;
use crate::schema::{FeatureSchema, FeatureSpec};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Upper bound on the number of points a single sweep may evaluate
pub const MAX_SWEEP_POINTS: usize = 100;

pub const NOT_ENOUGH_DATA_STATEMENT: &str =
    "Not enough data yet to generate predictive insights.";

const HEIGHT_INCREASE: f64 = 0.10;
const SURFACE_AREA_INCREASE: f64 = 0.15;

/// Orientations compared when searching for the lowest cooling load,
/// the full range the schema accepts
const CANDIDATE_ORIENTATIONS: std::ops::RangeInclusive<u8> = 1..=5;

/// How the fixed feature vector for what-if runs is derived from history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Baseline {
    /// Per-feature mean over all records, integer features rounded
    #[default]
    Average,
    /// Features of the most recent record
    Latest,
}

impl Baseline {
    /// `None` when there is no history
    pub fn resolve(
        self,
        schema: &FeatureSchema,
        records: &[PredictionRecord],
    ) -> Option<PredictionRequest> {
        if records.is_empty() {
            return None;
        }
        match self {
            Baseline::Latest => records
                .iter()
                .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
                .map(|r| r.features),
            Baseline::Average => {
                let mut values = [0.0; FEATURE_COUNT];
                for (idx, (slot, spec)) in values.iter_mut().zip(schema.features()).enumerate() {
                    let column: Vec<f64> = records.iter().map(|r| r.features.to_vector()[idx]).collect();
                    let avg = mean(&column);
                    *slot = if spec.integer { avg.round() } else { avg };
                }
                schema
                    .parse_values(&values)
                    .inspect_err(|e| warn!(error = %e, "Averaged baseline failed validation"))
                    .ok()
            }
        }
    }
}

/// One constructed what-if comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub feature: String,
    pub baseline_value: f64,
    pub scenario_value: f64,
    pub predicted: ThermalLoad,
    pub narrative: String,
}

/// Baseline prediction plus the scenarios that could be evaluated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictiveInsights {
    pub baseline: Option<PredictionRequest>,
    pub baseline_load: Option<ThermalLoad>,
    pub scenarios: Vec<Scenario>,
    pub statements: Vec<String>,
}

impl PredictiveInsights {
    fn not_enough_data() -> Self {
        Self {
            statements: vec![NOT_ENOUGH_DATA_STATEMENT.to_string()],
            ..Self::default()
        }
    }
}

/// Parameters of a one-feature sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRequest {
    pub feature: String,
    pub start: f64,
    pub end: f64,
    pub step: f64,
    #[serde(default)]
    pub baseline: Baseline,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub value: f64,
    pub load: ThermalLoad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Flat,
    Mixed,
}

impl Trend {
    fn of(values: &[f64]) -> Self {
        let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        if diffs.iter().all(|d| d.abs() < 1e-9) {
            Trend::Flat
        } else if diffs.iter().all(|d| *d >= -1e-9) {
            Trend::Increasing
        } else if diffs.iter().all(|d| *d <= 1e-9) {
            Trend::Decreasing
        } else {
            Trend::Mixed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub feature: String,
    pub baseline: Option<PredictionRequest>,
    pub points: Vec<SweepPoint>,
    pub heating_trend: Trend,
    pub cooling_trend: Trend,
    pub narrative: String,
}

/// Values a sweep will evaluate, `start..=end` by `step`
pub fn sweep_values(spec: &FeatureSpec, start: f64, end: f64, step: f64) -> ThermalResult<Vec<f64>> {
    if !(start.is_finite() && end.is_finite() && step.is_finite()) {
        return Err(ThermalError::validation("sweep bounds and step must be finite"));
    }
    if step <= 0.0 {
        return Err(ThermalError::validation(format!(
            "sweep step must be positive, got {}",
            step
        )));
    }
    if start > end {
        return Err(ThermalError::validation(format!(
            "sweep start {} is greater than end {}",
            start, end
        )));
    }
    if spec.integer && (start.fract() != 0.0 || step.fract() != 0.0) {
        return Err(ThermalError::validation(format!(
            "feature '{}' is integer valued; start and step must be whole numbers",
            spec.name
        )));
    }
    spec.check(start)?;
    spec.check(end)?;

    // Tolerance keeps 0.1 steps from dropping the end point
    let steps = ((end - start) / step + 1e-9).floor();
    if steps >= MAX_SWEEP_POINTS as f64 {
        return Err(ThermalError::validation(format!(
            "sweep would evaluate more than {} points",
            MAX_SWEEP_POINTS
        )));
    }
    let count = steps as usize + 1;

    Ok((0..count)
        .map(|i| {
            let value = start + i as f64 * step;
            if spec.integer {
                value.round()
            } else {
                value.min(end)
            }
        })
        .collect())
}

/// Evaluate the height, surface area and orientation scenarios
pub fn scenarios(
    predictor: &PredictionService,
    records: &[PredictionRecord],
    baseline: Baseline,
) -> PredictiveInsights {
    let schema = predictor.schema();
    let Some(base) = baseline.resolve(schema, records) else {
        return PredictiveInsights::not_enough_data();
    };

    let base_load = match predictor.estimate(&base) {
        Ok(load) => load,
        Err(e) => {
            warn!(error = %e, "Baseline prediction failed");
            return PredictiveInsights::not_enough_data();
        }
    };

    let mut found = Vec::new();

    for (name, factor) in [
        ("overall_height", HEIGHT_INCREASE),
        ("surface_area", SURFACE_AREA_INCREASE),
    ] {
        match scale_feature(predictor, &base, name, factor) {
            Ok(scenario) => found.push(with_heating_narrative(scenario, base_load.heating_load, factor)),
            Err(e) => warn!(feature = name, error = %e, "Skipping scenario"),
        }
    }

    match best_orientation(predictor, &base) {
        Ok(Some(scenario)) => found.push(scenario),
        Ok(None) => debug!("No orientation could be evaluated"),
        Err(e) => warn!(error = %e, "Skipping orientation scenario"),
    }

    let statements = if found.is_empty() {
        vec![NOT_ENOUGH_DATA_STATEMENT.to_string()]
    } else {
        found.iter().map(|s| s.narrative.clone()).collect()
    };

    PredictiveInsights {
        baseline: Some(base),
        baseline_load: Some(base_load),
        scenarios: found,
        statements,
    }
}

fn scale_feature(
    predictor: &PredictionService,
    base: &PredictionRequest,
    name: &str,
    factor: f64,
) -> ThermalResult<Scenario> {
    let idx = predictor
        .schema()
        .index_of(name)
        .ok_or_else(|| ThermalError::validation(format!("unknown feature '{}'", name)))?;
    let baseline_value = base.to_vector()[idx];
    let scenario_value = baseline_value * (1.0 + factor);
    let request = predictor.schema().with_feature(base, name, scenario_value)?;
    Ok(Scenario {
        feature: name.to_string(),
        baseline_value,
        scenario_value,
        predicted: predictor.estimate(&request)?,
        narrative: String::new(),
    })
}

fn with_heating_narrative(mut scenario: Scenario, base_heating: f64, factor: f64) -> Scenario {
    scenario.narrative = format!(
        "Increasing {} by {:.0}% (from {:.2} to {:.2}) changes heating load from {:.2} to {:.2} ({}).",
        scenario.feature.replace('_', " "),
        factor * 100.0,
        scenario.baseline_value,
        scenario.scenario_value,
        base_heating,
        scenario.predicted.heating_load,
        format_change(base_heating, scenario.predicted.heating_load),
    );
    scenario
}

fn best_orientation(
    predictor: &PredictionService,
    base: &PredictionRequest,
) -> ThermalResult<Option<Scenario>> {
    let mut best: Option<(f64, ThermalLoad)> = None;
    for orientation in CANDIDATE_ORIENTATIONS {
        let value = f64::from(orientation);
        let request = predictor.schema().with_feature(base, "orientation", value)?;
        let load = predictor.estimate(&request)?;
        let better = match best {
            Some((_, current)) => load.cooling_load < current.cooling_load,
            None => true,
        };
        if better {
            best = Some((value, load));
        }
    }

    Ok(best.map(|(value, load)| Scenario {
        feature: "orientation".to_string(),
        baseline_value: base.orientation,
        scenario_value: value,
        predicted: load,
        narrative: format!(
            "The orientation with the lowest estimated cooling load is {} ({:.2}).",
            value, load.cooling_load
        ),
    }))
}

/// Vary one feature while holding the rest at the baseline
pub fn sweep(
    predictor: &PredictionService,
    records: &[PredictionRecord],
    request: &SweepRequest,
) -> ThermalResult<SweepResult> {
    let schema = predictor.schema();
    let spec = schema.spec(&request.feature).ok_or_else(|| {
        ThermalError::validation(format!("unknown feature '{}'", request.feature))
    })?;
    let values = sweep_values(spec, request.start, request.end, request.step)?;

    let Some(base) = request.baseline.resolve(schema, records) else {
        return Ok(SweepResult {
            feature: request.feature.clone(),
            baseline: None,
            points: Vec::new(),
            heating_trend: Trend::Flat,
            cooling_trend: Trend::Flat,
            narrative: NOT_ENOUGH_DATA_STATEMENT.to_string(),
        });
    };

    let points = values
        .into_iter()
        .map(|value| {
            let input = schema.with_feature(&base, &request.feature, value)?;
            Ok(SweepPoint {
                value,
                load: predictor.estimate(&input)?,
            })
        })
        .collect::<ThermalResult<Vec<_>>>()?;

    let heating: Vec<f64> = points.iter().map(|p| p.load.heating_load).collect();
    let cooling: Vec<f64> = points.iter().map(|p| p.load.cooling_load).collect();

    Ok(SweepResult {
        feature: request.feature.clone(),
        baseline: Some(base),
        narrative: sweep_narrative(&request.feature, &points),
        heating_trend: Trend::of(&heating),
        cooling_trend: Trend::of(&cooling),
        points,
    })
}

fn sweep_narrative(feature: &str, points: &[SweepPoint]) -> String {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return NOT_ENOUGH_DATA_STATEMENT.to_string();
    };
    let feature = feature.replace('_', " ");
    if points.len() == 1 {
        return format!(
            "At {} = {} the estimated heating load is {:.2} and cooling load is {:.2}.",
            feature, first.value, first.load.heating_load, first.load.cooling_load
        );
    }
    format!(
        "Changing {} from {} to {} changes heating load by {} and cooling load by {}.",
        feature,
        first.value,
        last.value,
        format_change(first.load.heating_load, last.load.heating_load),
        format_change(first.load.cooling_load, last.load.cooling_load),
    )
}

fn format_change(from: f64, to: f64) -> String {
    if from.abs() < f64::EPSILON {
        return format!("{:+.2} absolute", to - from);
    }
    format!("{:+.1}%", (to - from) / from * 100.0)
}
