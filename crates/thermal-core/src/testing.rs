//! Shared fixtures for unit tests

use crate::artifacts::{LinearRegressor, ModelArtifacts, StandardScaler};
use crate::models::{PredictionRecord, PredictionRequest, ThermalLoad};
use crate::schema::FeatureSchema;
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

pub(crate) fn scaler() -> StandardScaler {
    StandardScaler {
        feature_names: FeatureSchema::standard()
            .names()
            .into_iter()
            .map(String::from)
            .collect(),
        mean: vec![0.76, 671.7, 318.5, 176.6, 5.25, 3.5, 0.23, 2.8],
        scale: vec![0.1, 88.0, 43.6, 45.1, 1.75, 1.1, 0.13, 1.55],
    }
}

pub(crate) fn linear_model() -> LinearRegressor {
    LinearRegressor {
        coefficients: vec![
            vec![-6.0, -4.0, 3.0, -5.0, 7.5, 0.0, 2.6, 0.3],
            vec![-5.5, -3.5, 2.0, -4.8, 7.4, 0.15, 1.9, 0.1],
        ],
        intercepts: vec![22.3, 24.6],
    }
}

pub(crate) fn artifacts() -> Arc<ModelArtifacts> {
    Arc::new(
        ModelArtifacts::from_parts(
            FeatureSchema::standard(),
            scaler(),
            Box::new(linear_model()),
            "fixture-v1",
        )
        .expect("fixture artifacts are valid"),
    )
}

pub(crate) fn sample_request() -> PredictionRequest {
    PredictionRequest::from_vector([0.98, 514.5, 294.0, 110.25, 7.0, 2.0, 0.0, 0.0])
}

/// Record with the given geometry and loads, `day` days after a fixed epoch
#[allow(clippy::too_many_arguments)]
pub(crate) fn record(
    id: u64,
    user_id: &str,
    day: i64,
    height: f64,
    surface_area: f64,
    orientation: f64,
    heating: f64,
    cooling: f64,
) -> PredictionRecord {
    let mut features = sample_request();
    features.overall_height = height;
    features.surface_area = surface_area;
    features.orientation = orientation;
    PredictionRecord {
        id,
        user_id: user_id.to_string(),
        features,
        load: ThermalLoad {
            heating_load: heating,
            cooling_load: cooling,
        },
        model_version: "fixture-v1".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::days(day),
    }
}
