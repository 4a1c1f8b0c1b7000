//! Core data models for the thermal load predictor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of building features the artifacts were fit with
pub const FEATURE_COUNT: usize = 8;

/// Validated building parameters, in the order the scaler and model expect.
///
/// Instances are produced by [`crate::schema::FeatureSchema`], which enforces
/// presence, range and integrality of every field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub relative_compactness: f64,
    pub surface_area: f64,
    pub wall_area: f64,
    pub roof_area: f64,
    pub overall_height: f64,
    pub orientation: f64,
    pub glazing_area: f64,
    pub glazing_area_distribution: f64,
}

impl PredictionRequest {
    /// Assemble the fixed-order feature vector
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.relative_compactness,
            self.surface_area,
            self.wall_area,
            self.roof_area,
            self.overall_height,
            self.orientation,
            self.glazing_area,
            self.glazing_area_distribution,
        ]
    }

    /// Inverse of [`PredictionRequest::to_vector`]
    pub fn from_vector(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            relative_compactness: values[0],
            surface_area: values[1],
            wall_area: values[2],
            roof_area: values[3],
            overall_height: values[4],
            orientation: values[5],
            glazing_area: values[6],
            glazing_area_distribution: values[7],
        }
    }
}

/// Raw, unvalidated feature input as submitted by a caller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureInput {
    /// Values keyed by feature name
    Named(std::collections::BTreeMap<String, f64>),
    /// Values in schema order
    Ordered(Vec<f64>),
}

/// Heating and cooling load estimates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalLoad {
    pub heating_load: f64,
    pub cooling_load: f64,
}

/// Output of a single prediction, attached to the requester's metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub user_id: String,
    pub request: PredictionRequest,
    pub load: ThermalLoad,
    pub model_version: String,
    pub generated_at: DateTime<Utc>,
}

/// A persisted prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: u64,
    pub user_id: String,
    pub features: PredictionRequest,
    pub load: ThermalLoad,
    pub model_version: String,
    pub created_at: DateTime<Utc>,
}

impl From<PredictionResult> for PredictionRecord {
    fn from(result: PredictionResult) -> Self {
        Self {
            // Assigned by the store on insert
            id: 0,
            user_id: result.user_id,
            features: result.request,
            load: result.load,
            model_version: result.model_version,
            created_at: result.generated_at,
        }
    }
}

/// The caller of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: false,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: true,
        }
    }

    /// Whether this user may read or remove data owned by `owner_id`
    pub fn can_manage(&self, owner_id: &str) -> bool {
        self.is_admin || self.id == owner_id
    }
}
