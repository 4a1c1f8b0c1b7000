//! Building feature schema
//!
//! The fixed, ordered contract between user input, the scaler artifact and
//! the regression model. Converts raw [`FeatureInput`] into a validated
//! [`PredictionRequest`] and never pads or truncates.

use crate::error::{ThermalError, ThermalResult};
use crate::models::{FeatureInput, PredictionRequest, FEATURE_COUNT};
use serde::Serialize;

/// Valid domain of a single feature
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub integer: bool,
}

impl FeatureSpec {
    const fn continuous(name: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            min,
            max,
            integer: false,
        }
    }

    const fn discrete(name: &'static str, min: f64, max: f64) -> Self {
        Self {
            name,
            min,
            max,
            integer: true,
        }
    }

    /// Check a single value against this feature's domain
    pub fn check(&self, value: f64) -> ThermalResult<()> {
        if !value.is_finite() {
            return Err(ThermalError::validation(format!(
                "feature '{}' must be a finite number",
                self.name
            )));
        }
        if value < self.min || value > self.max {
            return Err(ThermalError::validation(format!(
                "feature '{}' = {} is outside [{}, {}]",
                self.name, value, self.min, self.max
            )));
        }
        if self.integer && value.fract() != 0.0 {
            return Err(ThermalError::validation(format!(
                "feature '{}' must be an integer, got {}",
                self.name, value
            )));
        }
        Ok(())
    }
}

const STANDARD_FEATURES: [FeatureSpec; FEATURE_COUNT] = [
    FeatureSpec::continuous("relative_compactness", 0.1, 1.0),
    FeatureSpec::continuous("surface_area", 0.0, 10_000.0),
    FeatureSpec::continuous("wall_area", 0.0, 10_000.0),
    FeatureSpec::continuous("roof_area", 0.0, 10_000.0),
    FeatureSpec::continuous("overall_height", 0.1, 100.0),
    FeatureSpec::discrete("orientation", 1.0, 5.0),
    FeatureSpec::continuous("glazing_area", 0.0, 10_000.0),
    FeatureSpec::discrete("glazing_area_distribution", 0.0, 5.0),
];

/// Ordered feature schema shared by the scaler and the model
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSchema {
    features: [FeatureSpec; FEATURE_COUNT],
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::standard()
    }
}

impl FeatureSchema {
    pub fn standard() -> Self {
        Self {
            features: STANDARD_FEATURES,
        }
    }

    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(|f| f.name).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f.name == name)
    }

    pub fn spec(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Build a validated request from raw input
    pub fn parse(&self, input: &FeatureInput) -> ThermalResult<PredictionRequest> {
        match input {
            FeatureInput::Ordered(values) => self.parse_values(values),
            FeatureInput::Named(map) => {
                if let Some(unknown) = map.keys().find(|k| self.index_of(k).is_none()) {
                    return Err(ThermalError::validation(format!(
                        "unknown feature '{}'",
                        unknown
                    )));
                }
                let mut values = [0.0; FEATURE_COUNT];
                for (slot, spec) in values.iter_mut().zip(self.features.iter()) {
                    *slot = *map.get(spec.name).ok_or_else(|| {
                        ThermalError::validation(format!("missing feature '{}'", spec.name))
                    })?;
                }
                self.build(values)
            }
        }
    }

    /// Build a validated request from values in schema order
    pub fn parse_values(&self, values: &[f64]) -> ThermalResult<PredictionRequest> {
        let array: [f64; FEATURE_COUNT] = values.try_into().map_err(|_| {
            ThermalError::validation(format!(
                "expected {} features, got {}",
                FEATURE_COUNT,
                values.len()
            ))
        })?;
        self.build(array)
    }

    fn build(&self, values: [f64; FEATURE_COUNT]) -> ThermalResult<PredictionRequest> {
        for (value, spec) in values.iter().zip(self.features.iter()) {
            spec.check(*value)?;
        }
        Ok(PredictionRequest::from_vector(values))
    }

    /// Re-validate a request that was assembled programmatically
    pub fn validate(&self, request: &PredictionRequest) -> ThermalResult<()> {
        for (value, spec) in request.to_vector().iter().zip(self.features.iter()) {
            spec.check(*value)?;
        }
        Ok(())
    }

    /// Copy of `base` with the named feature replaced, validated
    pub fn with_feature(
        &self,
        base: &PredictionRequest,
        name: &str,
        value: f64,
    ) -> ThermalResult<PredictionRequest> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| ThermalError::validation(format!("unknown feature '{}'", name)))?;
        let mut values = base.to_vector();
        values[idx] = value;
        self.build(values)
    }
}
