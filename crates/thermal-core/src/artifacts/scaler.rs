//! Fitted standard scaler

use crate::error::{ThermalError, ThermalResult};
use crate::models::FEATURE_COUNT;
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};

/// Per-feature affine normalization `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Feature names in the order the scaler was fit with
    pub feature_names: Vec<String>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn from_json(bytes: &[u8]) -> ThermalResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| ThermalError::configuration(format!("invalid scaler artifact: {}", e)))
    }

    /// Identity transform for the given schema
    pub fn identity(schema: &FeatureSchema) -> Self {
        Self {
            feature_names: schema.names().into_iter().map(String::from).collect(),
            mean: vec![0.0; schema.len()],
            scale: vec![1.0; schema.len()],
        }
    }

    /// Check the artifact against the compiled feature schema.
    /// Order, count and names must match exactly.
    pub fn validate(&self, schema: &FeatureSchema) -> ThermalResult<()> {
        let expected = schema.names();
        if self.feature_names.len() != expected.len()
            || self.mean.len() != expected.len()
            || self.scale.len() != expected.len()
        {
            return Err(ThermalError::configuration(format!(
                "scaler was fit with {} names / {} means / {} scales, schema has {} features",
                self.feature_names.len(),
                self.mean.len(),
                self.scale.len(),
                expected.len()
            )));
        }

        for (idx, (actual, wanted)) in self.feature_names.iter().zip(expected.iter()).enumerate() {
            if actual != wanted {
                return Err(ThermalError::configuration(format!(
                    "scaler feature #{} is '{}', schema expects '{}'",
                    idx, actual, wanted
                )));
            }
        }

        for (name, (mean, scale)) in self
            .feature_names
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
        {
            if !mean.is_finite() || !scale.is_finite() || *scale == 0.0 {
                return Err(ThermalError::configuration(format!(
                    "scaler parameters for '{}' are unusable (mean={}, scale={})",
                    name, mean, scale
                )));
            }
        }

        Ok(())
    }

    /// Apply the transform elementwise. Assumes [`StandardScaler::validate`] passed.
    pub fn transform(&self, values: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut scaled = [0.0; FEATURE_COUNT];
        for (i, out) in scaled.iter_mut().enumerate() {
            *out = (values[i] - self.mean[i]) / self.scale[i];
        }
        scaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitted() -> StandardScaler {
        let schema = FeatureSchema::standard();
        StandardScaler {
            feature_names: schema.names().into_iter().map(String::from).collect(),
            mean: vec![0.76, 671.7, 318.5, 176.6, 5.25, 3.5, 0.23, 2.8],
            scale: vec![0.1, 88.0, 43.6, 45.1, 1.75, 1.1, 0.13, 1.55],
        }
    }

    #[test]
    fn test_transform_is_affine() {
        let scaler = fitted();
        scaler.validate(&FeatureSchema::standard()).unwrap();

        let values = [0.86, 759.7, 318.5, 176.6, 7.0, 3.5, 0.23, 2.8];
        let scaled = scaler.transform(&values);
        assert!((scaled[0] - 1.0).abs() < 1e-9);
        assert!((scaled[1] - 1.0).abs() < 1e-9);
        assert!(scaled[2].abs() < 1e-9);
        assert!((scaled[4] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_identity() {
        let schema = FeatureSchema::standard();
        let scaler = StandardScaler::identity(&schema);
        scaler.validate(&schema).unwrap();
        let values = [0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.0];
        assert_eq!(scaler.transform(&values), values);
    }

    #[test]
    fn test_wrong_feature_count_is_configuration_error() {
        let mut scaler = fitted();
        scaler.feature_names.pop();
        scaler.mean.pop();
        scaler.scale.pop();
        let err = scaler.validate(&FeatureSchema::standard()).unwrap_err();
        assert!(matches!(err, ThermalError::Configuration(_)));
    }

    #[test]
    fn test_wrong_feature_order_is_configuration_error() {
        let mut scaler = fitted();
        scaler.feature_names.swap(2, 3);
        let err = scaler.validate(&FeatureSchema::standard()).unwrap_err();
        assert!(err.to_string().contains("scaler feature #2 is 'roof_area'"));
    }

    #[test]
    fn test_zero_scale_rejected() {
        let mut scaler = fitted();
        scaler.scale[5] = 0.0;
        assert!(scaler.validate(&FeatureSchema::standard()).is_err());
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::to_vec(&fitted()).unwrap();
        assert_eq!(StandardScaler::from_json(&json).unwrap(), fitted());
        assert!(StandardScaler::from_json(b"not json").is_err());
    }
}
