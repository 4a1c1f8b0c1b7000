//! Linear multi-output regressor stored as JSON

use super::Regressor;
use crate::error::{ThermalError, ThermalResult};
use crate::models::FEATURE_COUNT;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// `y[k] = intercepts[k] + sum_i coefficients[k][i] * x[i]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    /// One row of weights per output
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LinearRegressor {
    pub fn from_json(bytes: &[u8]) -> ThermalResult<Self> {
        let model: Self = serde_json::from_slice(bytes)
            .map_err(|e| ThermalError::configuration(format!("invalid linear model: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> ThermalResult<()> {
        if self.coefficients.len() != self.intercepts.len() {
            return Err(ThermalError::configuration(format!(
                "linear model has {} coefficient rows but {} intercepts",
                self.coefficients.len(),
                self.intercepts.len()
            )));
        }
        for (k, row) in self.coefficients.iter().enumerate() {
            if row.len() != FEATURE_COUNT {
                return Err(ThermalError::configuration(format!(
                    "linear model output #{} has {} weights, expected {}",
                    k,
                    row.len(),
                    FEATURE_COUNT
                )));
            }
        }
        let all_finite = self
            .coefficients
            .iter()
            .flatten()
            .chain(self.intercepts.iter())
            .all(|w| w.is_finite());
        if !all_finite {
            return Err(ThermalError::configuration(
                "linear model contains non-finite weights",
            ));
        }
        Ok(())
    }
}

impl Regressor for LinearRegressor {
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<Vec<f64>> {
        Ok(self
            .coefficients
            .iter()
            .zip(self.intercepts.iter())
            .map(|(row, b)| b + row.iter().zip(features.iter()).map(|(w, x)| w * x).sum::<f64>())
            .collect())
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_dot_product() {
        let model = LinearRegressor {
            coefficients: vec![vec![1.0; FEATURE_COUNT], vec![0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]],
            intercepts: vec![10.0, -1.0],
        };
        model.validate().unwrap();
        let out = model.predict(&[1.0; FEATURE_COUNT]).unwrap();
        assert_eq!(out, vec![18.0, 1.0]);
    }

    #[test]
    fn test_row_width_mismatch() {
        let model = LinearRegressor {
            coefficients: vec![vec![1.0; 7], vec![1.0; FEATURE_COUNT]],
            intercepts: vec![0.0, 0.0],
        };
        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("has 7 weights"));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(LinearRegressor::from_json(b"{\"coefficients\": 3}").is_err());
    }
}
