//! Prediction output post-processing
//!
//! Converts raw model outputs into a [`ThermalLoad`], rejecting unusable
//! values and clamping loads into their physical range.

use crate::artifacts::NUM_OUTPUTS;
use crate::error::{ThermalError, ThermalResult};
use crate::models::ThermalLoad;
use tracing::debug;

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Loads below this are clamped up (loads are never negative)
    pub min_load: f64,
    /// Optional upper bound, typically the model's trained output range
    pub max_load: Option<f64>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            min_load: 0.0,
            max_load: None,
        }
    }
}

/// Formats raw model outputs into a ThermalLoad
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Format raw model outputs `[heating, cooling, ...]`
    pub fn format(&self, raw_outputs: &[f64]) -> ThermalResult<ThermalLoad> {
        if raw_outputs.len() < NUM_OUTPUTS {
            return Err(ThermalError::inference(format!(
                "model output has {} values, expected {}",
                raw_outputs.len(),
                NUM_OUTPUTS
            )));
        }
        if let Some(bad) = raw_outputs[..NUM_OUTPUTS].iter().find(|v| !v.is_finite()) {
            return Err(ThermalError::inference(format!(
                "model produced a non-finite load ({})",
                bad
            )));
        }

        Ok(ThermalLoad {
            heating_load: self.clamp(raw_outputs[0]),
            cooling_load: self.clamp(raw_outputs[1]),
        })
    }

    fn clamp(&self, value: f64) -> f64 {
        let mut clamped = value.max(self.config.min_load);
        if let Some(max) = self.config.max_load {
            clamped = clamped.min(max);
        }
        if clamped != value {
            debug!(raw = value, clamped = clamped, "Load clamped into valid range");
        }
        clamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_takes_first_two_outputs() {
        let formatter = OutputFormatter::new();
        let load = formatter.format(&[15.5, 21.3, 99.0]).unwrap();
        assert_eq!(load.heating_load, 15.5);
        assert_eq!(load.cooling_load, 21.3);
    }

    #[test]
    fn test_negative_loads_clamped_to_zero() {
        let formatter = OutputFormatter::new();
        let load = formatter.format(&[-3.0, 12.0]).unwrap();
        assert_eq!(load.heating_load, 0.0);
        assert_eq!(load.cooling_load, 12.0);
    }

    #[test]
    fn test_upper_bound_applied() {
        let formatter = OutputFormatter::with_config(OutputConfig {
            min_load: 0.0,
            max_load: Some(50.0),
        });
        let load = formatter.format(&[80.0, 40.0]).unwrap();
        assert_eq!(load.heating_load, 50.0);
        assert_eq!(load.cooling_load, 40.0);
    }

    #[test]
    fn test_short_output_rejected() {
        let formatter = OutputFormatter::new();
        let err = formatter.format(&[1.0]).unwrap_err();
        assert!(matches!(err, ThermalError::Inference(_)));
    }

    #[test]
    fn test_non_finite_rejected() {
        let formatter = OutputFormatter::new();
        assert!(formatter.format(&[f64::NAN, 1.0]).is_err());
        assert!(formatter.format(&[1.0, f64::INFINITY]).is_err());
    }
}
