//! Domain errors for the prediction pipeline

use thiserror::Error;

/// Errors surfaced by the prediction and insights services
#[derive(Debug, Error)]
pub enum ThermalError {
    /// Broken deployment: missing, corrupt or mismatched artifacts.
    /// Fatal at startup, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed request rejected before any model call
    #[error("validation error: {0}")]
    Validation(String),

    /// The model ran but produced unusable output
    #[error("inference error: {0}")]
    Inference(String),

    /// The record does not exist or is not visible to the requester
    #[error("not found: {0}")]
    NotFound(String),

    /// The requester lacks the role the operation needs
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl ThermalError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an inference error
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ThermalError::Configuration(_) => "configuration_error",
            ThermalError::Validation(_) => "validation_error",
            ThermalError::Inference(_) => "inference_error",
            ThermalError::NotFound(_) => "not_found",
            ThermalError::Forbidden(_) => "forbidden",
        }
    }
}

/// Result type for prediction operations
pub type ThermalResult<T> = std::result::Result<T, ThermalError>;
