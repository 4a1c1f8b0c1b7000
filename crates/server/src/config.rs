//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thermal_core::{audit::DEFAULT_AUDIT_CAPACITY, predictor::OutputConfig, ArtifactConfig};

/// Environment variable naming an optional configuration file
pub const CONFIG_FILE_ENV: &str = "THERMAL_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name reported in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Port for the API, health and metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Regression model, `.onnx` or `.json`
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Fitted scaler, JSON
    #[serde(default = "default_scaler_path")]
    pub scaler_path: PathBuf,

    #[serde(default)]
    pub model_sha256: Option<String>,

    #[serde(default)]
    pub scaler_sha256: Option<String>,

    /// Audit entries kept in memory
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,

    /// Upper bound for predicted loads, usually the largest load in the
    /// training data. Unbounded when unset.
    #[serde(default)]
    pub max_load: Option<f64>,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "thermal-server".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/best_model.onnx")
}

fn default_scaler_path() -> PathBuf {
    PathBuf::from("models/scaler.json")
}

fn default_audit_capacity() -> usize {
    DEFAULT_AUDIT_CAPACITY
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            api_port: default_api_port(),
            model_path: default_model_path(),
            scaler_path: default_scaler_path(),
            model_sha256: None,
            scaler_sha256: None,
            audit_capacity: default_audit_capacity(),
            max_load: None,
        }
    }
}

impl ServerConfig {
    /// Load from the file named by `THERMAL_CONFIG` (if set), then
    /// `THERMAL_*` environment variables
    pub fn load() -> Result<Self> {
        let file = std::env::var_os(CONFIG_FILE_ENV).map(PathBuf::from);
        Self::from_sources(file.as_deref())
    }

    pub fn from_sources(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(config::Environment::with_prefix("THERMAL"))
            .build()
            .context("failed to read configuration")?;

        config
            .try_deserialize()
            .context("invalid server configuration")
    }

    pub fn artifact_config(&self) -> ArtifactConfig {
        ArtifactConfig {
            model_path: self.model_path.clone(),
            scaler_path: self.scaler_path.clone(),
            model_sha256: self.model_sha256.clone(),
            scaler_sha256: self.scaler_sha256.clone(),
        }
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            max_load: self.max_load,
            ..OutputConfig::default()
        }
    }
}
