//! Model artifact loading
//!
//! Loads the fitted scaler and the regression model from disk exactly once
//! into an immutable [`ModelArtifacts`] context. Every failure here is a
//! [`ThermalError::Configuration`]: the deployment is broken and startup
//! must abort.

mod linear;
mod onnx;
mod scaler;

pub use linear::LinearRegressor;
pub use onnx::OnnxRegressor;
pub use scaler::StandardScaler;

use crate::error::{ThermalError, ThermalResult};
use crate::models::FEATURE_COUNT;
use crate::schema::FeatureSchema;
use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Number of outputs the model must produce (heating, cooling)
pub const NUM_OUTPUTS: usize = 2;

/// Trait for regression model implementations
pub trait Regressor: Send + Sync {
    /// Run the model on an already-scaled feature vector
    fn predict(&self, features: &[f64; FEATURE_COUNT]) -> Result<Vec<f64>>;

    /// Short name of the model format
    fn kind(&self) -> &'static str;
}

/// Where to find the artifacts and how to verify them
#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub model_path: PathBuf,
    pub scaler_path: PathBuf,
    /// Expected SHA-256 of the model file, hex encoded
    pub model_sha256: Option<String>,
    /// Expected SHA-256 of the scaler file, hex encoded
    pub scaler_sha256: Option<String>,
}

impl ArtifactConfig {
    pub fn new(model_path: impl Into<PathBuf>, scaler_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            scaler_path: scaler_path.into(),
            model_sha256: None,
            scaler_sha256: None,
        }
    }
}

/// Immutable scaler + model pair, shared read-only by every prediction
pub struct ModelArtifacts {
    schema: FeatureSchema,
    scaler: StandardScaler,
    regressor: Box<dyn Regressor>,
    version: String,
}

impl std::fmt::Debug for ModelArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifacts")
            .field("version", &self.version)
            .field("kind", &self.regressor.kind())
            .finish()
    }
}

impl ModelArtifacts {
    /// Load and verify both artifacts from disk
    pub fn load(config: &ArtifactConfig, schema: FeatureSchema) -> ThermalResult<Self> {
        let scaler_bytes = read_artifact(&config.scaler_path, config.scaler_sha256.as_deref())?;
        let model_bytes = read_artifact(&config.model_path, config.model_sha256.as_deref())?;

        let scaler = StandardScaler::from_json(&scaler_bytes)?;
        let regressor = load_regressor(&config.model_path, &model_bytes)?;

        let stem = config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model");
        let checksum = compute_checksum(&model_bytes);
        let version = format!("{}-{}", stem, &checksum[..12]);

        let artifacts = Self::from_parts(schema, scaler, regressor, version)?;
        info!(
            version = %artifacts.version,
            kind = artifacts.regressor.kind(),
            model = %config.model_path.display(),
            scaler = %config.scaler_path.display(),
            "Model artifacts loaded"
        );
        Ok(artifacts)
    }

    /// Assemble artifacts that are already in memory.
    ///
    /// Verifies the scaler against the schema and probes the model once
    /// with a zero vector to check its output width.
    pub fn from_parts(
        schema: FeatureSchema,
        scaler: StandardScaler,
        regressor: Box<dyn Regressor>,
        version: impl Into<String>,
    ) -> ThermalResult<Self> {
        scaler.validate(&schema)?;

        let probe = regressor
            .predict(&[0.0; FEATURE_COUNT])
            .map_err(|e| ThermalError::configuration(format!("model probe failed: {:#}", e)))?;
        if probe.len() < NUM_OUTPUTS {
            return Err(ThermalError::configuration(format!(
                "model produces {} outputs, expected {}",
                probe.len(),
                NUM_OUTPUTS
            )));
        }
        debug!(outputs = probe.len(), "Model probe succeeded");

        Ok(Self {
            schema,
            scaler,
            regressor,
            version: version.into(),
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn kind(&self) -> &'static str {
        self.regressor.kind()
    }

    /// Scale raw features and run the model
    pub fn infer(&self, raw: &[f64; FEATURE_COUNT]) -> Result<Vec<f64>> {
        let scaled = self.scaler.transform(raw);
        self.regressor.predict(&scaled)
    }
}

fn read_artifact(path: &Path, expected_sha256: Option<&str>) -> ThermalResult<Vec<u8>> {
    if !path.exists() {
        return Err(ThermalError::configuration(format!(
            "artifact not found: {}",
            path.display()
        )));
    }
    let bytes = std::fs::read(path).map_err(|e| {
        ThermalError::configuration(format!("failed to read {}: {}", path.display(), e))
    })?;

    if let Some(expected) = expected_sha256 {
        let computed = compute_checksum(&bytes);
        if !computed.eq_ignore_ascii_case(expected.trim()) {
            return Err(ThermalError::configuration(format!(
                "checksum mismatch for {}: expected {}, got {}",
                path.display(),
                expected,
                computed
            )));
        }
        debug!(path = %path.display(), checksum = %computed, "Artifact checksum validated");
    }

    Ok(bytes)
}

fn load_regressor(path: &Path, bytes: &[u8]) -> ThermalResult<Box<dyn Regressor>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("onnx") => {
            let model = OnnxRegressor::from_bytes(bytes).map_err(|e| {
                ThermalError::configuration(format!("failed to load {}: {:#}", path.display(), e))
            })?;
            Ok(Box::new(model))
        }
        Some("json") => Ok(Box::new(LinearRegressor::from_json(bytes)?)),
        _ => Err(ThermalError::configuration(format!(
            "unsupported model format: {} (expected .onnx or .json)",
            path.display()
        ))),
    }
}

/// Hex encoded SHA-256 of `data`
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir) -> ArtifactConfig {
        let model_path = dir.path().join("best_model.json");
        let scaler_path = dir.path().join("standard_scaler.json");
        std::fs::write(&model_path, serde_json::to_vec(&testing::linear_model()).unwrap()).unwrap();
        std::fs::write(&scaler_path, serde_json::to_vec(&testing::scaler()).unwrap()).unwrap();
        ArtifactConfig::new(model_path, scaler_path)
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"model weights");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"model weights"));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let config = write_fixture(&dir);

        let artifacts = ModelArtifacts::load(&config, FeatureSchema::standard()).unwrap();
        assert_eq!(artifacts.kind(), "linear");
        assert!(artifacts.version().starts_with("best_model-"));
        assert_eq!(artifacts.version().len(), "best_model-".len() + 12);
    }

    #[test]
    fn test_missing_model_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let mut config = write_fixture(&dir);
        config.model_path = dir.path().join("absent.json");

        let err = ModelArtifacts::load(&config, FeatureSchema::standard()).unwrap_err();
        assert!(matches!(err, ThermalError::Configuration(_)));
        assert!(err.to_string().contains("artifact not found"));
    }

    #[test]
    fn test_missing_scaler_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let mut config = write_fixture(&dir);
        config.scaler_path = dir.path().join("absent_scaler.json");

        let err = ModelArtifacts::load(&config, FeatureSchema::standard()).unwrap_err();
        assert!(matches!(err, ThermalError::Configuration(_)));
    }

    #[test]
    fn test_corrupt_scaler_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let config = write_fixture(&dir);
        std::fs::write(&config.scaler_path, b"{ truncated").unwrap();

        let err = ModelArtifacts::load(&config, FeatureSchema::standard()).unwrap_err();
        assert!(err.to_string().contains("invalid scaler artifact"));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let mut config = write_fixture(&dir);
        let pkl = dir.path().join("best_model.pkl");
        std::fs::write(&pkl, b"\x80\x04").unwrap();
        config.model_path = pkl;

        let err = ModelArtifacts::load(&config, FeatureSchema::standard()).unwrap_err();
        assert!(err.to_string().contains("unsupported model format"));
    }

    #[test]
    fn test_checksum_verification() {
        let dir = TempDir::new().unwrap();
        let mut config = write_fixture(&dir);
        let bytes = std::fs::read(&config.model_path).unwrap();

        config.model_sha256 = Some(compute_checksum(&bytes).to_uppercase());
        assert!(ModelArtifacts::load(&config, FeatureSchema::standard()).is_ok());

        config.model_sha256 = Some("0".repeat(64));
        let err = ModelArtifacts::load(&config, FeatureSchema::standard()).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_single_output_model_rejected() {
        let model = LinearRegressor {
            coefficients: vec![vec![1.0; FEATURE_COUNT]],
            intercepts: vec![0.0],
        };
        let err = ModelArtifacts::from_parts(
            FeatureSchema::standard(),
            testing::scaler(),
            Box::new(model),
            "v1",
        )
        .unwrap_err();
        assert!(err.to_string().contains("produces 1 outputs, expected 2"));
    }

    #[test]
    fn test_scaler_schema_mismatch_rejected() {
        let mut scaler = testing::scaler();
        scaler.feature_names.reverse();
        let err = ModelArtifacts::from_parts(
            FeatureSchema::standard(),
            scaler,
            Box::new(testing::linear_model()),
            "v1",
        )
        .unwrap_err();
        assert!(matches!(err, ThermalError::Configuration(_)));
    }
}
