//! Model bundle loading
//!
//! A bundle is a JSON artifact with two top-level keys:
//!
//! ```json
//! {
//!   "pipeline": {
//!     "scaler": { "mean": [...], "scale": [...] },
//!     "regressor": { "kind": "random_forest", "trees": [{ "nodes": [...] }] }
//!   },
//!   "feature_order": ["surface_m2", "num_rooms", "is_furnished",
//!                     "wifi_incl", "charges_incl", "car_park"]
//! }
//! ```
//!
//! `scaler` is optional. Regressor kinds are `random_forest`, `linear`
//! (`intercept`, `coefficients`) and `onnx` (`path`, resolved relative to the
//! bundle file).
//!
//! Loading happens once at startup. Every failure is reported as a
//! [`LoadError`] so the service can start degraded instead of exiting.

use crate::models::CanonicalRow;
use crate::predictor::{
    InvalidModel, LinearRegressor, OnnxPredictor, Pipeline, PredictError, Predictor, RandomForest,
    StandardScaler, Tree,
};
use crate::schema::{self, SchemaError, NUM_FEATURES};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Default artifact file name, resolved against the working directory
pub const DEFAULT_MODEL_PATH: &str = "randomforest_pipeline.json";

const PIPELINE_KEY: &str = "pipeline";
const FEATURE_ORDER_KEY: &str = "feature_order";

/// Errors raised while loading a model bundle
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("artifact not found at {path:?}")]
    ArtifactNotFound { path: PathBuf },

    #[error("failed to read artifact {path:?}: {source}")]
    ArtifactUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("artifact is not a valid bundle: {0}")]
    MalformedArtifact(String),

    #[error("bundle is missing key '{0}'")]
    MissingKey(&'static str),

    #[error("invalid pipeline: {0}")]
    InvalidPipeline(#[from] InvalidModel),

    #[error("artifact checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("feature_order does not match the request schema: {0}")]
    FeatureMismatch(#[from] SchemaError),
}

impl LoadError {
    /// Stable error type name surfaced in `model_not_loaded` messages
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::ArtifactNotFound { .. } => "ArtifactNotFound",
            LoadError::ArtifactUnreadable { .. } => "ArtifactUnreadable",
            LoadError::MalformedArtifact(_) => "MalformedArtifact",
            LoadError::MissingKey(_) => "MissingKey",
            LoadError::InvalidPipeline(_) => "InvalidPipeline",
            LoadError::ChecksumMismatch { .. } => "ChecksumMismatch",
            LoadError::FeatureMismatch(_) => "FeatureMismatch",
        }
    }
}

/// Loader switches
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Require `feature_order` to be a permutation of the request schema
    pub strict_features: bool,
    /// Expected SHA-256 of the artifact file, hex encoded
    pub expected_sha256: Option<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict_features: true,
            expected_sha256: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PipelineSpec {
    #[serde(default)]
    scaler: Option<ScalerSpec>,
    regressor: RegressorSpec,
}

#[derive(Debug, Deserialize)]
struct ScalerSpec {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RegressorSpec {
    RandomForest { trees: Vec<Tree> },
    Linear { intercept: f64, coefficients: Vec<f64> },
    Onnx { path: PathBuf },
}

impl PipelineSpec {
    fn build(self, base_dir: &Path) -> Result<Pipeline, InvalidModel> {
        let scaler = self
            .scaler
            .map(|s| StandardScaler::new(s.mean, s.scale, NUM_FEATURES))
            .transpose()?;

        let regressor: Box<dyn Predictor> = match self.regressor {
            RegressorSpec::RandomForest { trees } => {
                Box::new(RandomForest::new(trees, NUM_FEATURES)?)
            }
            RegressorSpec::Linear {
                intercept,
                coefficients,
            } => Box::new(LinearRegressor::new(intercept, coefficients, NUM_FEATURES)?),
            RegressorSpec::Onnx { path } => {
                let path = if path.is_relative() {
                    base_dir.join(path)
                } else {
                    path
                };
                Box::new(OnnxPredictor::from_file(&path, NUM_FEATURES)?)
            }
        };

        Ok(Pipeline::new(scaler, regressor))
    }
}

/// A loaded predictor and the column order it expects
pub struct ModelBundle {
    predictor: Box<dyn Predictor>,
    feature_order: Vec<String>,
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("kind", &self.predictor.kind())
            .field("feature_order", &self.feature_order)
            .finish()
    }
}

impl ModelBundle {
    pub fn new(predictor: Box<dyn Predictor>, feature_order: Vec<String>) -> Self {
        Self {
            predictor,
            feature_order,
        }
    }

    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    pub fn kind(&self) -> &'static str {
        self.predictor.kind()
    }

    pub fn predict(&self, row: &CanonicalRow) -> Result<f64, PredictError> {
        self.predictor.predict(row)
    }
}

/// Load and validate a bundle from `path`
pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<ModelBundle, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoadError::ArtifactNotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::ArtifactUnreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;

    if let Some(expected) = &options.expected_sha256 {
        let actual = compute_checksum(&bytes);
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(LoadError::ChecksumMismatch {
                expected: expected.clone(),
                actual,
            });
        }
        debug!(checksum = %actual, "Artifact checksum validated");
    }

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let bundle = parse(&bytes, base_dir, options)?;

    info!(
        path = %path.display(),
        kind = bundle.kind(),
        features = ?bundle.feature_order(),
        "Model bundle loaded"
    );
    Ok(bundle)
}

/// Parse bundle bytes. Relative ONNX paths resolve against `base_dir`.
pub fn parse(bytes: &[u8], base_dir: &Path, options: &LoadOptions) -> Result<ModelBundle, LoadError> {
    let mut document: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(bytes).map_err(|e| LoadError::MalformedArtifact(e.to_string()))?;

    let pipeline = document
        .remove(PIPELINE_KEY)
        .ok_or(LoadError::MissingKey(PIPELINE_KEY))?;
    let feature_order = document
        .remove(FEATURE_ORDER_KEY)
        .ok_or(LoadError::MissingKey(FEATURE_ORDER_KEY))?;

    let feature_order: Vec<String> = serde_json::from_value(feature_order)
        .map_err(|e| LoadError::MalformedArtifact(format!("{}: {}", FEATURE_ORDER_KEY, e)))?;
    if feature_order.len() != NUM_FEATURES {
        return Err(LoadError::MalformedArtifact(format!(
            "{} has {} entries, expected {}",
            FEATURE_ORDER_KEY,
            feature_order.len(),
            NUM_FEATURES
        )));
    }
    if options.strict_features {
        schema::validate_feature_order(&feature_order)?;
    } else {
        schema::validate_unique_features(&feature_order)?;
    }

    let spec: PipelineSpec = serde_json::from_value(pipeline)
        .map_err(|e| LoadError::MalformedArtifact(format!("{}: {}", PIPELINE_KEY, e)))?;
    let pipeline = spec.build(base_dir)?;

    Ok(ModelBundle::new(Box::new(pipeline), feature_order))
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
