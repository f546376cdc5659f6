//! Prediction service
//!
//! Transport-independent request handling: readiness gating, range checks,
//! canonicalization and predictor invocation. The HTTP layer maps
//! [`ServiceError`] variants onto status codes.

use crate::bundle::{self, LoadOptions, ModelBundle};
use crate::health::ModelState;
use crate::models::{FeatureRecord, HealthResponse, PredictionResponse, StatusResponse};
use crate::observability::{ServiceMetrics, StructuredLogger};
use crate::schema;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Human readable service name reported on `GET /`
pub const SERVICE_NAME: &str = "Valais Price - RandomForest API";

/// Request-scoped failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::ServiceUnavailable(_) => "ServiceUnavailable",
            ServiceError::BadRequest(_) => "BadRequest",
            ServiceError::Internal(_) => "InternalError",
        }
    }
}

/// Process-wide prediction state, built once at startup
pub struct PredictionService {
    state: ModelState,
    model_path: PathBuf,
    metrics: ServiceMetrics,
    logger: StructuredLogger,
}

impl PredictionService {
    pub fn new(state: ModelState, model_path: impl Into<PathBuf>) -> Self {
        let metrics = ServiceMetrics::new();
        metrics.set_model_loaded(state.is_ready());
        Self {
            state,
            model_path: model_path.into(),
            metrics,
            logger: StructuredLogger::new(SERVICE_NAME),
        }
    }

    /// Load the bundle at `model_path` and build the service.
    ///
    /// Never fails: a load error leaves the service degraded.
    pub fn load(model_path: impl AsRef<Path>, options: &LoadOptions) -> Self {
        let model_path = model_path.as_ref();
        let service = Self::new(bundle::load(model_path, options).into(), model_path);

        let path = model_path.display().to_string();
        match &service.state {
            ModelState::Ready(bundle) => {
                service
                    .logger
                    .log_model_loaded(&path, bundle.kind(), bundle.feature_order())
            }
            ModelState::Degraded(err) => {
                service
                    .logger
                    .log_model_load_failed(&path, err.kind(), &err.to_string())
            }
        }
        service
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// The loaded bundle, or `ServiceUnavailable` carrying the load error
    pub fn ensure_ready(&self) -> Result<&ModelBundle, ServiceError> {
        match &self.state {
            ModelState::Ready(bundle) => Ok(bundle),
            ModelState::Degraded(_) => Err(ServiceError::ServiceUnavailable(
                self.state.unavailable_reason().unwrap_or_default(),
            )),
        }
    }

    pub fn health(&self) -> Result<HealthResponse, ServiceError> {
        self.ensure_ready().map(|_| HealthResponse::ok())
    }

    pub fn status(&self) -> StatusResponse {
        StatusResponse {
            status: self.state.status().as_str().to_string(),
            service: SERVICE_NAME.to_string(),
            docs: "/docs".to_string(),
            health: "/health".to_string(),
            model_loaded: self.state.is_ready(),
            model_path: self.model_path.display().to_string(),
        }
    }

    /// Run one prediction
    pub fn predict(&self, record: &FeatureRecord) -> Result<PredictionResponse, ServiceError> {
        let start = Instant::now();
        let result = self.run_prediction(record);
        self.metrics
            .observe_prediction_latency(start.elapsed().as_secs_f64());

        match &result {
            Ok(_) => self.metrics.inc_predictions(),
            Err(err) => {
                self.metrics.inc_prediction_errors(err.kind());
                if !matches!(err, ServiceError::ServiceUnavailable(_)) {
                    self.logger
                        .log_prediction_failed(err.kind(), &err.to_string());
                }
            }
        }
        result
    }

    fn run_prediction(&self, record: &FeatureRecord) -> Result<PredictionResponse, ServiceError> {
        let bundle = self.ensure_ready()?;

        record
            .validate()
            .map_err(|e| ServiceError::BadRequest(format!("invalid_request: {}", e)))?;

        let row = schema::canonicalize(record, bundle.feature_order())
            .map_err(|e| ServiceError::BadRequest(format!("feature_mismatch: {}", e)))?;

        let price = bundle.predict(&row).map_err(|e| {
            ServiceError::Internal(format!("inference_error: {}: {}", e.kind(), e))
        })?;

        Ok(PredictionResponse {
            price_chf_pred: price,
        })
    }

    /// Count a request rejected before it reached [`predict`](Self::predict)
    pub fn record_rejection(&self, err: &ServiceError) {
        self.metrics.inc_prediction_errors(err.kind());
        self.logger.log_prediction_failed(err.kind(), &err.to_string());
    }
}
