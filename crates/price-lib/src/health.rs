//! Service readiness
//!
//! The readiness state is decided once, from the result of loading the model
//! bundle at startup, and never changes afterwards. Request handlers only
//! read it.

use crate::bundle::{LoadError, ModelBundle};
use serde::{Deserialize, Serialize};

/// Overall service status reported on `GET /`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Model loaded, predictions available
    Ok,
    /// Model failed to load, diagnostics only
    Degraded,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Ok => "ok",
            ServiceStatus::Degraded => "degraded",
        }
    }
}

/// Outcome of the startup load
#[derive(Debug)]
pub enum ModelState {
    Ready(ModelBundle),
    Degraded(LoadError),
}

impl From<Result<ModelBundle, LoadError>> for ModelState {
    fn from(result: Result<ModelBundle, LoadError>) -> Self {
        match result {
            Ok(bundle) => ModelState::Ready(bundle),
            Err(err) => ModelState::Degraded(err),
        }
    }
}

impl ModelState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }

    pub fn status(&self) -> ServiceStatus {
        if self.is_ready() {
            ServiceStatus::Ok
        } else {
            ServiceStatus::Degraded
        }
    }

    pub fn bundle(&self) -> Option<&ModelBundle> {
        match self {
            ModelState::Ready(bundle) => Some(bundle),
            ModelState::Degraded(_) => None,
        }
    }

    pub fn last_error(&self) -> Option<&LoadError> {
        match self {
            ModelState::Ready(_) => None,
            ModelState::Degraded(err) => Some(err),
        }
    }

    /// `model_not_loaded: <ErrorType>: <message>`, or `None` when ready
    pub fn unavailable_reason(&self) -> Option<String> {
        self.last_error()
            .map(|err| format!("model_not_loaded: {}: {}", err.kind(), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::LinearRegressor;
    use crate::schema::SCHEMA_FIELDS;
    use std::path::PathBuf;

    fn ready_state() -> ModelState {
        let linear = LinearRegressor::new(0.0, vec![1.0; 6], 6).unwrap();
        let order = SCHEMA_FIELDS.iter().map(|s| s.to_string()).collect();
        ModelState::from(Ok::<_, LoadError>(ModelBundle::new(Box::new(linear), order)))
    }

    #[test]
    fn test_ready_state() {
        let state = ready_state();
        assert!(state.is_ready());
        assert_eq!(state.status(), ServiceStatus::Ok);
        assert!(state.bundle().is_some());
        assert!(state.last_error().is_none());
        assert!(state.unavailable_reason().is_none());
    }

    #[test]
    fn test_degraded_state_reports_error() {
        let state = ModelState::from(Err::<ModelBundle, _>(LoadError::ArtifactNotFound {
            path: PathBuf::from("randomforest_pipeline.json"),
        }));
        assert!(!state.is_ready());
        assert_eq!(state.status(), ServiceStatus::Degraded);
        assert!(state.bundle().is_none());

        let reason = state.unavailable_reason().unwrap();
        assert!(reason.starts_with("model_not_loaded: ArtifactNotFound: "));
        assert!(reason.contains("randomforest_pipeline.json"));
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&ServiceStatus::Degraded).unwrap(), "\"degraded\"");
        assert_eq!(ServiceStatus::Ok.as_str(), "ok");
    }
}
