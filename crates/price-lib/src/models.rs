//! Core data models for the prediction service

use serde::{Deserialize, Serialize};

/// Listing features accepted by `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub surface_m2: f64,
    pub num_rooms: f64,
    pub is_furnished: bool,
    pub wifi_incl: bool,
    pub charges_incl: bool,
    pub car_park: bool,
}

/// Ordered numeric row fed to a predictor
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRow(Vec<f64>);

impl CanonicalRow {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Successful prediction payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub price_chf_pred: f64,
}

/// `GET /health` payload when the model is loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// `GET /` status summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub docs: String,
    pub health: String,
    pub model_loaded: bool,
    pub model_path: String,
}

/// Error body shared by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}
