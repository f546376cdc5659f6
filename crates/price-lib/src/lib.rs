//! Core library for the rental price prediction service
//!
//! This crate provides:
//! - Model bundle loading and validation
//! - Regression backends (random forest, linear, ONNX via tract)
//! - Request canonicalization into the model's column order
//! - Readiness state, observability and the transport-independent service

pub mod bundle;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod schema;
pub mod service;

pub use bundle::{LoadError, LoadOptions, ModelBundle, DEFAULT_MODEL_PATH};
pub use health::{ModelState, ServiceStatus};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use service::{PredictionService, ServiceError, SERVICE_NAME};
