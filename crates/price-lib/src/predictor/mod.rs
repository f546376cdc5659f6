//! Regression backends behind a single `Predictor` capability

mod forest;
mod inference;
mod linear;
mod pipeline;

pub use forest::{Node, RandomForest, Tree};
pub use inference::OnnxPredictor;
pub use linear::LinearRegressor;
pub use pipeline::{Pipeline, StandardScaler};

use crate::models::CanonicalRow;
use thiserror::Error;

/// Errors raised while running a prediction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    #[error("expected {expected} input columns, got {got}")]
    InputWidth { expected: usize, got: usize },

    #[error("model produced {0} outputs, expected exactly one")]
    OutputShape(usize),

    #[error("model produced a non-finite value")]
    NonFinite,

    #[error("{0}")]
    Backend(String),
}

impl PredictError {
    /// Stable error type name used in responses and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::InputWidth { .. } => "InputWidth",
            PredictError::OutputShape(_) => "OutputShape",
            PredictError::NonFinite => "NonFinite",
            PredictError::Backend(_) => "BackendError",
        }
    }
}

/// Rejected model definition (bad shapes, dangling tree nodes, unreadable graph)
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct InvalidModel(pub String);

/// Trait for prediction implementations
pub trait Predictor: Send + Sync {
    /// Predict a single scalar from one canonical row
    fn predict(&self, row: &CanonicalRow) -> Result<f64, PredictError>;

    /// Short backend name for logs and status output
    fn kind(&self) -> &'static str;
}

fn check_width(row: &CanonicalRow, expected: usize) -> Result<(), PredictError> {
    if row.len() != expected {
        return Err(PredictError::InputWidth {
            expected,
            got: row.len(),
        });
    }
    Ok(())
}

fn finite(value: f64) -> Result<f64, PredictError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PredictError::NonFinite)
    }
}
