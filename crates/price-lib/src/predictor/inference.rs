//! ONNX inference using tract
//!
//! Runs exported regression graphs that take a `[1, width]` f32 row and
//! return a single value.

use super::{check_width, finite, InvalidModel, PredictError, Predictor};
use crate::models::CanonicalRow;
use crate::observability::ServiceMetrics;
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based predictor
pub struct OnnxPredictor {
    model: TractModel,
    width: usize,
    metrics: ServiceMetrics,
}

impl OnnxPredictor {
    /// Load a predictor from an `.onnx` file
    pub fn from_file(path: &Path, width: usize) -> Result<Self, InvalidModel> {
        let bytes = std::fs::read(path)
            .map_err(|e| InvalidModel(format!("failed to read ONNX model {:?}: {}", path, e)))?;
        Self::new(&bytes, width)
    }

    /// Create a new predictor from model bytes
    pub fn new(model_bytes: &[u8], width: usize) -> Result<Self, InvalidModel> {
        let model = Self::load_model(model_bytes, width)?;
        Ok(Self {
            model,
            width,
            metrics: ServiceMetrics::new(),
        })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8], width: usize) -> Result<TractModel, InvalidModel> {
        let fail = |stage: &str, e: TractError| InvalidModel(format!("{}: {}", stage, e));

        tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .map_err(|e| fail("failed to parse ONNX model", e))?
            .with_input_fact(0, f32::fact([1, width]).into())
            .map_err(|e| fail("failed to set input shape", e))?
            .into_optimized()
            .map_err(|e| fail("failed to optimize model", e))?
            .into_runnable()
            .map_err(|e| fail("failed to create runnable model", e))
    }

    fn row_to_tensor(&self, row: &CanonicalRow) -> Result<Tensor, PredictError> {
        let data: Vec<f32> = row.values().iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, self.width), data)
            .map_err(|e| PredictError::Backend(e.to_string()))?;
        Ok(array.into())
    }
}

impl Predictor for OnnxPredictor {
    fn predict(&self, row: &CanonicalRow) -> Result<f64, PredictError> {
        check_width(row, self.width)?;
        let start = Instant::now();

        let input = self.row_to_tensor(row)?;
        let result = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| PredictError::Backend(e.to_string()))?;
        let output = result
            .first()
            .ok_or(PredictError::OutputShape(0))?;

        let view = output
            .to_array_view::<f32>()
            .map_err(|e| PredictError::Backend(e.to_string()))?;
        let values: Vec<f32> = view.iter().copied().collect();
        if values.len() != 1 {
            return Err(PredictError::OutputShape(values.len()));
        }

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.metrics.inc_slow_inferences();
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        finite(values[0] as f64)
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}
