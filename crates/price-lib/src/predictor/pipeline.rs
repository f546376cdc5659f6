//! Preprocessing + regressor chain

use super::{InvalidModel, PredictError, Predictor};
use crate::models::CanonicalRow;

/// Per-column standardization `(x - mean) / scale`
#[derive(Debug, Clone)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Zero scales are replaced by 1 so constant columns pass through centered.
    pub fn new(mean: Vec<f64>, scale: Vec<f64>, width: usize) -> Result<Self, InvalidModel> {
        if mean.len() != width || scale.len() != width {
            return Err(InvalidModel(format!(
                "scaler has {} means and {} scales, expected {}",
                mean.len(),
                scale.len(),
                width
            )));
        }
        if mean.iter().chain(scale.iter()).any(|v| !v.is_finite()) {
            return Err(InvalidModel("scaler has non-finite parameters".to_string()));
        }
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();
        Ok(Self { mean, scale })
    }

    pub fn transform(&self, row: &CanonicalRow) -> Result<CanonicalRow, PredictError> {
        super::check_width(row, self.mean.len())?;
        let values = row
            .values()
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect();
        Ok(CanonicalRow::new(values))
    }
}

/// Optional scaler followed by a regressor
pub struct Pipeline {
    scaler: Option<StandardScaler>,
    regressor: Box<dyn Predictor>,
}

impl Pipeline {
    pub fn new(scaler: Option<StandardScaler>, regressor: Box<dyn Predictor>) -> Self {
        Self { scaler, regressor }
    }
}

impl Predictor for Pipeline {
    fn predict(&self, row: &CanonicalRow) -> Result<f64, PredictError> {
        match &self.scaler {
            Some(scaler) => self.regressor.predict(&scaler.transform(row)?),
            None => self.regressor.predict(row),
        }
    }

    fn kind(&self) -> &'static str {
        self.regressor.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::LinearRegressor;

    #[test]
    fn test_scaler_transform() {
        let scaler = StandardScaler::new(vec![10.0, 0.0], vec![2.0, 0.0], 2).unwrap();
        let out = scaler.transform(&CanonicalRow::new(vec![14.0, 3.0])).unwrap();
        assert_eq!(out.values(), &[2.0, 3.0]);
    }

    #[test]
    fn test_scaler_shape_mismatch() {
        assert!(StandardScaler::new(vec![0.0; 6], vec![1.0; 5], 6).is_err());
    }

    #[test]
    fn test_pipeline_applies_scaler_first() {
        let scaler = StandardScaler::new(vec![40.0, 0.0], vec![5.0, 1.0], 2).unwrap();
        let linear = LinearRegressor::new(1000.0, vec![100.0, 0.0], 2).unwrap();
        let pipeline = Pipeline::new(Some(scaler), Box::new(linear));

        // (45 - 40) / 5 = 1 -> 1000 + 100
        let row = CanonicalRow::new(vec![45.0, 2.0]);
        assert_eq!(pipeline.predict(&row).unwrap(), 1100.0);
        assert_eq!(pipeline.kind(), "linear");
    }
}
