use super::{check_width, finite, InvalidModel, PredictError, Predictor};
use crate::models::CanonicalRow;

/// Ordinary linear regression: `intercept + Σ coefficient[i] * row[i]`
#[derive(Debug, Clone)]
pub struct LinearRegressor {
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearRegressor {
    pub fn new(intercept: f64, coefficients: Vec<f64>, width: usize) -> Result<Self, InvalidModel> {
        if coefficients.len() != width {
            return Err(InvalidModel(format!(
                "linear model has {} coefficients, expected {}",
                coefficients.len(),
                width
            )));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(InvalidModel("linear model has non-finite weights".to_string()));
        }
        Ok(Self {
            intercept,
            coefficients,
        })
    }
}

impl Predictor for LinearRegressor {
    fn predict(&self, row: &CanonicalRow) -> Result<f64, PredictError> {
        check_width(row, self.coefficients.len())?;
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(row.values())
            .map(|(c, x)| c * x)
            .sum();
        finite(self.intercept + dot)
    }

    fn kind(&self) -> &'static str {
        "linear"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_prediction() {
        let model =
            LinearRegressor::new(500.0, vec![20.0, 100.0, 150.0, 30.0, 80.0, 60.0], 6).unwrap();
        let row = CanonicalRow::new(vec![45.0, 2.0, 1.0, 0.0, 1.0, 0.0]);
        // 500 + 900 + 200 + 150 + 80
        assert_eq!(model.predict(&row).unwrap(), 1830.0);
    }

    #[test]
    fn test_linear_shape_mismatch() {
        assert!(LinearRegressor::new(0.0, vec![1.0; 5], 6).is_err());
        assert!(LinearRegressor::new(f64::NAN, vec![1.0; 6], 6).is_err());
    }
}
