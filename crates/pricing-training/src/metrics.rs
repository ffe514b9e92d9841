use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainingError};

/// Standard regression error measures over one evaluation set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    /// Fraction, not percent.
    pub mape: f64,
    pub mae: f64,
}

impl RegressionMetrics {
    pub fn compute(predicted: &[f64], actual: &[f64]) -> Result<Self> {
        if predicted.len() != actual.len() {
            return Err(TrainingError::Evaluation(format!(
                "{} predictions for {} targets",
                predicted.len(),
                actual.len()
            )));
        }
        if actual.is_empty() {
            return Err(TrainingError::Evaluation(
                "cannot evaluate on zero rows".into(),
            ));
        }

        let n = actual.len() as f64;
        let (mut squared, mut absolute, mut relative) = (0.0, 0.0, 0.0);
        for (p, a) in predicted.iter().zip(actual) {
            let err = (p - a).abs();
            squared += err * err;
            absolute += err;
            relative += err / a.abs().max(f64::EPSILON);
        }

        Ok(Self {
            rmse: (squared / n).sqrt(),
            mape: relative / n,
            mae: absolute / n,
        })
    }
}
