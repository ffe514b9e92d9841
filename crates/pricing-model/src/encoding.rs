//! Supervised target encoding for categorical columns.
//!
//! Each category maps to a blend of its own target mean and the global prior,
//! weighted by a sigmoid of the category's row count. Rare categories shrink
//! toward the prior; unseen categories map to the prior exactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetEncoder {
    pub min_samples_leaf: f64,
    pub smoothing: f64,
}

impl Default for TargetEncoder {
    fn default() -> Self {
        Self {
            min_samples_leaf: 20.0,
            smoothing: 10.0,
        }
    }
}

impl TargetEncoder {
    pub fn fit(&self, categories: &[String], target: &[f64]) -> Result<FittedTargetEncoder> {
        if categories.len() != target.len() {
            return Err(ModelError::InvalidTrainingData(format!(
                "{} categories for {} targets",
                categories.len(),
                target.len()
            )));
        }
        if target.is_empty() {
            return Err(ModelError::InvalidTrainingData(
                "cannot fit a target encoder on zero rows".into(),
            ));
        }
        if self.smoothing <= 0.0 {
            return Err(ModelError::InvalidParameter(
                "target encoder smoothing must be > 0".into(),
            ));
        }

        let prior = target.iter().sum::<f64>() / target.len() as f64;

        let mut stats: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for (category, &y) in categories.iter().zip(target) {
            let entry = stats.entry(category.as_str()).or_insert((0.0, 0));
            entry.0 += y;
            entry.1 += 1;
        }

        let mapping = stats
            .into_iter()
            .map(|(category, (sum, count))| {
                let n = count as f64;
                let weight = 1.0 / (1.0 + (-(n - self.min_samples_leaf) / self.smoothing).exp());
                let value = prior * (1.0 - weight) + (sum / n) * weight;
                (category.to_string(), value)
            })
            .collect();

        Ok(FittedTargetEncoder { prior, mapping })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTargetEncoder {
    prior: f64,
    mapping: BTreeMap<String, f64>,
}

impl FittedTargetEncoder {
    pub fn prior(&self) -> f64 {
        self.prior
    }

    pub fn encode(&self, category: &str) -> f64 {
        self.mapping.get(category).copied().unwrap_or(self.prior)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.mapping.keys().map(String::as_str)
    }
}
