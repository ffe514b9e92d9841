//! Gradient-boosted regression trees.

use std::collections::BTreeMap;

use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::tree::{RegressionTree, TreeParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Loss {
    /// Least squares; leaves hold mean residuals.
    SquaredError,
    /// Least absolute deviation; leaves hold median residuals.
    AbsoluteError,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingParams {
    pub learning_rate: f64,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub loss: Loss,
    pub random_seed: u64,
}

impl Default for GradientBoostingParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            n_estimators: 300,
            max_depth: 5,
            min_samples_split: 2,
            min_samples_leaf: 1,
            loss: Loss::AbsoluteError,
            random_seed: 0,
        }
    }
}

impl GradientBoostingParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "learning_rate must be > 0, got {}",
                self.learning_rate
            )));
        }
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParameter(
                "n_estimators must be >= 1".into(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ModelError::InvalidParameter("max_depth must be >= 1".into()));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    params: GradientBoostingParams,
    init: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl GradientBoostingRegressor {
    pub fn fit(x: ArrayView2<'_, f64>, y: &[f64], params: GradientBoostingParams) -> Result<Self> {
        params.validate()?;
        if x.nrows() != y.len() {
            return Err(ModelError::InvalidTrainingData(format!(
                "{} feature rows for {} targets",
                x.nrows(),
                y.len()
            )));
        }
        if y.is_empty() {
            return Err(ModelError::InvalidTrainingData(
                "cannot train on zero rows".into(),
            ));
        }
        if let Some(bad) = y.iter().find(|v| !v.is_finite()) {
            return Err(ModelError::InvalidTrainingData(format!(
                "target contains a non-finite value ({})",
                bad
            )));
        }

        let init = match params.loss {
            Loss::AbsoluteError => median(y.to_vec()),
            Loss::SquaredError => y.iter().sum::<f64>() / y.len() as f64,
        };

        let tree_params = params.tree_params();
        let mut rng = StdRng::seed_from_u64(params.random_seed);
        let mut raw = vec![init; y.len()];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for stage in 0..params.n_estimators {
            let residual: Vec<f64> = y.iter().zip(&raw).map(|(t, p)| t - p).collect();
            let gradient: Vec<f64> = match params.loss {
                Loss::SquaredError => residual.clone(),
                Loss::AbsoluteError => residual
                    .iter()
                    .map(|&r| if r > 0.0 { 1.0 } else { -1.0 })
                    .collect(),
            };

            let mut tree = RegressionTree::fit(x, &gradient, &tree_params, &mut rng);

            if params.loss == Loss::AbsoluteError {
                let mut by_leaf: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
                for (row, r) in x.rows().into_iter().zip(&residual) {
                    by_leaf.entry(tree.apply(row)).or_default().push(*r);
                }
                for (leaf, values) in by_leaf {
                    tree.set_leaf_value(leaf, median(values));
                }
            }

            for (row, pred) in x.rows().into_iter().zip(raw.iter_mut()) {
                *pred += params.learning_rate * tree.predict_row(row);
            }
            trees.push(tree);

            if stage % 50 == 0 {
                debug!(stage, "gradient boosting stage fitted");
            }
        }

        Ok(Self {
            params,
            init,
            n_features: x.ncols(),
            trees,
        })
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        if x.ncols() != self.n_features {
            return Err(ModelError::FeatureMismatch(format!(
                "expected {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let boost: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
                self.init + self.params.learning_rate * boost
            })
            .collect())
    }

    pub fn params(&self) -> &GradientBoostingParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn init_estimate(&self) -> f64 {
        self.init
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
