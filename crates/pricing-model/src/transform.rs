//! Column-wise preprocessing: target-encode the categorical columns and
//! optionally pass the remaining numeric columns through, producing a dense
//! feature matrix for the regressor.

use ndarray::Array2;
use pricing_core::{Column, ColumnKind, DataFrame};
use serde::{Deserialize, Serialize};

use crate::encoding::{FittedTargetEncoder, TargetEncoder};
use crate::error::{ModelError, Result};

/// What happens to columns that are not listed as categorical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Remainder {
    Drop,
    #[default]
    Passthrough,
}

/// Unfitted column transform: which columns to encode and what to do with the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTransformer {
    categorical: Vec<String>,
    encoder: TargetEncoder,
    remainder: Remainder,
}

impl ColumnTransformer {
    pub fn new<S: Into<String>>(categorical: impl IntoIterator<Item = S>) -> Self {
        Self {
            categorical: categorical.into_iter().map(Into::into).collect(),
            encoder: TargetEncoder::default(),
            remainder: Remainder::default(),
        }
    }

    pub fn with_encoder(mut self, encoder: TargetEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_remainder(mut self, remainder: Remainder) -> Self {
        self.remainder = remainder;
        self
    }

    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical
    }

    pub fn remainder(&self) -> Remainder {
        self.remainder
    }

    pub fn fit(&self, features: &DataFrame, target: &[f64]) -> Result<FittedColumnTransformer> {
        if features.height() != target.len() {
            return Err(ModelError::InvalidTrainingData(format!(
                "{} feature rows for {} targets",
                features.height(),
                target.len()
            )));
        }

        let mut encoders = Vec::with_capacity(self.categorical.len());
        for name in &self.categorical {
            let values = categorical_values(features, name)?;
            encoders.push((name.clone(), self.encoder.fit(values, target)?));
        }

        let passthrough = match self.remainder {
            Remainder::Drop => Vec::new(),
            Remainder::Passthrough => {
                let mut columns = Vec::new();
                for name in features.column_names() {
                    if self.categorical.contains(name) {
                        continue;
                    }
                    match features.column(name).map(Column::kind) {
                        Some(ColumnKind::Numeric) => columns.push(name.clone()),
                        _ => {
                            return Err(ModelError::FeatureMismatch(format!(
                                "column '{}' is categorical but not declared for encoding",
                                name
                            )))
                        }
                    }
                }
                columns
            }
        };

        Ok(FittedColumnTransformer {
            encoders,
            passthrough,
        })
    }
}

fn categorical_values<'a>(features: &'a DataFrame, name: &str) -> Result<&'a [String]> {
    match features.column(name) {
        Some(Column::Categorical(values)) => Ok(values),
        Some(Column::Numeric(_)) => Err(ModelError::FeatureMismatch(format!(
            "column '{}' must be categorical",
            name
        ))),
        None => Err(ModelError::FeatureMismatch(format!(
            "missing column '{}'",
            name
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedColumnTransformer {
    encoders: Vec<(String, FittedTargetEncoder)>,
    passthrough: Vec<String>,
}

impl FittedColumnTransformer {
    /// Input columns the transform reads, in output order.
    pub fn input_columns(&self) -> Vec<String> {
        self.encoders
            .iter()
            .map(|(name, _)| name.clone())
            .chain(self.passthrough.iter().cloned())
            .collect()
    }

    pub fn n_features_out(&self) -> usize {
        self.encoders.len() + self.passthrough.len()
    }

    pub fn encoder(&self, column: &str) -> Option<&FittedTargetEncoder> {
        self.encoders
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, encoder)| encoder)
    }

    /// Dense `rows x n_features_out` matrix. Columns are looked up by name, so
    /// the input frame may order (or over-supply) columns freely.
    pub fn transform(&self, features: &DataFrame) -> Result<Array2<f64>> {
        let missing = features.missing_columns(&self.input_columns());
        if !missing.is_empty() {
            return Err(ModelError::FeatureMismatch(format!(
                "missing columns: {}",
                missing.join(", ")
            )));
        }

        let rows = features.height();
        let mut out = Array2::<f64>::zeros((rows, self.n_features_out()));

        for (col, (name, encoder)) in self.encoders.iter().enumerate() {
            let values = categorical_values(features, name)?;
            for (row, value) in values.iter().enumerate() {
                out[[row, col]] = encoder.encode(value);
            }
        }

        let offset = self.encoders.len();
        for (idx, name) in self.passthrough.iter().enumerate() {
            let values = features.numeric(name).map_err(|_| {
                ModelError::FeatureMismatch(format!("column '{}' must be numeric", name))
            })?;
            for (row, &value) in values.iter().enumerate() {
                out[[row, offset + idx]] = value;
            }
        }

        Ok(out)
    }
}
