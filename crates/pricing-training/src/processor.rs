//! Splits datasets into feature columns and the target, and describes the
//! (unfitted) preprocessing applied in front of the estimator.

use pricing_core::{ColumnKind, DataFrame, CATEGORICAL_COLUMNS, ID_COLUMN, PRICE_COLUMN};
use pricing_model::ColumnTransformer;
use tracing::{debug, info, warn};

use crate::dataloader::Dataloader;
use crate::error::{Result, TrainingError};

/// Columns never used as features. `price` is the target.
pub const EXCLUDED_COLUMNS: [&str; 3] = [ID_COLUMN, "target", PRICE_COLUMN];

#[derive(Debug, Clone)]
pub struct DataProcessor {
    train: DataFrame,
    test: DataFrame,
    train_cols: Vec<String>,
    target_col: String,
    categorical_cols: Vec<String>,
}

impl DataProcessor {
    /// Load both splits once and check they carry what training and
    /// evaluation need.
    pub fn new<D: Dataloader + ?Sized>(dataloader: &D) -> Result<Self> {
        let train = dataloader.load_train_data()?;
        let test = dataloader.load_test_data()?;
        Self::from_frames(train, test)
    }

    pub fn from_frames(train: DataFrame, test: DataFrame) -> Result<Self> {
        let target_col = PRICE_COLUMN.to_string();
        let categorical_cols: Vec<String> =
            CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect();

        let mut required = categorical_cols.clone();
        required.push(target_col.clone());
        let missing = train.missing_columns(&required);
        if !missing.is_empty() {
            return Err(TrainingError::Schema(format!(
                "train set is missing columns: {}",
                missing.join(", ")
            )));
        }
        for name in &categorical_cols {
            if train.column(name).map(|c| c.kind()) != Some(ColumnKind::Categorical) {
                return Err(TrainingError::Schema(format!(
                    "column '{}' must hold categorical values",
                    name
                )));
            }
        }

        // Text columns other than the encoded ones are left out of the
        // features, like a column transformer that drops its remainder.
        let (train_cols, ignored): (Vec<String>, Vec<String>) = train
            .column_names()
            .iter()
            .filter(|name| !EXCLUDED_COLUMNS.contains(&name.as_str()))
            .cloned()
            .partition(|name| {
                categorical_cols.contains(name)
                    || train.column(name).map(|c| c.kind()) == Some(ColumnKind::Numeric)
            });
        if !ignored.is_empty() {
            warn!(?ignored, "Ignoring undeclared text columns");
        }

        let mut test_required = train_cols.clone();
        test_required.push(target_col.clone());
        let missing = test.missing_columns(&test_required);
        if !missing.is_empty() {
            return Err(TrainingError::Schema(format!(
                "test set is missing columns: {}",
                missing.join(", ")
            )));
        }

        info!(
            train_rows = train.height(),
            test_rows = test.height(),
            features = train_cols.len(),
            "Data processor ready"
        );
        debug!(?train_cols, "Feature columns");

        Ok(Self {
            train,
            test,
            train_cols,
            target_col,
            categorical_cols,
        })
    }

    /// Training features (in `train_cols` order) and target.
    pub fn train_data(&self) -> Result<(DataFrame, Vec<f64>)> {
        self.split(&self.train)
    }

    /// Held-out features and target, with the same column order as training.
    pub fn test_data(&self) -> Result<(DataFrame, Vec<f64>)> {
        self.split(&self.test)
    }

    /// Split any frame carrying the feature columns and the target.
    pub fn split(&self, frame: &DataFrame) -> Result<(DataFrame, Vec<f64>)> {
        let features = frame.select(&self.train_cols)?;
        let target = frame.numeric(&self.target_col)?.to_vec();
        Ok((features, target))
    }

    pub fn train_cols(&self) -> &[String] {
        &self.train_cols
    }

    pub fn target_col(&self) -> &str {
        &self.target_col
    }

    pub fn categorical_cols(&self) -> &[String] {
        &self.categorical_cols
    }

    /// Unfitted transform: target-encode the categorical columns, pass the
    /// other features through. Fitting happens inside `Model::train`.
    pub fn preprocessor(&self) -> ColumnTransformer {
        ColumnTransformer::new(self.categorical_cols.iter().cloned())
    }
}
