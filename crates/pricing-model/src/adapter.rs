//! Uniform train / predict / save contract over a preprocessing + regressor pipeline.

use std::path::Path;

use pricing_core::DataFrame;
use tracing::{debug, info};

use crate::boosting::{GradientBoostingParams, GradientBoostingRegressor};
use crate::error::{ModelError, Result};
use crate::pipeline::{FittedPipeline, ModelArtifact};
use crate::transform::ColumnTransformer;

/// A trainable regression model with preprocessing prepended.
pub trait Model {
    /// Build an untrained model around an unfitted preprocessing transform.
    fn from_preprocessor(preprocessor: ColumnTransformer, random_seed: u64) -> Self
    where
        Self: Sized;

    /// Fit preprocessing and estimator jointly. Calling again refits from scratch.
    fn train(&mut self, features: &DataFrame, target: &[f64]) -> Result<()>;

    fn predict(&self, features: &DataFrame) -> Result<Vec<f64>>;

    /// Serialize the fitted pipeline into a single artifact file.
    fn save(&self, path: &Path) -> Result<()>;
}

/// Read-only prediction capability, shareable across request handlers.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &DataFrame) -> Result<Vec<f64>>;
}

pub struct GradientBoostingModel {
    preprocessor: ColumnTransformer,
    params: GradientBoostingParams,
    fitted: Option<ModelArtifact>,
}

impl GradientBoostingModel {
    pub fn with_params(preprocessor: ColumnTransformer, params: GradientBoostingParams) -> Self {
        Self {
            preprocessor,
            params,
            fitted: None,
        }
    }

    pub fn params(&self) -> &GradientBoostingParams {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Serialized artifact bytes, as `save` would write them.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.artifact()?.to_bytes()
    }

    /// Freeze into a read-only model for serving.
    pub fn into_trained(self) -> Result<TrainedModel> {
        self.fitted
            .map(|artifact| TrainedModel { artifact })
            .ok_or(ModelError::NotFitted)
    }

    fn artifact(&self) -> Result<&ModelArtifact> {
        self.fitted.as_ref().ok_or(ModelError::NotFitted)
    }
}

impl Model for GradientBoostingModel {
    fn from_preprocessor(preprocessor: ColumnTransformer, random_seed: u64) -> Self {
        Self::with_params(
            preprocessor,
            GradientBoostingParams::default().with_seed(random_seed),
        )
    }

    fn train(&mut self, features: &DataFrame, target: &[f64]) -> Result<()> {
        self.fitted = None;
        if features.is_empty() {
            return Err(ModelError::InvalidTrainingData(
                "cannot train on zero rows".into(),
            ));
        }

        let transformer = self.preprocessor.fit(features, target)?;
        let matrix = transformer.transform(features)?;
        debug!(
            rows = matrix.nrows(),
            features = matrix.ncols(),
            "Preprocessing fitted"
        );

        let regressor = GradientBoostingRegressor::fit(matrix.view(), target, self.params)?;
        info!(
            trees = regressor.n_trees(),
            learning_rate = self.params.learning_rate,
            max_depth = self.params.max_depth,
            "Gradient boosting regressor fitted"
        );

        self.fitted = Some(ModelArtifact {
            feature_columns: features.column_names().to_vec(),
            pipeline: FittedPipeline {
                transformer,
                regressor,
            },
        });
        Ok(())
    }

    fn predict(&self, features: &DataFrame) -> Result<Vec<f64>> {
        self.artifact()?.pipeline.predict(features)
    }

    fn save(&self, path: &Path) -> Result<()> {
        self.artifact()?.save(path)
    }
}

/// A loaded, immutable model artifact.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    artifact: ModelArtifact,
}

impl TrainedModel {
    pub fn load(path: &Path) -> Result<Self> {
        let artifact = ModelArtifact::load(path)?;
        info!(
            path = %path.display(),
            features = artifact.feature_columns.len(),
            trees = artifact.pipeline.regressor.n_trees(),
            "Model artifact loaded"
        );
        Ok(Self { artifact })
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.artifact.feature_columns
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }
}

impl Predictor for TrainedModel {
    fn predict(&self, features: &DataFrame) -> Result<Vec<f64>> {
        self.artifact.pipeline.predict(features)
    }
}
