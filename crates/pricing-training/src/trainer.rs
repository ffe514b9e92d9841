//! Orchestrates dataloader, processor and model: fit, persist, optionally
//! upload, and evaluate.

use std::path::{Path, PathBuf};

use pricing_core::DataFrame;
use pricing_model::{ColumnTransformer, GradientBoostingModel, Model, ModelError};
use pricing_storage::StorageGateway;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::dataloader::Dataloader;
use crate::error::{Result, TrainingError};
use crate::metrics::RegressionMetrics;
use crate::processor::DataProcessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrainerState {
    Constructed,
    Trained,
    Evaluated,
}

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainReport {
    pub artifact_path: PathBuf,
    /// Whether the artifact reached the bucket. `false` when no upload was
    /// requested or the upload failed.
    pub uploaded: bool,
    pub rows: usize,
}

pub struct Trainer<M: Model = GradientBoostingModel> {
    processor: DataProcessor,
    model: M,
    storage: Option<StorageGateway>,
    upload_key: Option<String>,
    state: TrainerState,
}

impl Trainer<GradientBoostingModel> {
    /// Gradient boosting with default hyper-parameters and the given seed.
    pub fn new<D: Dataloader + ?Sized>(dataloader: &D, random_seed: u64) -> Result<Self> {
        Self::with_model(dataloader, |preprocessor| {
            GradientBoostingModel::from_preprocessor(preprocessor, random_seed)
        })
    }
}

impl<M: Model> Trainer<M> {
    /// Build the processor from `dataloader` and the model from its
    /// preprocessor.
    pub fn with_model<D, F>(dataloader: &D, build_model: F) -> Result<Self>
    where
        D: Dataloader + ?Sized,
        F: FnOnce(ColumnTransformer) -> M,
    {
        let processor = DataProcessor::new(dataloader)?;
        let model = build_model(processor.preprocessor());
        Ok(Self {
            processor,
            model,
            storage: None,
            upload_key: None,
            state: TrainerState::Constructed,
        })
    }

    pub fn with_storage(mut self, storage: StorageGateway) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Blob key for uploads. Defaults to the output path.
    pub fn with_upload_key(mut self, key: impl Into<String>) -> Self {
        self.upload_key = Some(key.into());
        self
    }

    pub fn state(&self) -> TrainerState {
        self.state
    }

    pub fn processor(&self) -> &DataProcessor {
        &self.processor
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Fit on the training split and write the artifact to `output_path`.
    ///
    /// Upload problems are logged and reported through
    /// [`TrainReport::uploaded`]; they never fail the run.
    #[instrument(skip(self), fields(output = %output_path.display()))]
    pub async fn train(&mut self, output_path: &Path, upload: bool) -> Result<TrainReport> {
        let (features, target) = self.processor.train_data()?;
        info!(
            rows = features.height(),
            columns = features.width(),
            "Training the model"
        );
        self.model.train(&features, &target)?;
        self.state = TrainerState::Trained;

        info!(upload, "Saving the model");
        self.model.save(output_path)?;

        let uploaded = if upload {
            self.upload(output_path).await
        } else {
            false
        };

        Ok(TrainReport {
            artifact_path: output_path.to_path_buf(),
            uploaded,
            rows: features.height(),
        })
    }

    async fn upload(&self, output_path: &Path) -> bool {
        let Some(storage) = self.storage.as_ref() else {
            warn!("Upload requested but no storage is configured; keeping the local artifact only");
            return false;
        };
        let key = self
            .upload_key
            .clone()
            .unwrap_or_else(|| blob_key_for(output_path));

        info!(key = %key, location = %storage.location(), "Uploading the model");
        match storage.upload(output_path, &key).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, key = %key, "Error uploading the model; continuing with the local artifact");
                false
            }
        }
    }

    /// Score the fitted model on `test_set`, or on the held-out split when
    /// `None`. An external set must carry every feature column and the target.
    #[instrument(skip_all)]
    pub fn evaluate(&mut self, test_set: Option<&DataFrame>) -> Result<RegressionMetrics> {
        let (features, target) = match test_set {
            None => self.processor.test_data()?,
            Some(frame) => {
                let mut required = self.processor.train_cols().to_vec();
                required.push(self.processor.target_col().to_string());
                let missing = frame.missing_columns(&required);
                if !missing.is_empty() {
                    return Err(TrainingError::Schema(format!(
                        "test set is missing required columns: {}",
                        missing.join(", ")
                    )));
                }
                self.processor.split(frame)?
            }
        };

        if self.state == TrainerState::Constructed {
            return Err(ModelError::NotFitted.into());
        }

        info!(rows = features.height(), columns = features.width(), "Evaluating the model");
        let predictions = self.model.predict(&features)?;
        let metrics = RegressionMetrics::compute(&predictions, &target)?;
        info!(rmse = metrics.rmse, "RMSE");
        info!(mape = metrics.mape, "MAPE");
        info!(mae = metrics.mae, "MAE");

        self.state = TrainerState::Evaluated;
        Ok(metrics)
    }
}

/// `/`-separated key built from the relative components of `path`.
fn blob_key_for(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
