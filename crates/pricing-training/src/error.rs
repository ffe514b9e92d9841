use pricing_core::CoreError;
use pricing_model::ModelError;
use pricing_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("Data error: {0}")]
    Data(#[from] CoreError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),
}

pub type Result<T> = std::result::Result<T, TrainingError>;
