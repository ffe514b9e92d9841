use pricing_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data error: {0}")]
    Data(#[from] CoreError),

    #[error("Model is not fitted: call train() or load an artifact before predict()")]
    NotFitted,

    #[error("Feature mismatch: {0}")]
    FeatureMismatch(String),

    #[error("Invalid training data: {0}")]
    InvalidTrainingData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),
}

impl From<bincode::error::EncodeError> for ModelError {
    fn from(err: bincode::error::EncodeError) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for ModelError {
    fn from(err: bincode::error::DecodeError) -> Self {
        ModelError::InvalidArtifact(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
