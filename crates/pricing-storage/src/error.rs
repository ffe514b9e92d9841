use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Token signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// `location` is the store's [`ObjectStore::location`](crate::ObjectStore::location).
    #[error("Object {location}/{key} not found")]
    NotFound { location: String, key: String },

    #[error("Storage request failed with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid object key: {0}")]
    InvalidKey(String),
}

impl From<pricing_core::CoreError> for StorageError {
    fn from(err: pricing_core::CoreError) -> Self {
        StorageError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
