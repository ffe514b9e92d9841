use async_trait::async_trait;

use crate::error::{Result, StorageError};

/// A bucket-like blob store addressed by `/`-separated keys.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Human readable location, e.g. `gs://bucket`.
    fn location(&self) -> String;

    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;
}

/// Reject keys that are empty, absolute, or escape the bucket.
pub fn validate_key(key: &str) -> Result<&str> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey("key is empty".into()));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "'{}' must be a relative '/'-separated path",
            key
        )));
    }
    if key.split('/').any(|segment| segment.is_empty() || segment == "..") {
        return Err(StorageError::InvalidKey(format!(
            "'{}' contains an empty or '..' segment",
            key
        )));
    }
    Ok(key)
}
