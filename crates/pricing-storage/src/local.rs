use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::store::{validate_key, ObjectStore};

/// Bucket emulated as a directory: objects live at `<root>/<bucket>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    bucket: String,
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>, bucket: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        validate_key(&bucket)?;
        if bucket.contains('/') {
            return Err(StorageError::Config(format!(
                "bucket name '{}' cannot contain '/'",
                bucket
            )));
        }
        Ok(Self {
            dir: root.as_ref().join(&bucket),
            bucket,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn object_path(&self, key: &str) -> Result<PathBuf> {
        let key = validate_key(key)?;
        Ok(key.split('/').fold(self.dir.clone(), |path, part| path.join(part)))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn location(&self) -> String {
        format!("file://{}", self.dir.display())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(key)?;
        debug!(path = %path.display(), "Reading local object");
        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound {
                location: self.location(),
                key: key.to_string(),
            },
            _ => StorageError::Io(e),
        })
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!(path = %path.display(), bytes = data.len(), "Writing local object");
        tokio::fs::write(&path, data).await?;
        Ok(())
    }
}
