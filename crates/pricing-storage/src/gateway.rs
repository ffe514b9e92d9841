//! Moves model artifacts between the local filesystem and the configured bucket.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pricing_core::{Settings, StorageBackend};
use tracing::{info, instrument};

use crate::error::{Result, StorageError};
use crate::gcs::GcsStore;
use crate::local::LocalStore;
use crate::store::{validate_key, ObjectStore};

#[derive(Clone)]
pub struct StorageGateway {
    store: Arc<dyn ObjectStore>,
    staging_dir: PathBuf,
}

impl std::fmt::Debug for StorageGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageGateway")
            .field("location", &self.store.location())
            .field("staging_dir", &self.staging_dir)
            .finish()
    }
}

impl StorageGateway {
    pub fn new(store: Arc<dyn ObjectStore>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            staging_dir: staging_dir.into(),
        }
    }

    /// Pick the backend named by `storage_backend`. The GCS backend needs
    /// `bucket_name` and a readable service-account key file.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let store: Arc<dyn ObjectStore> = match settings.storage_backend {
            StorageBackend::Gcs => Arc::new(GcsStore::from_settings(settings)?),
            StorageBackend::Local => Arc::new(LocalStore::new(
                &settings.local_storage_root,
                settings.require_bucket()?,
            )?),
        };
        Ok(Self::new(store, &settings.model_staging_dir))
    }

    pub fn location(&self) -> String {
        self.store.location()
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Fetch `key` into the staging directory, named by the key's last
    /// segment. An existing file there is overwritten.
    #[instrument(skip(self), fields(location = %self.store.location()))]
    pub async fn download(&self, key: &str) -> Result<PathBuf> {
        let key = validate_key(key)?;
        let file_name = key
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| StorageError::InvalidKey(format!("'{}' has no file name", key)))?;

        let bytes = self.store.get(key).await?;
        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let local_path = self.staging_dir.join(file_name);
        tokio::fs::write(&local_path, &bytes).await?;

        info!(
            key,
            path = %local_path.display(),
            bytes = bytes.len(),
            "Downloaded object"
        );
        Ok(local_path)
    }

    /// Upload the file at `local_path` to `key`, replacing any existing object.
    #[instrument(skip(self), fields(location = %self.store.location()))]
    pub async fn upload(&self, local_path: &Path, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        let bytes = tokio::fs::read(local_path).await?;
        let size = bytes.len();
        self.store.put(key, bytes).await?;
        info!(key, path = %local_path.display(), bytes = size, "Uploaded object");
        Ok(())
    }
}
