use std::time::Duration;

use async_trait::async_trait;
use pricing_core::Settings;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use tracing::{debug, info};
use url::Url;

use crate::credentials::{ServiceAccountKey, TokenProvider};
use crate::error::{Result, StorageError};
use crate::store::{validate_key, ObjectStore};

/// Google Cloud Storage JSON API client for a single bucket.
pub struct GcsStore {
    client: Client,
    endpoint: Url,
    bucket: String,
    tokens: TokenProvider,
}

impl GcsStore {
    pub fn new(endpoint: &str, bucket: impl Into<String>, key: ServiceAccountKey) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        if endpoint.cannot_be_a_base() {
            return Err(StorageError::Config(format!(
                "storage endpoint '{}' is not a base URL",
                endpoint
            )));
        }
        let bucket = bucket.into();
        if bucket.trim().is_empty() {
            return Err(StorageError::Config("bucket name cannot be empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            tokens: TokenProvider::new(key, client.clone()),
            client,
            endpoint,
            bucket,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let bucket = settings.require_bucket()?;
        let key = ServiceAccountKey::from_file(&settings.credentials_path()?)?;
        info!(
            bucket,
            client_email = %key.client_email,
            "Using Google Cloud Storage backend"
        );
        Self::new(&settings.storage_endpoint, bucket, key)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `{endpoint}/storage/v1/b/{bucket}/o/{key}?alt=media`, key percent-encoded
    /// as a single segment.
    pub fn download_url(&self, key: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageError::Config("storage endpoint is not a base URL".into()))?;
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "b", self.bucket.as_str(), "o", key]);
        }
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }

    /// `{endpoint}/upload/storage/v1/b/{bucket}/o?uploadType=media&name={key}`.
    pub fn upload_url(&self, key: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageError::Config("storage endpoint is not a base URL".into()))?;
            segments
                .pop_if_empty()
                .extend(["upload", "storage", "v1", "b", self.bucket.as_str(), "o"]);
        }
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key);
        Ok(url)
    }

    async fn check(&self, key: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound {
                location: self.location(),
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    fn location(&self) -> String {
        format!("gs://{}", self.bucket)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let key = validate_key(key)?;
        let url = self.download_url(key)?;
        let token = self.tokens.access_token().await?;
        debug!(%url, "Downloading object");

        let response = self.client.get(url).bearer_auth(token).send().await?;
        let response = self.check(key, response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let key = validate_key(key)?;
        let url = self.upload_url(key)?;
        let token = self.tokens.access_token().await?;
        debug!(%url, bytes = data.len(), "Uploading object");

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(data)
            .send()
            .await?;
        self.check(key, response).await?;
        Ok(())
    }
}
