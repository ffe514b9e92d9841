//! Service-account authentication for Google Cloud Storage.
//!
//! A signed RS256 JWT assertion is exchanged at the key's `token_uri` for a
//! short-lived bearer token, which is cached until shortly before expiry.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{header::CONTENT_TYPE, Client};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Result, StorageError};

pub const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "ServiceAccountKey::default_token_uri")]
    pub token_uri: String,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl ServiceAccountKey {
    fn default_token_uri() -> String {
        "https://oauth2.googleapis.com/token".to_string()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Credentials(format!("reading {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(raw)
            .map_err(|e| StorageError::Credentials(format!("malformed key file: {}", e)))?;
        if let Some(kind) = key.key_type.as_deref() {
            if kind != "service_account" {
                return Err(StorageError::Credentials(format!(
                    "expected a service_account key, got '{}'",
                    kind
                )));
            }
        }
        if key.client_email.trim().is_empty() || key.private_key.trim().is_empty() {
            return Err(StorageError::Credentials(
                "client_email and private_key are required".into(),
            ));
        }
        Ok(key)
    }

    /// Signed JWT assertion valid for one hour from `issued_at` (unix seconds).
    pub fn assertion(&self, scope: &str, issued_at: i64) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }
}

pub struct TokenProvider {
    key: ServiceAccountKey,
    client: Client,
    scope: String,
    cached: Mutex<Option<(String, Instant)>>,
}

impl TokenProvider {
    pub fn new(key: ServiceAccountKey, client: Client) -> Self {
        Self {
            key,
            client,
            scope: STORAGE_SCOPE.to_string(),
            cached: Mutex::new(None),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some((token, expires_at)) = cached.as_ref() {
            if Instant::now() + EXPIRY_MARGIN < *expires_at {
                return Ok(token.clone());
            }
        }

        let assertion = self.key.assertion(&self.scope, Utc::now().timestamp())?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", JWT_BEARER_GRANT)
            .append_pair("assertion", &assertion)
            .finish();

        let response = self
            .client
            .post(&self.key.token_uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Credentials(format!(
                "token exchange rejected with HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        debug!(
            client_email = %self.key.client_email,
            expires_in_secs = lifetime.as_secs(),
            "Obtained storage access token"
        );
        *cached = Some((token.access_token.clone(), Instant::now() + lifetime));
        Ok(token.access_token)
    }
}
