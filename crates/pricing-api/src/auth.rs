//! API-key authentication on the `X-API-Key` header.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use pricing_core::{CoreError, Settings};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Accepted keys, held only as SHA-256 digests.
///
/// Every presented key is hashed and compared against all digests without
/// early exit, so timing depends on neither the matching prefix nor the key
/// length.
#[derive(Clone)]
pub struct ApiKeySet {
    digests: Vec<[u8; 32]>,
}

impl std::fmt::Debug for ApiKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeySet")
            .field("keys", &self.digests.len())
            .finish()
    }
}

impl ApiKeySet {
    /// Empty keys are ignored.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let digests = keys
            .into_iter()
            .filter(|k| !k.as_ref().is_empty())
            .map(|k| digest(k.as_ref()))
            .collect();
        Self { digests }
    }

    /// `api_key` plus `api_keys`; fails when none is configured.
    pub fn from_settings(settings: &Settings) -> Result<Self, CoreError> {
        let keys = settings.accepted_api_keys()?;
        let set = Self::new(keys.iter().map(|k| k.expose_secret()));
        if set.is_empty() {
            return Err(CoreError::Config("configured API keys are all empty".into()));
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Return `presented` when it is one of the accepted keys.
    pub fn validate<'a>(&self, presented: &'a str) -> Result<&'a str, ApiError> {
        let candidate = digest(presented);
        let matched = self
            .digests
            .iter()
            .fold(false, |found, accepted| found | constant_time_eq(accepted, &candidate));
        if matched {
            Ok(presented)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

fn digest(key: &str) -> [u8; 32] {
    Sha256::digest(key.as_bytes()).into()
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Reject requests whose `X-API-Key` header is missing or not accepted.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(key) => {
            state.keys.validate(key)?;
            debug!("API key accepted");
        }
        None => {
            warn!(path = %req.uri().path(), "Request without API key");
            return Err(ApiError::Unauthorized);
        }
    }

    Ok(next.run(req).await)
}
