//! Fitted preprocessing + regressor, and the on-disk artifact that carries it.
//!
//! Artifact layout: 8-byte magic, little-endian `u32` format version, then the
//! bincode (serde) encoding of [`ModelArtifact`].

use std::fs;
use std::path::Path;

use pricing_core::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::boosting::GradientBoostingRegressor;
use crate::error::{ModelError, Result};
use crate::transform::FittedColumnTransformer;

pub const ARTIFACT_MAGIC: &[u8; 8] = b"PRICEMDL";
pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub transformer: FittedColumnTransformer,
    pub regressor: GradientBoostingRegressor,
}

impl FittedPipeline {
    pub fn predict(&self, features: &DataFrame) -> Result<Vec<f64>> {
        let matrix = self.transformer.transform(features)?;
        self.regressor.predict(matrix.view())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Feature columns the model was trained on, in training order.
    pub feature_columns: Vec<String>,
    pub pipeline: FittedPipeline,
}

impl ModelArtifact {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        let mut bytes = Vec::with_capacity(ARTIFACT_MAGIC.len() + 4 + payload.len());
        bytes.extend_from_slice(ARTIFACT_MAGIC);
        bytes.extend_from_slice(&ARTIFACT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header_len = ARTIFACT_MAGIC.len() + 4;
        if bytes.len() < header_len || &bytes[..ARTIFACT_MAGIC.len()] != ARTIFACT_MAGIC {
            return Err(ModelError::InvalidArtifact(
                "not a model artifact (bad magic header)".into(),
            ));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[ARTIFACT_MAGIC.len()..header_len]);
        let version = u32::from_le_bytes(version);
        if version != ARTIFACT_VERSION {
            return Err(ModelError::InvalidArtifact(format!(
                "unsupported artifact version {} (expected {})",
                version, ARTIFACT_VERSION
            )));
        }
        let (artifact, _) =
            bincode::serde::decode_from_slice(&bytes[header_len..], bincode::config::standard())?;
        Ok(artifact)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let bytes = self.to_bytes()?;
        fs::write(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Model artifact written");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}
