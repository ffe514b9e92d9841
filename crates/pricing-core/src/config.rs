//! Process configuration, loaded once at startup and passed by reference.
//!
//! Sources, later ones winning:
//! 1. `<config_dir>/pricing.toml`
//! 2. `<config_dir>/local.toml`
//! 3. the process environment (`API_KEY`, `BUCKET_NAME`, ...), after an env
//!    file (`api.env` or `.env`, or an explicit path) has been loaded into it.

use std::path::{Path, PathBuf};

use config as cfg;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Gcs,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Additional accepted keys, comma separated in the environment.
    #[serde(default, deserialize_with = "deserialize_key_list")]
    pub api_keys: Vec<SecretString>,
    #[serde(default = "Settings::default_api_host")]
    pub api_host: String,
    #[serde(default = "Settings::default_api_port")]
    pub api_port: u16,

    /// Service-account key file name, resolved inside `credentials_dir`.
    #[serde(default)]
    pub google_application_credentials: Option<String>,
    #[serde(default = "Settings::default_credentials_dir")]
    pub credentials_dir: PathBuf,
    #[serde(default)]
    pub bucket_name: String,
    #[serde(default = "Settings::default_bucket_model_path")]
    pub bucket_model_path: String,
    #[serde(default)]
    pub storage_backend: StorageBackend,
    #[serde(default = "Settings::default_storage_endpoint")]
    pub storage_endpoint: String,
    #[serde(default = "Settings::default_local_storage_root")]
    pub local_storage_root: PathBuf,
    #[serde(default = "Settings::default_model_staging_dir")]
    pub model_staging_dir: PathBuf,

    /// Verbose logging only; never changes behaviour.
    #[serde(default)]
    pub dev_mode: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_keys: Vec::new(),
            api_host: Self::default_api_host(),
            api_port: Self::default_api_port(),
            google_application_credentials: None,
            credentials_dir: Self::default_credentials_dir(),
            bucket_name: String::new(),
            bucket_model_path: Self::default_bucket_model_path(),
            storage_backend: StorageBackend::default(),
            storage_endpoint: Self::default_storage_endpoint(),
            local_storage_root: Self::default_local_storage_root(),
            model_staging_dir: Self::default_model_staging_dir(),
            dev_mode: false,
            log_file: None,
        }
    }
}

impl Settings {
    fn default_api_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_api_port() -> u16 {
        8000
    }

    fn default_credentials_dir() -> PathBuf {
        PathBuf::from("credentials")
    }

    fn default_bucket_model_path() -> String {
        "models/model.bin".to_string()
    }

    fn default_storage_endpoint() -> String {
        "https://storage.googleapis.com".to_string()
    }

    fn default_local_storage_root() -> PathBuf {
        PathBuf::from("storage")
    }

    fn default_model_staging_dir() -> PathBuf {
        PathBuf::from(".")
    }

    /// Load from config files under `config_dir` (default `./config`) and the
    /// environment. `env_file` must exist when given explicitly.
    pub fn load(config_dir: Option<&Path>, env_file: Option<&Path>) -> Result<Self> {
        match env_file {
            Some(path) => {
                dotenv::from_path(path).map_err(|e| {
                    CoreError::Config(format!("loading env file {}: {}", path.display(), e))
                })?;
                info!("Loaded environment from {}", path.display());
            }
            None => {
                if dotenv::from_filename("api.env").is_ok() {
                    info!("Loaded environment from api.env");
                } else if dotenv::dotenv().is_ok() {
                    info!("Loaded environment from .env");
                }
            }
        }

        let config_dir = config_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("config"));
        debug!("Using config directory: {:?}", config_dir);

        let builder = cfg::Config::builder()
            .add_source(cfg::File::from(config_dir.join("pricing.toml")).required(false))
            .add_source(cfg::File::from(config_dir.join("local.toml")).required(false))
            .add_source(Self::environment(None));

        Self::from_builder(builder)
    }

    /// Environment values stay strings: keys like `007` must not be read as
    /// numbers. Typed fields are coerced during deserialization.
    fn environment(vars: Option<cfg::Map<String, String>>) -> cfg::Environment {
        cfg::Environment::default().source(vars)
    }

    /// Parse settings from a TOML document; nothing else is consulted.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let builder =
            cfg::Config::builder().add_source(cfg::File::from_str(source, cfg::FileFormat::Toml));
        Self::from_builder(builder)
    }

    fn from_builder(builder: cfg::ConfigBuilder<cfg::builder::DefaultState>) -> Result<Self> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_host.trim().is_empty() {
            return Err(CoreError::Config("api_host cannot be empty".into()));
        }
        if self.api_port == 0 {
            return Err(CoreError::Config("api_port must be > 0".into()));
        }
        if self.bucket_model_path.trim().is_empty() {
            return Err(CoreError::Config("bucket_model_path cannot be empty".into()));
        }
        if self.storage_backend == StorageBackend::Gcs && self.storage_endpoint.trim().is_empty()
        {
            return Err(CoreError::Config("storage_endpoint cannot be empty".into()));
        }
        Ok(())
    }

    /// Every accepted API key. Fails when none is configured.
    pub fn accepted_api_keys(&self) -> Result<Vec<&SecretString>> {
        let keys: Vec<&SecretString> = self.api_key.iter().chain(self.api_keys.iter()).collect();
        if keys.is_empty() {
            return Err(CoreError::Config(
                "api_key must be set to serve requests".into(),
            ));
        }
        Ok(keys)
    }

    /// Bucket name, failing when unset.
    pub fn require_bucket(&self) -> Result<&str> {
        let bucket = self.bucket_name.trim();
        if bucket.is_empty() {
            return Err(CoreError::Config("bucket_name must be set".into()));
        }
        Ok(bucket)
    }

    /// Path of the service-account key file inside `credentials_dir`.
    pub fn credentials_path(&self) -> Result<PathBuf> {
        match self.google_application_credentials.as_deref() {
            Some(name) if !name.trim().is_empty() => Ok(self.credentials_dir.join(name)),
            _ => Err(CoreError::Config(
                "google_application_credentials must be set for the gcs backend".into(),
            )),
        }
    }

    pub fn log_level(&self) -> &'static str {
        if self.dev_mode {
            "debug"
        } else {
            "info"
        }
    }
}

/// `api_keys` is a list in config files and a comma separated string in the
/// environment. Blank entries are dropped.
fn deserialize_key_list<'de, D>(deserializer: D) -> std::result::Result<Vec<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum KeyList {
        List(Vec<String>),
        Joined(String),
    }

    let keys = match KeyList::deserialize(deserializer)? {
        KeyList::List(keys) => keys,
        KeyList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(keys
        .into_iter()
        .filter(|k| !k.trim().is_empty())
        .map(SecretString::from)
        .collect())
}
