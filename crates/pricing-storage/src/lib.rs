//! Artifact storage: a Google Cloud Storage client authenticated with a
//! service-account key, a directory-backed stand-in, and the gateway the
//! trainer and API use to move model files.

pub mod credentials;
pub mod error;
pub mod gateway;
pub mod gcs;
pub mod local;
pub mod store;

pub use credentials::{ServiceAccountKey, TokenProvider};
pub use error::*;
pub use gateway::StorageGateway;
pub use gcs::GcsStore;
pub use local::LocalStore;
pub use store::{validate_key, ObjectStore};
