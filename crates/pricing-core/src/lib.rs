pub mod config;
pub mod error;
pub mod frame;
pub mod record;
pub mod telemetry;

pub use config::{Settings, StorageBackend};
pub use error::*;
pub use frame::{Column, ColumnKind, DataFrame};
pub use record::*;
