//! Offline training pipeline.
//!
//! A [`Dataloader`] supplies train and test frames, the [`DataProcessor`]
//! splits them into features and target and describes the preprocessing, and
//! the [`Trainer`] fits a [`pricing_model::Model`], persists it and reports
//! regression metrics.

pub mod dataloader;
pub mod error;
pub mod metrics;
pub mod processor;
pub mod trainer;

pub use dataloader::{CsvDataloader, Dataloader, InMemoryDataloader};
pub use error::*;
pub use metrics::RegressionMetrics;
pub use processor::{DataProcessor, EXCLUDED_COLUMNS};
pub use trainer::{TrainReport, Trainer, TrainerState};
