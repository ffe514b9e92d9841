pub mod adapter;
pub mod boosting;
pub mod encoding;
pub mod error;
pub mod pipeline;
pub mod transform;
pub mod tree;

pub use adapter::{GradientBoostingModel, Model, Predictor, TrainedModel};
pub use boosting::{GradientBoostingParams, GradientBoostingRegressor, Loss};
pub use encoding::{FittedTargetEncoder, TargetEncoder};
pub use error::*;
pub use pipeline::{FittedPipeline, ModelArtifact};
pub use transform::{ColumnTransformer, FittedColumnTransformer, Remainder};
