use std::sync::Arc;

use pricing_model::Predictor;

use crate::auth::ApiKeySet;

/// Shared, read-only request state: the loaded model and the accepted keys.
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<dyn Predictor>,
    pub keys: Arc<ApiKeySet>,
}

impl AppState {
    pub fn new(predictor: Arc<dyn Predictor>, keys: ApiKeySet) -> Self {
        Self {
            predictor,
            keys: Arc::new(keys),
        }
    }
}
