use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{auth, handlers, logging, AppState};

/// Every route sits behind the API-key check. Tracing and request logging
/// wrap the check so rejected calls are logged as well.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/predict", post(handlers::predict))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(logging::log_requests)),
        )
        .with_state(state)
}
