pub mod auth;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod server;
pub mod state;

pub use auth::{ApiKeySet, API_KEY_HEADER};
pub use error::{ApiError, ApiResult};
pub use handlers::{PredictionResponse, HOME_MESSAGE};
pub use routes::create_router;
pub use server::{load_model, Server};
pub use state::AppState;
