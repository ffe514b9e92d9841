use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::info;

/// Log every request line and the resulting status.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    info!("Request: {} {}", method, uri);

    let started = Instant::now();
    let response = next.run(req).await;
    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Response: {}",
        response.status().as_u16()
    );
    response
}
