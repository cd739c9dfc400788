//! Request logging middleware.

use axum::{extract::Request, middleware::Next, response::Response};
use tracing::info;

/// Log every incoming request's method and URI, then pass it on.
pub async fn log_request(request: Request, next: Next) -> Response {
    info!(method = %request.method(), uri = %request.uri(), "incoming request");
    next.run(request).await
}
