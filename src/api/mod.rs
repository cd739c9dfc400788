mod tokens;

use axum::Router;
use std::sync::Arc;

use crate::session::SessionManager;

pub use tokens::TokensState;

/// Create the API router.
pub fn create_api_router(session: Arc<SessionManager>) -> Router {
    tokens::router(TokensState { session })
}
