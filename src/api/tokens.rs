//! Token API endpoints.
//!
//! - POST `/refresh` - Exchange the refresh token cookie for a new access token
//! - GET `/me` - Claims of the current access token (requires authentication)

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    middleware,
    routing::{get, post},
};
use serde::Serialize;
use tracing::debug;

use crate::auth::{Authenticated, require_auth};
use crate::claims::Claims;
use crate::impl_has_session;
use crate::session::{REFRESH_COOKIE_NAME, SessionError, SessionManager, get_cookie};

#[derive(Clone)]
pub struct TokensState {
    pub session: Arc<SessionManager>,
}

impl_has_session!(TokensState);

pub fn router(state: TokensState) -> Router {
    let protected = Router::new()
        .route("/me", get(current_claims))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<TokensState>,
        ));

    Router::new()
        .route("/refresh", post(refresh_token))
        .merge(protected)
        .with_state(state)
}

#[derive(Serialize)]
struct TokenResponse {
    token: String,
}

/// Refresh the access token using the refresh token cookie.
/// The refresh cookie itself is left as it is.
async fn refresh_token(
    State(state): State<TokensState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, SessionError> {
    let token = state
        .session
        .refresh(get_cookie(&headers, REFRESH_COOKIE_NAME))?;

    debug!("Issued access token from refresh token");
    Ok(Json(TokenResponse { token }))
}

/// Return the verified claims of the caller.
async fn current_claims(Authenticated(claims): Authenticated) -> Json<Claims> {
    Json(claims)
}
