//! Bearer token gate: middleware and extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::state::HasSession;
use crate::claims::Claims;
use crate::session::SessionError;

/// Length of the `Bearer ` scheme prefix stripped from the Authorization header.
pub const BEARER_PREFIX_LEN: usize = 7;

/// Token part of the Authorization header.
///
/// The first seven bytes are dropped without being inspected. A missing,
/// unreadable or too short header yields an empty token, which then fails
/// validation like any other bad token.
pub fn bearer_token(headers: &HeaderMap) -> &str {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.get(BEARER_PREFIX_LEN..))
        .unwrap_or("")
}

/// Validate the request's bearer token against the access secret.
pub fn authenticate<S: HasSession>(headers: &HeaderMap, state: &S) -> Result<Claims, SessionError> {
    state.session().validate_access_token(bearer_token(headers))
}

/// Middleware for routes that require an access token.
///
/// On success the verified `Claims` are stored in the request extensions and
/// the inner service runs. On failure a 401 is returned and the inner service
/// is never called.
pub async fn require_auth<S>(
    State(state): State<S>,
    mut request: Request,
    next: Next,
) -> Result<Response, SessionError>
where
    S: HasSession + Clone + Send + Sync + 'static,
{
    let claims = authenticate(request.headers(), &state).inspect_err(|e| {
        debug!(
            method = %request.method(),
            uri = %request.uri(),
            reason = %e,
            "Rejected unauthenticated request"
        )
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Extractor for the verified claims of the current request.
///
/// Reads the claims left by `require_auth`. On routes without the middleware
/// it validates the bearer token itself.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Claims);

impl<S> FromRequestParts<S> for Authenticated
where
    S: HasSession + Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(Authenticated(claims.clone()));
        }
        authenticate(&parts.headers, state).map(Authenticated)
    }
}
