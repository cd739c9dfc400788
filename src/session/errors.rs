//! Session error types and their HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::jwt::{TokenError, UnauthorizedReason};

/// Errors from issuing, refreshing or validating session tokens.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Token missing, malformed, expired or otherwise not acceptable
    #[error("{0}")]
    Unauthorized(UnauthorizedReason),
    /// A refresh operation was requested but no refresh settings exist
    #[error("REFRESH NOT CONFIGURED")]
    RefreshNotConfigured,
    /// Caller supplied a claim the codec owns
    #[error("claim '{0}' is reserved")]
    ReservedClaim(String),
    /// Token could not be serialized or signed
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl SessionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SessionError::Unauthorized(_) | SessionError::RefreshNotConfigured => {
                StatusCode::UNAUTHORIZED
            }
            SessionError::ReservedClaim(_) => StatusCode::BAD_REQUEST,
            SessionError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn reason(&self) -> Option<UnauthorizedReason> {
        match self {
            SessionError::Unauthorized(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl From<TokenError> for SessionError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Unauthorized(reason) => SessionError::Unauthorized(reason),
            TokenError::Signing(e) => SessionError::Signing(e),
        }
    }
}

impl From<UnauthorizedReason> for SessionError {
    fn from(reason: UnauthorizedReason) -> Self {
        SessionError::Unauthorized(reason)
    }
}

/// Plain-text body. Signing details stay in the logs.
impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let message = match &self {
            SessionError::Signing(_) => "Error occurred while generating jwt".to_string(),
            other => other.to_string(),
        };
        (self.status_code(), message).into_response()
    }
}
