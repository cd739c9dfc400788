//! Session token issuing and refreshing.
//!
//! A session is a short-lived access token, returned to the caller, plus an
//! optional long-lived refresh token delivered in an HttpOnly cookie. The two
//! are signed with independent secrets. Presenting a valid refresh token mints
//! a new access token carrying the same claims; the refresh token itself is
//! left untouched.

mod config;
mod cookie;
mod errors;

pub use config::{
    DEFAULT_ACCESS_EXPIRY_SECS, DEFAULT_REFRESH_EXPIRY_SECS, RefreshConfig, SessionConfig,
};
pub use cookie::{CookieSink, REFRESH_COOKIE_NAME, RefreshCookie, get_cookie};
pub use errors::SessionError;

use std::sync::Arc;

use tracing::{debug, error};

use crate::claims::{Claims, EXPIRY_CLAIM};
use crate::jwt::{Clock, SystemClock, TokenError, TokenKey, UnauthorizedReason};

/// Refresh keys and cookie settings.
#[derive(Debug)]
struct RefreshKeys {
    key: TokenKey,
    expiry_secs: i64,
    secure_cookie: bool,
}

/// Issues, validates and refreshes session tokens for one configuration.
///
/// Immutable after construction; share it behind an `Arc`.
pub struct SessionManager {
    access_key: TokenKey,
    access_expiry_secs: i64,
    refresh: Option<RefreshKeys>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("access_expiry_secs", &self.access_expiry_secs)
            .field("refresh", &self.refresh)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Use `clock` for every expiry computation and check.
    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            access_key: TokenKey::new(&config.access_secret),
            access_expiry_secs: config.access_expiry_secs,
            refresh: config.refresh.map(|refresh| RefreshKeys {
                key: TokenKey::new(&refresh.secret),
                expiry_secs: refresh.expiry_secs,
                secure_cookie: refresh.secure_cookie,
            }),
            clock,
        }
    }

    /// Issue an access token for `claims`.
    ///
    /// When `cookies` is given, a refresh token is issued as well and written
    /// to it as a cookie. That requires refresh settings; without them the
    /// call fails with `RefreshNotConfigured` before anything is signed or
    /// written. Without `cookies` no refresh token is produced.
    pub fn issue_access_token(
        &self,
        claims: &Claims,
        cookies: Option<&mut dyn CookieSink>,
    ) -> Result<String, SessionError> {
        if claims.contains_key(EXPIRY_CLAIM) {
            return Err(SessionError::ReservedClaim(EXPIRY_CLAIM.to_string()));
        }

        let refresh = match (&cookies, &self.refresh) {
            (None, _) => None,
            (Some(_), None) => return Err(SessionError::RefreshNotConfigured),
            (Some(_), Some(refresh)) => Some(refresh),
        };

        let now = self.clock.now();
        let access_token = self.sign(&self.access_key, self.access_expiry_secs, claims, now)?;

        if let (Some(refresh), Some(sink)) = (refresh, cookies) {
            let refresh_token = self.sign(&refresh.key, refresh.expiry_secs, claims, now)?;
            sink.set_cookie(RefreshCookie {
                value: refresh_token,
                expires_at: now.saturating_add(refresh.expiry_secs),
                max_age: refresh.expiry_secs,
                secure: refresh.secure_cookie,
            });
        }

        Ok(access_token)
    }

    /// Issue an access token only.
    pub fn issue_access_only(&self, claims: &Claims) -> Result<String, SessionError> {
        self.issue_access_token(claims, None)
    }

    /// Issue an access token and write a refresh cookie to `cookies`.
    pub fn issue_with_refresh(
        &self,
        claims: &Claims,
        cookies: &mut dyn CookieSink,
    ) -> Result<String, SessionError> {
        self.issue_access_token(claims, Some(cookies))
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The decoded claims are reused as-is apart from `exp`, which is
    /// recomputed from the access lifetime.
    pub fn refresh(&self, refresh_token: Option<&str>) -> Result<String, SessionError> {
        let refresh_token = refresh_token.ok_or(UnauthorizedReason::MissingRefreshToken)?;
        let refresh = self
            .refresh
            .as_ref()
            .ok_or(SessionError::RefreshNotConfigured)?;

        let claims = refresh
            .key
            .decode(refresh_token, self.clock.now())
            .inspect_err(|e| debug!(reason = %e, "Refresh token rejected"))?;

        self.sign(
            &self.access_key,
            self.access_expiry_secs,
            &claims.without_expiry(),
            self.clock.now(),
        )
    }

    /// Validate an access token and return its claims.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, SessionError> {
        Ok(self.access_key.decode(token, self.clock.now())?)
    }

    /// Validate a refresh token and return its claims.
    pub fn validate_refresh_token(&self, token: &str) -> Result<Claims, SessionError> {
        let refresh = self
            .refresh
            .as_ref()
            .ok_or(SessionError::RefreshNotConfigured)?;
        Ok(refresh.key.decode(token, self.clock.now())?)
    }

    fn sign(
        &self,
        key: &TokenKey,
        expiry_secs: i64,
        claims: &Claims,
        now: i64,
    ) -> Result<String, SessionError> {
        key.encode(expiry_secs, claims, now).map_err(|e| {
            if let TokenError::Signing(ref e) = e {
                error!(error = %e, "Failed to sign token");
            }
            SessionError::from(e)
        })
    }
}
