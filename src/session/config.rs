//! Session configuration, built once at startup and shared read-only.

use std::fmt;

/// Default access token lifetime: 5 minutes
pub const DEFAULT_ACCESS_EXPIRY_SECS: i64 = 5 * 60;

/// Default refresh token lifetime: 2 weeks
pub const DEFAULT_REFRESH_EXPIRY_SECS: i64 = 14 * 24 * 60 * 60;

/// Secrets and lifetimes for access tokens and, optionally, refresh tokens.
#[derive(Clone)]
pub struct SessionConfig {
    /// HMAC secret for access tokens
    pub access_secret: Vec<u8>,
    /// Access token lifetime in seconds
    pub access_expiry_secs: i64,
    /// Refresh settings. `None` disables every refresh operation.
    pub refresh: Option<RefreshConfig>,
}

/// Refresh token settings. The secret should differ from the access secret.
#[derive(Clone)]
pub struct RefreshConfig {
    /// HMAC secret for refresh tokens
    pub secret: Vec<u8>,
    /// Refresh token and cookie lifetime in seconds
    pub expiry_secs: i64,
    /// Whether the refresh cookie carries the Secure flag
    pub secure_cookie: bool,
}

impl SessionConfig {
    /// Access-only configuration with the default lifetime.
    pub fn new(access_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            access_secret: access_secret.into(),
            access_expiry_secs: DEFAULT_ACCESS_EXPIRY_SECS,
            refresh: None,
        }
    }

    pub fn with_access_expiry(mut self, secs: i64) -> Self {
        self.access_expiry_secs = secs;
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshConfig) -> Self {
        self.refresh = Some(refresh);
        self
    }

    /// True when both token types are signed with the same secret.
    pub fn shares_secret(&self) -> bool {
        self.refresh
            .as_ref()
            .is_some_and(|refresh| refresh.secret == self.access_secret)
    }
}

impl RefreshConfig {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            expiry_secs: DEFAULT_REFRESH_EXPIRY_SECS,
            secure_cookie: false,
        }
    }

    pub fn with_expiry(mut self, secs: i64) -> Self {
        self.expiry_secs = secs;
        self
    }

    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.secure_cookie = secure;
        self
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("access_secret", &"<redacted>")
            .field("access_expiry_secs", &self.access_expiry_secs)
            .field("refresh", &self.refresh)
            .finish()
    }
}

impl fmt::Debug for RefreshConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshConfig")
            .field("secret", &"<redacted>")
            .field("expiry_secs", &self.expiry_secs)
            .field("secure_cookie", &self.secure_cookie)
            .finish()
    }
}
