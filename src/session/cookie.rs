//! Refresh token cookie building and parsing.

use axum::http::{HeaderMap, HeaderValue, header};
use chrono::{DateTime, Duration, Utc};

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// A refresh token cookie ready to be sent to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCookie {
    /// Signed refresh token
    pub value: String,
    /// Absolute expiry (Unix seconds), same as the token's `exp`
    pub expires_at: i64,
    /// Lifetime in seconds, used for Max-Age
    pub max_age: i64,
    /// Whether the Secure flag is set
    pub secure: bool,
}

impl RefreshCookie {
    /// Render as a `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        let expires = DateTime::<Utc>::from_timestamp(self.expires_at, 0)
            .unwrap_or_else(|| Utc::now() + Duration::seconds(self.max_age.max(0)));
        let secure = if self.secure { "; Secure" } else { "" };

        format!(
            "{}={}; HttpOnly; Path=/; Max-Age={}; Expires={}{}",
            REFRESH_COOKIE_NAME,
            self.value,
            self.max_age.max(0),
            expires.format("%a, %d %b %Y %H:%M:%S GMT"),
            secure
        )
    }
}

/// Somewhere an outbound refresh cookie can be written.
pub trait CookieSink {
    fn set_cookie(&mut self, cookie: RefreshCookie);
}

/// Appends a `Set-Cookie` header.
impl CookieSink for HeaderMap {
    fn set_cookie(&mut self, cookie: RefreshCookie) {
        match HeaderValue::from_str(&cookie.header_value()) {
            Ok(value) => {
                self.append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Refresh cookie is not a valid header value"),
        }
    }
}

/// Collects cookies in memory.
impl CookieSink for Vec<RefreshCookie> {
    fn set_cookie(&mut self, cookie: RefreshCookie) {
        self.push(cookie);
    }
}

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(secure: bool) -> RefreshCookie {
        RefreshCookie {
            value: "abc.def.ghi".to_string(),
            // 2023-11-14 22:13:20 UTC
            expires_at: 1_700_000_000,
            max_age: 3600,
            secure,
        }
    }

    #[test]
    fn test_header_value_attributes() {
        assert_eq!(
            cookie(false).header_value(),
            "refresh_token=abc.def.ghi; HttpOnly; Path=/; Max-Age=3600; Expires=Tue, 14 Nov 2023 22:13:20 GMT"
        );
    }

    #[test]
    fn test_header_value_secure() {
        assert!(cookie(true).header_value().ends_with("; Secure"));
        assert!(!cookie(false).header_value().contains("Secure"));
    }

    #[test]
    fn test_header_map_sink_appends() {
        let mut headers = HeaderMap::new();
        headers.set_cookie(cookie(false));
        headers.set_cookie(cookie(true));

        assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 2);
    }

    #[test]
    fn test_get_cookie_simple() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("refresh_token=abc123"),
        );

        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME), Some("abc123"));
    }

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; refresh_token=xyz789; theme=dark"),
        );

        assert_eq!(get_cookie(&headers, "refresh_token"), Some("xyz789"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
        assert_eq!(get_cookie(&headers, "theme"), Some("dark"));
    }

    #[test]
    fn test_get_cookie_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("foo=bar"));
        headers.append(header::COOKIE, HeaderValue::from_static("refresh_token=xyz"));

        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME), Some("xyz"));
    }

    #[test]
    fn test_get_cookie_not_found() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("foo=bar"));

        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME), None);
        assert_eq!(get_cookie(&HeaderMap::new(), REFRESH_COOKIE_NAME), None);
    }
}
