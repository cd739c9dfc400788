#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use tokengate::{
    claims::Claims,
    create_app_with_session,
    jwt::ManualClock,
    session::{RefreshConfig, RefreshCookie, SessionConfig, SessionManager},
};

pub const ACCESS_SECRET: &str = "test-access-secret-for-testing-only";
pub const REFRESH_SECRET: &str = "test-refresh-secret-for-testing-only";

pub const ACCESS_EXPIRY: i64 = 60;
pub const REFRESH_EXPIRY: i64 = 3600;

pub struct TestContext {
    pub app: Router,
    pub session: Arc<SessionManager>,
    pub clock: ManualClock,
}

impl TestContext {
    /// Issue an access token and a refresh cookie for `claims`.
    pub fn login(&self, claims: &Claims) -> (String, RefreshCookie) {
        let mut cookies: Vec<RefreshCookie> = Vec::new();
        let access = self
            .session
            .issue_with_refresh(claims, &mut cookies)
            .expect("Failed to issue tokens");
        let cookie = cookies.pop().expect("Refresh cookie not set");
        (access, cookie)
    }
}

/// App with access and refresh tokens configured.
pub fn setup() -> TestContext {
    setup_with_config(
        SessionConfig::new(ACCESS_SECRET)
            .with_access_expiry(ACCESS_EXPIRY)
            .with_refresh(RefreshConfig::new(REFRESH_SECRET).with_expiry(REFRESH_EXPIRY)),
    )
}

/// App with access tokens only.
pub fn setup_without_refresh() -> TestContext {
    setup_with_config(SessionConfig::new(ACCESS_SECRET).with_access_expiry(ACCESS_EXPIRY))
}

pub fn setup_with_config(config: SessionConfig) -> TestContext {
    let clock = ManualClock::starting_now();
    let session = Arc::new(SessionManager::with_clock(config, Arc::new(clock.clone())));
    TestContext {
        app: create_app_with_session(session.clone()),
        session,
        clock,
    }
}

pub fn alice() -> Claims {
    Claims::new().with("user", "alice").with("role", "editor")
}

pub fn get_me(authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri("/me");
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_refresh(cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/refresh");
    if let Some(value) = cookie {
        builder = builder.header("cookie", value);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn refresh_cookie_header(token: &str) -> String {
    format!("refresh_token={}", token)
}

pub async fn body_string(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}
