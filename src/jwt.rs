//! JWT token generation and validation.
//!
//! Tokens carry a flat claims map plus a numeric `exp` claim and are signed
//! with a symmetric HMAC key. Only HS256, HS384 and HS512 are accepted when
//! decoding; every other declared algorithm is rejected before the signature
//! is looked at.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::claims::{Claims, EXPIRY_CLAIM};

const NOT_BEFORE_CLAIM: &str = "nbf";

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Source of the current time in Unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self(Arc::new(AtomicI64::new(now)))
    }

    /// Start at the current wall-clock time.
    pub fn starting_now() -> Self {
        Self::new(SystemClock.now())
    }

    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }

}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a token was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedReason {
    /// Not a structurally valid token
    Malformed,
    /// Expired, or not valid yet
    Expired,
    /// Bad signature, unexpected algorithm, or any other verification failure
    Invalid,
    /// No refresh token cookie on the request
    MissingRefreshToken,
}

impl UnauthorizedReason {
    pub fn message(&self) -> &'static str {
        match self {
            UnauthorizedReason::Malformed => "MALFORMED TOKEN",
            UnauthorizedReason::Expired => "EXPIRED TOKEN",
            UnauthorizedReason::Invalid => "INVALID TOKEN",
            UnauthorizedReason::MissingRefreshToken => "REFRESH TOKEN NOT FOUND",
        }
    }
}

impl fmt::Display for UnauthorizedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("{0}")]
    Unauthorized(UnauthorizedReason),
    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl TokenError {
    /// The refusal reason, if this is not a signing failure.
    pub fn reason(&self) -> Option<UnauthorizedReason> {
        match self {
            TokenError::Unauthorized(reason) => Some(*reason),
            TokenError::Signing(_) => None,
        }
    }
}

impl From<UnauthorizedReason> for TokenError {
    fn from(reason: UnauthorizedReason) -> Self {
        TokenError::Unauthorized(reason)
    }
}

/// Signing and verification keys derived from one HMAC secret.
#[derive(Clone)]
pub struct TokenKey {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenKey").finish_non_exhaustive()
    }
}

impl TokenKey {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Sign `claims` with `exp = now + expiry_secs`.
    ///
    /// Any `exp` already present in `claims` is replaced.
    pub fn encode(&self, expiry_secs: i64, claims: &Claims, now: i64) -> Result<String, TokenError> {
        let mut payload: Map<String, Value> = claims
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        payload.insert(
            EXPIRY_CLAIM.to_string(),
            Value::from(now.saturating_add(expiry_secs)),
        );

        jsonwebtoken::encode(&Header::default(), &payload, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Verify `token` and return its claims, `exp` included, as strings.
    pub fn decode(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        check_segments(token)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        // Time checks run below against the injected clock.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data =
            jsonwebtoken::decode::<Map<String, Value>>(token, &self.decoding_key, &validation)
                .map_err(|e| TokenError::Unauthorized(classify(&e)))?;
        let payload = token_data.claims;

        check_times(&payload, now)?;

        Ok(payload
            .into_iter()
            .map(|(key, value)| (key, claim_to_string(&value)))
            .collect())
    }
}

/// Encode with the system clock.
pub fn encode(secret: &[u8], expiry_secs: i64, claims: &Claims) -> Result<String, TokenError> {
    TokenKey::new(secret).encode(expiry_secs, claims, SystemClock.now())
}

/// Decode with the system clock.
pub fn decode(token: &str, secret: &[u8]) -> Result<Claims, TokenError> {
    TokenKey::new(secret).decode(token, SystemClock.now())
}

/// Checks run on the raw segments before the signature is verified.
///
/// Undecodable header or payload segments make the token Malformed. An
/// unexpected algorithm or an undecodable signature segment make it Invalid.
fn check_segments(token: &str) -> Result<(), UnauthorizedReason> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, payload, signature] = segments.as_slice() else {
        return Err(UnauthorizedReason::Malformed);
    };

    let header = decode_json_segment(header)?;
    decode_json_segment(payload)?;

    match header.get("alg").and_then(Value::as_str) {
        Some("HS256" | "HS384" | "HS512") => {}
        _ => return Err(UnauthorizedReason::Invalid),
    }

    URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| UnauthorizedReason::Invalid)?;

    Ok(())
}

fn decode_json_segment(segment: &str) -> Result<Map<String, Value>, UnauthorizedReason> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| UnauthorizedReason::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| UnauthorizedReason::Malformed)
}

fn check_times(payload: &Map<String, Value>, now: i64) -> Result<(), UnauthorizedReason> {
    let exp = payload
        .get(EXPIRY_CLAIM)
        .and_then(Value::as_f64)
        .ok_or(UnauthorizedReason::Invalid)?;
    if now as f64 > exp {
        return Err(UnauthorizedReason::Expired);
    }

    if let Some(nbf) = payload.get(NOT_BEFORE_CLAIM).and_then(Value::as_f64) {
        if nbf > now as f64 {
            return Err(UnauthorizedReason::Expired);
        }
    }

    Ok(())
}

fn classify(error: &jsonwebtoken::errors::Error) -> UnauthorizedReason {
    match error.kind() {
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            UnauthorizedReason::Malformed
        }
        ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => UnauthorizedReason::Expired,
        _ => UnauthorizedReason::Invalid,
    }
}

/// Integers render in decimal, other numbers with six fractional digits.
/// Non-scalar values render empty.
fn claim_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                format!("{:.6}", n.as_f64().unwrap_or_default())
            }
        }
        _ => String::new(),
    }
}
