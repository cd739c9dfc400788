//! Claims carried inside a session token.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reserved claim holding the absolute expiry (Unix seconds).
pub const EXPIRY_CLAIM: &str = "exp";

/// Flat string-to-string claims payload.
///
/// The `exp` claim is owned by the token codec: it is written on every encode
/// and always present on claims returned from a successful decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(BTreeMap<String, String>);

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a claim, returning the previous value for that key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expiry timestamp, if present and integral.
    pub fn expires_at(&self) -> Option<i64> {
        self.get(EXPIRY_CLAIM)?.parse().ok()
    }

    /// Copy of these claims with the expiry claim removed.
    pub fn without_expiry(&self) -> Self {
        let mut claims = self.clone();
        claims.remove(EXPIRY_CLAIM);
        claims
    }
}

impl<K, V> FromIterator<(K, V)> for Claims
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
