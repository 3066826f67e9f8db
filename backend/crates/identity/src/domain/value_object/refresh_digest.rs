//! Refresh Digest
//!
//! SHA-256 (lowercase hex) of the refresh token currently allowed for an
//! account. Only the digest is persisted, never the token.

use std::fmt;

use platform::crypto::{constant_time_eq, sha256_hex};

#[derive(Clone, Eq)]
pub struct RefreshDigest(String);

impl RefreshDigest {
    pub fn of(refresh_token: &str) -> Self {
        Self(sha256_hex(refresh_token.as_bytes()))
    }

    /// Value read back from storage
    pub fn from_db(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for RefreshDigest {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(self.0.as_bytes(), other.0.as_bytes())
    }
}

impl fmt::Debug for RefreshDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefreshDigest").field(&"[DIGEST]").finish()
    }
}
