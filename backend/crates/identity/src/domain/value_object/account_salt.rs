//! Account Salt
//!
//! Random per-account secret, fixed at creation. It is appended to the
//! password before hashing and is the HMAC key for every token issued to the
//! account, so it must never leave the server.

use std::fmt;

use uuid::Uuid;

#[derive(Clone, PartialEq, Eq)]
pub struct AccountSalt(String);

impl AccountSalt {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Value read back from storage
    pub fn from_db(salt: impl Into<String>) -> Self {
        Self(salt.into())
    }

    /// Key material for hashing and signing
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccountSalt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccountSalt").field(&"[REDACTED]").finish()
    }
}
