//! Account Password Value Object
//!
//! Stored Argon2id hash of `password || salt`.

use kernel::error::app_error::{AppError, AppResult};
use platform::password::{ClearTextPassword, HashedPassword};

use super::account_salt::AccountSalt;

/// Clear text password supplied by a client
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// A newly chosen password; the strength policy applies
    pub fn chosen(raw: String) -> AppResult<Self> {
        ClearTextPassword::new(raw)
            .map(Self)
            .map_err(|e| AppError::bad_request(e.to_string()))
    }

    /// A password presented at login; only normalized
    pub fn presented(raw: String) -> AppResult<Self> {
        ClearTextPassword::presented(raw)
            .map(Self)
            .map_err(|e| AppError::bad_request(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPassword(HashedPassword);

impl AccountPassword {
    pub fn hash(raw: &RawPassword, salt: &AccountSalt) -> AppResult<Self> {
        raw.0
            .hash(salt.as_bytes())
            .map(Self)
            .map_err(|e| AppError::internal(e.to_string()))
    }

    /// PHC string read back from storage
    pub fn from_db(phc: impl Into<String>) -> AppResult<Self> {
        HashedPassword::from_phc_string(phc)
            .map(Self)
            .map_err(|e| AppError::internal(e.to_string()))
    }

    pub fn as_phc_string(&self) -> &str {
        self.0.as_phc_string()
    }

    pub fn verify(&self, raw: &RawPassword, salt: &AccountSalt) -> bool {
        self.0.verify(&raw.0, salt.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_binds_account_salt() {
        let salt = AccountSalt::generate();
        let raw = RawPassword::chosen("Ocean-Breeze-77".to_string()).unwrap();
        let hashed = AccountPassword::hash(&raw, &salt).unwrap();

        assert!(hashed.verify(&raw, &salt));
        assert!(!hashed.verify(&raw, &AccountSalt::generate()));
    }

    #[test]
    fn test_policy_only_on_chosen() {
        assert!(RawPassword::chosen("short".to_string()).is_err());
        assert!(RawPassword::presented("short".to_string()).is_ok());
        assert!(RawPassword::presented("   ".to_string()).is_err());
    }
}
