//! Account Entity
//!
//! ```text
//! LoggedOut (refresh_digest = None) <-> LoggedIn (refresh_digest = Some)
//! ```
//!
//! Accounts are never removed; `deleted` hides them from login and frees
//! their identifiers for new registrations until they are reactivated.

use chrono::{DateTime, Utc};
use kernel::error::app_error::{AppError, AppResult};
use kernel::id::AccountId;

use crate::domain::value_object::{
    AccountPassword, AccountRole, AccountSalt, Email, Identifier, Phone, RefreshDigest,
};

const NAME_MAX_LENGTH: usize = 100;
const ADDRESS_MAX_LENGTH: usize = 255;

/// Optional personal details captured at registration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
}

impl AccountProfile {
    pub fn new(
        first_name: Option<String>,
        last_name: Option<String>,
        address: Option<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            first_name: bounded("First name", first_name, NAME_MAX_LENGTH)?,
            last_name: bounded("Last name", last_name, NAME_MAX_LENGTH)?,
            address: bounded("Address", address, ADDRESS_MAX_LENGTH)?,
        })
    }
}

/// Trim, drop blanks and enforce a length limit
fn bounded(field: &str, value: Option<String>, max: usize) -> AppResult<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if value.chars().count() > max {
        return Err(AppError::bad_request(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(Some(value.to_string()))
}

#[derive(Debug, Clone)]
pub struct Account {
    pub account_id: AccountId,
    pub email: Option<Email>,
    pub phone: Option<Phone>,
    pub password: AccountPassword,
    /// Immutable after creation
    pub salt: AccountSalt,
    pub role: AccountRole,
    pub profile: AccountProfile,
    pub refresh_digest: Option<RefreshDigest>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// New active account with the default role and no session
    ///
    /// At least one identifier is required.
    pub fn register(
        email: Option<Email>,
        phone: Option<Phone>,
        password: AccountPassword,
        salt: AccountSalt,
        profile: AccountProfile,
    ) -> Option<Self> {
        if email.is_none() && phone.is_none() {
            return None;
        }

        let now = Utc::now();
        Some(Self {
            account_id: AccountId::new(),
            email,
            phone,
            password,
            salt,
            role: AccountRole::default(),
            profile,
            refresh_digest: None,
            deleted: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Token subject: the email, or the phone when there is no email
    pub fn subject(&self) -> Option<&str> {
        self.email
            .as_ref()
            .map(Email::as_str)
            .or_else(|| self.phone.as_ref().map(Phone::as_str))
    }

    pub fn matches(&self, identifier: &Identifier) -> bool {
        match identifier {
            Identifier::Email(email) => self.email.as_ref() == Some(email),
            Identifier::Phone(phone) => self.phone.as_ref() == Some(phone),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.refresh_digest.is_some()
    }
}

/// Partial update applied through the record store
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub role: Option<AccountRole>,
    pub profile: Option<AccountProfile>,
}

impl AccountPatch {
    pub fn role(role: AccountRole) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    pub fn profile(profile: AccountProfile) -> Self {
        Self {
            profile: Some(profile),
            ..Default::default()
        }
    }

    pub fn apply(&self, account: &mut Account) {
        if let Some(role) = self.role {
            account.role = role;
        }
        if let Some(profile) = &self.profile {
            account.profile = profile.clone();
        }
        account.updated_at = Utc::now();
    }
}
