//! Identifier Value Object
//!
//! Either identifier an account can be looked up by. Login, activation and
//! token subjects accept a free-form string: anything containing `@` is read
//! as an email, everything else as a phone number.

use derive_more::Display;
use kernel::error::app_error::AppResult;

use super::{email::Email, phone::Phone};

#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Email(Email),
    Phone(Phone),
}

impl Identifier {
    pub fn parse(raw: impl AsRef<str>) -> AppResult<Self> {
        let raw = raw.as_ref();
        if raw.contains('@') {
            Email::new(raw).map(Identifier::Email)
        } else {
            Phone::new(raw).map(Identifier::Phone)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Email(email) => email.as_str(),
            Identifier::Phone(phone) => phone.as_str(),
        }
    }

    /// Split into the `(email, phone)` lookup pair
    pub fn as_pair(&self) -> (Option<&Email>, Option<&Phone>) {
        match self {
            Identifier::Email(email) => (Some(email), None),
            Identifier::Phone(phone) => (None, Some(phone)),
        }
    }
}

impl From<Email> for Identifier {
    fn from(email: Email) -> Self {
        Identifier::Email(email)
    }
}

impl From<Phone> for Identifier {
    fn from(phone: Phone) -> Self {
        Identifier::Phone(phone)
    }
}
