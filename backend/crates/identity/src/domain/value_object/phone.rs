//! Phone Value Object
//!
//! Secondary account identifier. Separators are stripped so that
//! `+1 (555) 010-2030` and `+15550102030` name the same account.

use derive_more::Display;
use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// E.164 allows at most 15 digits
const PHONE_MAX_DIGITS: usize = 15;
const PHONE_MIN_DIGITS: usize = 7;

#[derive(Debug, Display, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Phone(String);

impl Phone {
    pub fn new(raw: impl AsRef<str>) -> AppResult<Self> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(AppError::bad_request("Phone number cannot be empty"));
        }

        let (plus, rest) = match raw.strip_prefix('+') {
            Some(rest) => ("+", rest),
            None => ("", raw),
        };

        let mut digits = String::with_capacity(rest.len());
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(AppError::bad_request("Invalid phone number format")),
            }
        }

        if !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits.len()) {
            return Err(AppError::bad_request(format!(
                "Phone number must have {PHONE_MIN_DIGITS} to {PHONE_MAX_DIGITS} digits"
            )));
        }

        Ok(Self(format!("{plus}{digits}")))
    }

    /// Value read back from storage
    pub fn from_db(phone: impl Into<String>) -> Self {
        Self(phone.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_normalized() {
        let phone = Phone::new(" +1 (555) 010-2030 ").unwrap();
        assert_eq!(phone.as_str(), "+15550102030");

        let phone = Phone::new("98765.43210").unwrap();
        assert_eq!(phone.as_str(), "9876543210");
    }

    #[test]
    fn test_phone_same_number_different_format() {
        assert_eq!(
            Phone::new("+91 98765 43210").unwrap(),
            Phone::new("+91-98765-43210").unwrap()
        );
    }

    #[test]
    fn test_phone_invalid() {
        for raw in ["", "123456", "1234567890123456", "555-CALL-NOW", "++15550102030"] {
            assert!(Phone::new(raw).is_err(), "{raw:?} should be rejected");
        }
    }
}
