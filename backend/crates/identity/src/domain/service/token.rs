//! Session Token Service
//!
//! Compact JWS (`header.payload.signature`, HS256) carrying two claims:
//! `username` (the account subject) and `expiry` (unix seconds).
//!
//! Every token is signed with the salt of the account it names, so there is
//! no process-wide key. Verification is two-phase:
//!
//! 1. [`read_unverified_subject`] yields a [`ClaimedSubject`], which is only
//!    good for finding the account whose salt to verify with.
//! 2. [`verify`] / [`verify_with`] check the signature against that salt and
//!    yield [`VerifiedClaims`], the only type that carries a trusted subject.

use std::future::Future;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, dangerous, decode, decode_header,
    encode,
};
use serde::{Deserialize, Serialize};

use crate::domain::value_object::{AccountSalt, Identifier};
use crate::error::TokenError;

pub const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    username: String,
    expiry: i64,
}

/// Only the subject; nothing else is read before verification
#[derive(Debug, Clone, Deserialize)]
struct UnverifiedClaims {
    #[serde(default)]
    username: String,
}

/// Subject read from a token whose signature has not been checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedSubject(String);

impl ClaimedSubject {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier to look the signing account up by
    pub fn lookup_identifier(&self) -> Option<Identifier> {
        Identifier::parse(&self.0).ok()
    }
}

/// Claims of a token whose signature and expiry have been checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedClaims {
    subject: String,
    expiry: i64,
}

impl VerifiedClaims {
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Unix seconds
    pub fn expiry(&self) -> i64 {
        self.expiry
    }
}

/// Sign a token for `subject` that expires `ttl` from now
pub fn mint(subject: &str, salt: &AccountSalt, ttl: Duration) -> Result<String, TokenError> {
    let expiry = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| TokenError::Signing("expiry out of range".to_string()))?
        .timestamp();
    mint_expiring_at(subject, salt, expiry)
}

/// Sign a token for `subject` that expires at `expiry` (unix seconds)
///
/// Claims are deterministic: the same subject, salt and expiry always give
/// the same token.
pub fn mint_expiring_at(
    subject: &str,
    salt: &AccountSalt,
    expiry: i64,
) -> Result<String, TokenError> {
    if subject.is_empty() {
        return Err(TokenError::InvalidClaims);
    }

    let claims = Claims {
        username: subject.to_string(),
        expiry,
    };
    encode(
        &Header::new(ALGORITHM),
        &claims,
        &EncodingKey::from_secret(salt.as_bytes()),
    )
    .map_err(|e| TokenError::Signing(e.to_string()))
}

/// Read the subject without checking the signature
///
/// Never a trust decision; always follow with [`verify`] or [`verify_with`].
pub fn read_unverified_subject(token: &str) -> Result<ClaimedSubject, TokenError> {
    ensure_compact(token)?;
    let data = dangerous::insecure_decode::<UnverifiedClaims>(token)
        .map_err(|_| TokenError::MalformedToken)?;

    let subject = data.claims.username;
    if subject.is_empty() {
        return Err(TokenError::MalformedToken);
    }
    Ok(ClaimedSubject(subject))
}

/// Check signature, claims and expiry against `salt`
pub fn verify(token: &str, salt: &AccountSalt) -> Result<VerifiedClaims, TokenError> {
    ensure_compact(token)?;

    // A readable header naming anything but HS256 is a signature failure
    let header = decode_header(token).map_err(|e| match e.kind() {
        ErrorKind::Json(_) => TokenError::InvalidSignature,
        _ => TokenError::MalformedToken,
    })?;
    if header.alg != ALGORITHM {
        return Err(TokenError::InvalidSignature);
    }

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(salt.as_bytes()),
        &validation(),
    )
    .map_err(decode_error)?;
    let claims = data.claims;
    if claims.username.is_empty() {
        return Err(TokenError::InvalidClaims);
    }

    if Utc::now().timestamp() > claims.expiry {
        return Err(TokenError::Expired);
    }

    Ok(VerifiedClaims {
        subject: claims.username,
        expiry: claims.expiry,
    })
}

/// [`verify`], then ask `validator` whether the subject is still acceptable
///
/// The validator runs only once signature and claims have passed; `Ok(false)`
/// fails with [`TokenError::ValidationRejected`].
pub async fn verify_with<F, Fut, E>(
    token: &str,
    salt: &AccountSalt,
    validator: F,
) -> Result<VerifiedClaims, E>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: From<TokenError>,
{
    let claims = verify(token, salt)?;
    if !validator(claims.subject.clone()).await? {
        return Err(TokenError::ValidationRejected.into());
    }
    Ok(claims)
}

/// Signature only; `expiry` is not a registered claim and is checked by hand
fn validation() -> Validation {
    let mut validation = Validation::new(ALGORITHM);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation
}

fn decode_error(err: JwtError) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
        ErrorKind::InvalidToken => TokenError::MalformedToken,
        _ => TokenError::InvalidClaims,
    }
}

/// Three non-empty dot-separated segments
fn ensure_compact(token: &str) -> Result<(), TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(TokenError::MalformedToken);
    }
    Ok(())
}
