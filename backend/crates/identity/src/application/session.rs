//! Session token issuance shared by login and refresh

use std::fmt;

use chrono::Utc;

use crate::application::config::IdentityConfig;
use crate::domain::entity::Account;
use crate::domain::service::token;
use crate::domain::value_object::RefreshDigest;
use crate::error::{IdentityError, IdentityResult};

/// Access + refresh token pair handed to the client
#[derive(Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Mint a fresh pair for `account` and the digest to record for it
///
/// `superseded_expiry` is the expiry of the refresh token being rotated out;
/// the new one always expires strictly later so the two never coincide.
/// Nothing is persisted here, so a minting failure leaves the account as it
/// was.
pub(crate) fn issue(
    account: &Account,
    config: &IdentityConfig,
    superseded_expiry: Option<i64>,
) -> IdentityResult<(SessionTokens, RefreshDigest)> {
    let subject = account.subject().ok_or_else(|| {
        IdentityError::Internal(format!("account {} has no identifier", account.account_id))
    })?;

    let access_token = token::mint(subject, &account.salt, config.access_ttl())?;
    let refresh_expiry = Utc::now()
        .checked_add_signed(config.refresh_ttl())
        .map(|at| at.timestamp())
        .ok_or_else(|| IdentityError::Internal("refresh expiry out of range".to_string()))?;
    let refresh_expiry = match superseded_expiry {
        Some(previous) => refresh_expiry.max(previous.saturating_add(1)),
        None => refresh_expiry,
    };
    let refresh_token = token::mint_expiring_at(subject, &account.salt, refresh_expiry)?;
    let digest = RefreshDigest::of(&refresh_token);

    Ok((
        SessionTokens {
            access_token,
            refresh_token,
        },
        digest,
    ))
}
