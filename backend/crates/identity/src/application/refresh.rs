//! Refresh Use Case
//!
//! Exchanges the current refresh token for a new pair. Each refresh token is
//! single-use: the stored digest is swapped atomically, so a replayed or
//! concurrently reused token fails with `TokenRevoked`.

use std::sync::Arc;

use kernel::id::AccountId;

use crate::application::config::IdentityConfig;
use crate::application::session::{self, SessionTokens};
use crate::domain::repository::AccountRepository;
use crate::domain::service::token;
use crate::domain::value_object::{Identifier, RefreshDigest};
use crate::error::{IdentityError, IdentityResult};

/// Refresh output
#[derive(Debug)]
pub struct RefreshOutput {
    pub account_id: AccountId,
    pub tokens: SessionTokens,
}

/// Refresh use case
pub struct RefreshUseCase<R>
where
    R: AccountRepository,
{
    repo: Arc<R>,
    config: Arc<IdentityConfig>,
}

impl<R> RefreshUseCase<R>
where
    R: AccountRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, refresh_token: &str) -> IdentityResult<RefreshOutput> {
        let claimed = token::read_unverified_subject(refresh_token)?;
        let identifier = claimed
            .lookup_identifier()
            .ok_or(IdentityError::AccountNotFound)?;

        let account = self
            .repo
            .find_by_identifier(&identifier, false)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        let account_id = account.account_id;
        let repo = self.repo.as_ref();
        let claims = token::verify_with(refresh_token, &account.salt, |subject| async move {
            still_active(repo, &subject, &account_id).await
        })
        .await?;

        let presented = RefreshDigest::of(refresh_token);
        if account.refresh_digest.as_ref() != Some(&presented) {
            tracing::warn!(account_id = %account_id, "Stale refresh token presented");
            return Err(IdentityError::TokenRevoked);
        }

        let (tokens, digest) = session::issue(&account, &self.config, Some(claims.expiry()))?;

        if !self
            .repo
            .swap_refresh_digest(&account_id, &presented, &digest)
            .await?
        {
            // Lost the race to a concurrent refresh or logout
            tracing::warn!(account_id = %account_id, "Refresh token rotated concurrently");
            return Err(IdentityError::TokenRevoked);
        }

        tracing::info!(account_id = %account_id, "Session refreshed");

        Ok(RefreshOutput { account_id, tokens })
    }
}

/// The verified subject still names the same non-deleted account
pub(crate) async fn still_active<R>(
    repo: &R,
    subject: &str,
    account_id: &AccountId,
) -> IdentityResult<bool>
where
    R: AccountRepository,
{
    let Ok(identifier) = Identifier::parse(subject) else {
        return Ok(false);
    };
    let current = repo.find_by_identifier(&identifier, false).await?;
    Ok(current.is_some_and(|account| account.account_id == *account_id))
}
