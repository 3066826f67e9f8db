//! Logout Use Case

use std::sync::Arc;

use kernel::id::AccountId;

use crate::domain::repository::AccountRepository;
use crate::domain::value_object::Identifier;
use crate::error::{IdentityError, IdentityResult};

/// Logout use case
pub struct LogoutUseCase<R>
where
    R: AccountRepository,
{
    repo: Arc<R>,
}

impl<R> LogoutUseCase<R>
where
    R: AccountRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Clear the account's refresh session
    ///
    /// `AlreadyLoggedOut` when there was none; callers may treat that as
    /// success.
    pub async fn execute(&self, identifier: &Identifier) -> IdentityResult<AccountId> {
        let account = self
            .repo
            .find_by_identifier(identifier, false)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        if !account.is_logged_in() {
            return Err(IdentityError::AlreadyLoggedOut);
        }

        // A concurrent logout may have won
        if !self.repo.clear_refresh_digest(&account.account_id).await? {
            return Err(IdentityError::AlreadyLoggedOut);
        }

        tracing::info!(account_id = %account.account_id, "Account logged out");

        Ok(account.account_id)
    }
}
