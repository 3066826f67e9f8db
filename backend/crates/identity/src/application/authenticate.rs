//! Authenticate Use Case
//!
//! Resolves a bearer access token to the account it was issued to.

use std::sync::Arc;

use kernel::id::AccountId;

use crate::application::refresh::still_active;
use crate::domain::repository::AccountRepository;
use crate::domain::service::token;
use crate::domain::value_object::{AccountRole, Identifier};
use crate::error::{IdentityError, IdentityResult, TokenError};

/// Caller of a protected operation, established from a verified token
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account_id: AccountId,
    pub identifier: Identifier,
    pub role: AccountRole,
    /// Whether the account currently holds a refresh session
    pub logged_in: bool,
}

/// Authenticate use case
pub struct AuthenticateUseCase<R>
where
    R: AccountRepository,
{
    repo: Arc<R>,
}

impl<R> AuthenticateUseCase<R>
where
    R: AccountRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Verified caller with an active session
    ///
    /// Access tokens outlive logout until they expire; this rejects them as
    /// soon as the session is gone.
    pub async fn execute(&self, access_token: &str) -> IdentityResult<AuthenticatedAccount> {
        let account = self.identify(access_token).await?;
        if !account.logged_in {
            return Err(IdentityError::SessionExpired);
        }
        Ok(account)
    }

    /// Verified caller, whether or not a session is active
    pub async fn identify(&self, access_token: &str) -> IdentityResult<AuthenticatedAccount> {
        let claimed = token::read_unverified_subject(access_token)?;
        let identifier = claimed
            .lookup_identifier()
            .ok_or(TokenError::ValidationRejected)?;

        let account = self
            .repo
            .find_by_identifier(&identifier, false)
            .await?
            .ok_or(TokenError::ValidationRejected)?;

        let account_id = account.account_id;
        let repo = self.repo.as_ref();
        token::verify_with(access_token, &account.salt, |subject| async move {
            still_active(repo, &subject, &account_id).await
        })
        .await?;

        Ok(AuthenticatedAccount {
            account_id,
            identifier,
            role: account.role,
            logged_in: account.is_logged_in(),
        })
    }
}
