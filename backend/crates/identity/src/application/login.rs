//! Login Use Case
//!
//! Verifies credentials and starts a session. A previous session of the same
//! account is replaced.

use std::sync::Arc;

use kernel::id::AccountId;

use crate::application::config::IdentityConfig;
use crate::application::session::{self, SessionTokens};
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::{AccountRole, Identifier, RawPassword};
use crate::error::{IdentityError, IdentityResult};

/// Login input
pub struct LoginInput {
    /// Email or phone number
    pub identifier: String,
    pub password: String,
}

/// Login output
#[derive(Debug)]
pub struct LoginOutput {
    pub account_id: AccountId,
    pub role: AccountRole,
    pub tokens: SessionTokens,
}

/// Login use case
pub struct LoginUseCase<R>
where
    R: AccountRepository,
{
    repo: Arc<R>,
    config: Arc<IdentityConfig>,
}

impl<R> LoginUseCase<R>
where
    R: AccountRepository,
{
    pub fn new(repo: Arc<R>, config: Arc<IdentityConfig>) -> Self {
        Self { repo, config }
    }

    pub async fn execute(&self, input: LoginInput) -> IdentityResult<LoginOutput> {
        let identifier = Identifier::parse(&input.identifier)?;
        let password = RawPassword::presented(input.password)?;

        let (email, phone) = identifier.as_pair();
        let account = self
            .repo
            .find_by_either_identifier(email, phone, false)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        if !account.password.verify(&password, &account.salt) {
            tracing::warn!(account_id = %account.account_id, "Password mismatch");
            return Err(IdentityError::InvalidCredentials);
        }

        // Mint before writing anything
        let (tokens, digest) = session::issue(&account, &self.config, None)?;

        if !self
            .repo
            .set_refresh_digest(&account.account_id, Some(&digest))
            .await?
        {
            // Deactivated between lookup and write
            return Err(IdentityError::AccountNotFound);
        }

        tracing::info!(
            account_id = %account.account_id,
            role = %account.role,
            "Account logged in"
        );

        Ok(LoginOutput {
            account_id: account.account_id,
            role: account.role,
            tokens,
        })
    }
}
