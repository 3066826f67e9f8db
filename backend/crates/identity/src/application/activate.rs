//! Activate Use Case
//!
//! Clears the soft-delete flag of an account. Gating (e.g. an emailed link)
//! happens before this is called; the password is not re-checked.

use std::sync::Arc;

use kernel::id::AccountId;

use crate::domain::entity::Account;
use crate::domain::repository::AccountRepository;
use crate::domain::service::conflict::RegistrationConflict;
use crate::domain::value_object::Identifier;
use crate::error::{IdentityError, IdentityResult};

/// Activate use case
pub struct ActivateUseCase<R>
where
    R: AccountRepository,
{
    repo: Arc<R>,
}

impl<R> ActivateUseCase<R>
where
    R: AccountRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, identifier: &str) -> IdentityResult<AccountId> {
        let identifier = Identifier::parse(identifier)?;
        let (email, phone) = identifier.as_pair();

        let account = self
            .repo
            .find_by_either_identifier(email, phone, true)
            .await?
            .ok_or(IdentityError::NoSuchAccount)?;

        if !account.deleted {
            return Err(IdentityError::AlreadyActive);
        }

        self.ensure_identifiers_free(&account).await?;

        if !self.repo.set_deleted(&account.account_id, false).await? {
            return Err(IdentityError::AlreadyActive);
        }

        tracing::info!(account_id = %account.account_id, "Account activated");

        Ok(account.account_id)
    }

    /// A deleted account's other identifier may have been taken since
    async fn ensure_identifiers_free(&self, account: &Account) -> IdentityResult<()> {
        let mut email_taken = false;
        if let Some(email) = &account.email {
            email_taken = self.is_held_by_other(account, email.clone().into()).await?;
        }
        let mut phone_taken = false;
        if let Some(phone) = &account.phone {
            phone_taken = self.is_held_by_other(account, phone.clone().into()).await?;
        }

        match (email_taken, phone_taken) {
            (false, false) => Ok(()),
            (true, true) => Err(IdentityError::Conflict(RegistrationConflict::EmailAndPhone)),
            (true, false) => Err(IdentityError::Conflict(RegistrationConflict::Email)),
            (false, true) => Err(IdentityError::Conflict(RegistrationConflict::Phone)),
        }
    }

    async fn is_held_by_other(
        &self,
        account: &Account,
        identifier: Identifier,
    ) -> IdentityResult<bool> {
        let live = self.repo.find_by_identifier(&identifier, false).await?;
        Ok(live.is_some_and(|other| other.account_id != account.account_id))
    }
}
