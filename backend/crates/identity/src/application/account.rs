//! Account Use Case
//!
//! Operations an authenticated caller performs on accounts: read and edit
//! their own profile, deactivate themselves, and (admins only) change roles.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::id::AccountId;

use crate::application::authenticate::AuthenticatedAccount;
use crate::domain::entity::{Account, AccountPatch, AccountProfile};
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::{AccountRole, Identifier};
use crate::error::{IdentityError, IdentityResult};

/// Non-secret view of an account
#[derive(Debug, Clone)]
pub struct AccountView {
    pub account_id: AccountId,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: AccountRole,
    pub profile: AccountProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            account_id: account.account_id,
            email: account.email.map(|e| e.as_str().to_string()),
            phone: account.phone.map(|p| p.as_str().to_string()),
            role: account.role,
            profile: account.profile,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Profile update input
pub struct UpdateProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
}

/// Account use case
pub struct AccountUseCase<R>
where
    R: AccountRepository,
{
    repo: Arc<R>,
}

impl<R> AccountUseCase<R>
where
    R: AccountRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn profile(&self, caller: &AuthenticatedAccount) -> IdentityResult<AccountView> {
        self.load(caller).await.map(AccountView::from)
    }

    pub async fn update_profile(
        &self,
        caller: &AuthenticatedAccount,
        input: UpdateProfileInput,
    ) -> IdentityResult<AccountView> {
        let profile = AccountProfile::new(input.first_name, input.last_name, input.address)?;
        let patch = AccountPatch::profile(profile);

        let mut account = self.load(caller).await?;
        if !self.repo.update_fields(&account.account_id, &patch).await? {
            return Err(IdentityError::AccountNotFound);
        }
        patch.apply(&mut account);

        tracing::info!(account_id = %account.account_id, "Profile updated");

        Ok(account.into())
    }

    /// Admin only
    pub async fn update_role(
        &self,
        caller: &AuthenticatedAccount,
        target: &str,
        role: &str,
    ) -> IdentityResult<AccountView> {
        if !caller.role.is_admin() {
            tracing::warn!(account_id = %caller.account_id, "Role change by non-admin");
            return Err(IdentityError::Forbidden);
        }

        let target = Identifier::parse(target)?;
        let role: AccountRole = role.parse()?;
        let patch = AccountPatch::role(role);

        let mut account = self
            .repo
            .find_by_identifier(&target, false)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;
        if !self.repo.update_fields(&account.account_id, &patch).await? {
            return Err(IdentityError::AccountNotFound);
        }
        patch.apply(&mut account);

        tracing::info!(
            account_id = %account.account_id,
            role = %role,
            by = %caller.account_id,
            "Role updated"
        );

        Ok(account.into())
    }

    /// Soft-delete the caller's own account and end its session
    pub async fn deactivate(&self, caller: &AuthenticatedAccount) -> IdentityResult<AccountId> {
        let account = self
            .repo
            .find_by_identifier(&caller.identifier, false)
            .await?
            .filter(|account| account.account_id == caller.account_id)
            .ok_or(IdentityError::AlreadyDeactivated)?;

        if !self.repo.set_deleted(&account.account_id, true).await? {
            return Err(IdentityError::AlreadyDeactivated);
        }

        tracing::info!(account_id = %account.account_id, "Account deactivated");

        Ok(account.account_id)
    }

    async fn load(&self, caller: &AuthenticatedAccount) -> IdentityResult<Account> {
        self.repo
            .find_by_identifier(&caller.identifier, false)
            .await?
            .filter(|account| account.account_id == caller.account_id)
            .ok_or(IdentityError::AccountNotFound)
    }
}
