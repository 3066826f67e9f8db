//! In-memory account store
//!
//! Backs tests and local runs without a database. Every operation takes the
//! write lock for its whole read-modify-write, which gives the same
//! compare-and-set guarantees as the conditional updates in PostgreSQL.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use kernel::id::AccountId;
use tokio::sync::RwLock;

use crate::domain::entity::{Account, AccountPatch};
use crate::domain::repository::AccountRepository;
use crate::domain::service::conflict::RegistrationConflict;
use crate::domain::value_object::{Email, Identifier, Phone, RefreshDigest};
use crate::error::{IdentityError, IdentityResult};

#[derive(Clone, Default)]
pub struct InMemoryAccountRepository {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }

    /// Live matches first, then the most recently updated
    fn best_match<'a>(
        accounts: impl Iterator<Item = &'a Account>,
        include_deleted: bool,
    ) -> Option<Account> {
        accounts
            .filter(|a| include_deleted || !a.deleted)
            .min_by_key(|a| (a.deleted, std::cmp::Reverse(a.updated_at)))
            .cloned()
    }

    /// Run `f` on a live account; `false` if there is none
    async fn with_live_account(
        &self,
        account_id: &AccountId,
        f: impl FnOnce(&mut Account) -> bool,
    ) -> bool {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(account_id) {
            Some(account) if !account.deleted => {
                let changed = f(account);
                if changed {
                    account.updated_at = Utc::now();
                }
                changed
            }
            _ => false,
        }
    }
}

impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
        include_deleted: bool,
    ) -> IdentityResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(Self::best_match(
            accounts.values().filter(|a| a.matches(identifier)),
            include_deleted,
        ))
    }

    async fn find_by_either_identifier(
        &self,
        email: Option<&Email>,
        phone: Option<&Phone>,
        include_deleted: bool,
    ) -> IdentityResult<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(Self::best_match(
            accounts.values().filter(|a| {
                (email.is_some() && a.email.as_ref() == email)
                    || (phone.is_some() && a.phone.as_ref() == phone)
            }),
            include_deleted,
        ))
    }

    async fn create(&self, account: &Account) -> IdentityResult<()> {
        let mut accounts = self.accounts.write().await;

        let live = || accounts.values().filter(|a| !a.deleted);
        let email_taken = account.email.is_some()
            && live().any(|a| a.email.is_some() && a.email == account.email);
        let phone_taken = account.phone.is_some()
            && live().any(|a| a.phone.is_some() && a.phone == account.phone);

        match (email_taken, phone_taken) {
            (true, true) => Err(IdentityError::Conflict(RegistrationConflict::EmailAndPhone)),
            (true, false) => Err(IdentityError::Conflict(RegistrationConflict::Email)),
            (false, true) => Err(IdentityError::Conflict(RegistrationConflict::Phone)),
            (false, false) => {
                accounts.insert(account.account_id, account.clone());
                Ok(())
            }
        }
    }

    async fn set_refresh_digest(
        &self,
        account_id: &AccountId,
        digest: Option<&RefreshDigest>,
    ) -> IdentityResult<bool> {
        Ok(self
            .with_live_account(account_id, |account| {
                account.refresh_digest = digest.cloned();
                true
            })
            .await)
    }

    async fn swap_refresh_digest(
        &self,
        account_id: &AccountId,
        expected: &RefreshDigest,
        replacement: &RefreshDigest,
    ) -> IdentityResult<bool> {
        Ok(self
            .with_live_account(account_id, |account| {
                if account.refresh_digest.as_ref() != Some(expected) {
                    return false;
                }
                account.refresh_digest = Some(replacement.clone());
                true
            })
            .await)
    }

    async fn clear_refresh_digest(&self, account_id: &AccountId) -> IdentityResult<bool> {
        Ok(self
            .with_live_account(account_id, |account| account.refresh_digest.take().is_some())
            .await)
    }

    async fn set_deleted(&self, account_id: &AccountId, deleted: bool) -> IdentityResult<bool> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(account_id) {
            Some(account) if account.deleted != deleted => {
                account.deleted = deleted;
                if deleted {
                    account.refresh_digest = None;
                }
                account.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_fields(
        &self,
        account_id: &AccountId,
        patch: &AccountPatch,
    ) -> IdentityResult<bool> {
        Ok(self
            .with_live_account(account_id, |account| {
                patch.apply(account);
                true
            })
            .await)
    }
}
