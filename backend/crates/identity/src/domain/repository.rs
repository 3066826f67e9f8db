//! Repository Traits
//!
//! The record store the identity core reads and mutates. Implementations live
//! in the infrastructure layer.

use kernel::id::AccountId;

use crate::domain::entity::{Account, AccountPatch};
use crate::domain::value_object::{Email, Identifier, Phone, RefreshDigest};
use crate::error::IdentityResult;

/// Account record store
///
/// Identifier uniqueness only holds among non-deleted accounts. When
/// `include_deleted` is set and both a live and a deleted account match, the
/// live one is returned.
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
        include_deleted: bool,
    ) -> IdentityResult<Option<Account>>;

    /// Match on the email or the phone, whichever is supplied
    async fn find_by_either_identifier(
        &self,
        email: Option<&Email>,
        phone: Option<&Phone>,
        include_deleted: bool,
    ) -> IdentityResult<Option<Account>>;

    /// Insert a new account
    ///
    /// Fails with `IdentityError::Conflict` if a live account already holds
    /// either identifier.
    async fn create(&self, account: &Account) -> IdentityResult<()>;

    /// Overwrite the refresh digest unconditionally
    async fn set_refresh_digest(
        &self,
        account_id: &AccountId,
        digest: Option<&RefreshDigest>,
    ) -> IdentityResult<bool>;

    /// Atomically replace `expected` with `replacement`
    ///
    /// Returns `false` if the stored digest was not `expected` at the time of
    /// the write; at most one of several concurrent swaps from the same
    /// digest can succeed.
    async fn swap_refresh_digest(
        &self,
        account_id: &AccountId,
        expected: &RefreshDigest,
        replacement: &RefreshDigest,
    ) -> IdentityResult<bool>;

    /// Atomically clear the refresh digest; `false` if it was already empty
    async fn clear_refresh_digest(&self, account_id: &AccountId) -> IdentityResult<bool>;

    /// `false` if the flag already had this value
    ///
    /// Deleting also clears the refresh digest in the same write, so a
    /// deleted account never holds a live session.
    async fn set_deleted(&self, account_id: &AccountId, deleted: bool) -> IdentityResult<bool>;

    /// Apply role / profile changes to a non-deleted account
    async fn update_fields(
        &self,
        account_id: &AccountId,
        patch: &AccountPatch,
    ) -> IdentityResult<bool>;
}
