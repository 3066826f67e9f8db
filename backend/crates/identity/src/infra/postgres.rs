//! PostgreSQL Repository Implementation
//!
//! Expects an `accounts` table managed outside this crate:
//!
//! ```sql
//! CREATE TABLE accounts (
//!     account_id     UUID PRIMARY KEY,
//!     email          TEXT,
//!     phone          TEXT,
//!     password_hash  TEXT NOT NULL,
//!     salt           TEXT NOT NULL,
//!     role           TEXT NOT NULL DEFAULT 'user',
//!     first_name     VARCHAR(100),
//!     last_name      VARCHAR(100),
//!     address        VARCHAR(255),
//!     refresh_digest TEXT,
//!     deleted        BOOLEAN NOT NULL DEFAULT FALSE,
//!     created_at     TIMESTAMPTZ NOT NULL,
//!     updated_at     TIMESTAMPTZ NOT NULL,
//!     CHECK (email IS NOT NULL OR phone IS NOT NULL)
//! );
//! CREATE UNIQUE INDEX accounts_email_active_key ON accounts (email) WHERE NOT deleted;
//! CREATE UNIQUE INDEX accounts_phone_active_key ON accounts (phone) WHERE NOT deleted;
//! ```

use chrono::{DateTime, Utc};
use kernel::id::AccountId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::{Account, AccountPatch, AccountProfile};
use crate::domain::repository::AccountRepository;
use crate::domain::service::conflict::RegistrationConflict;
use crate::domain::value_object::{
    AccountPassword, AccountRole, AccountSalt, Email, Identifier, Phone, RefreshDigest,
};
use crate::error::{IdentityError, IdentityResult};

const EMAIL_UNIQUE_INDEX: &str = "accounts_email_active_key";
const PHONE_UNIQUE_INDEX: &str = "accounts_phone_active_key";

const SELECT_ACCOUNT: &str = r#"
    SELECT
        account_id,
        email,
        phone,
        password_hash,
        salt,
        role,
        first_name,
        last_name,
        address,
        refresh_digest,
        deleted,
        created_at,
        updated_at
    FROM accounts
"#;

/// Live rows first, then the most recently touched
const PREFER_LIVE: &str = "ORDER BY deleted ASC, updated_at DESC LIMIT 1";

/// PostgreSQL-backed account repository
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl AccountRepository for PgAccountRepository {
    async fn find_by_identifier(
        &self,
        identifier: &Identifier,
        include_deleted: bool,
    ) -> IdentityResult<Option<Account>> {
        let column = match identifier {
            Identifier::Email(_) => "email",
            Identifier::Phone(_) => "phone",
        };
        let sql = format!(
            "{SELECT_ACCOUNT} WHERE {column} = $1 AND ($2 OR NOT deleted) {PREFER_LIVE}"
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(identifier.as_str())
            .bind(include_deleted)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AccountRow::into_account).transpose()
    }

    async fn find_by_either_identifier(
        &self,
        email: Option<&Email>,
        phone: Option<&Phone>,
        include_deleted: bool,
    ) -> IdentityResult<Option<Account>> {
        let sql = format!(
            "{SELECT_ACCOUNT} WHERE (email = $1 OR phone = $2) AND ($3 OR NOT deleted) {PREFER_LIVE}"
        );

        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(email.map(Email::as_str))
            .bind(phone.map(Phone::as_str))
            .bind(include_deleted)
            .fetch_optional(&self.pool)
            .await?;

        row.map(AccountRow::into_account).transpose()
    }

    async fn create(&self, account: &Account) -> IdentityResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                account_id,
                email,
                phone,
                password_hash,
                salt,
                role,
                first_name,
                last_name,
                address,
                refresh_digest,
                deleted,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(account.account_id.as_uuid())
        .bind(account.email.as_ref().map(Email::as_str))
        .bind(account.phone.as_ref().map(Phone::as_str))
        .bind(account.password.as_phc_string())
        .bind(account.salt.as_str())
        .bind(account.role.code())
        .bind(account.profile.first_name.as_deref())
        .bind(account.profile.last_name.as_deref())
        .bind(account.profile.address.as_deref())
        .bind(account.refresh_digest.as_ref().map(RefreshDigest::as_str))
        .bind(account.deleted)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(())
    }

    async fn set_refresh_digest(
        &self,
        account_id: &AccountId,
        digest: Option<&RefreshDigest>,
    ) -> IdentityResult<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE accounts SET
                refresh_digest = $2,
                updated_at = now()
            WHERE account_id = $1 AND NOT deleted
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(digest.map(RefreshDigest::as_str))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }

    async fn swap_refresh_digest(
        &self,
        account_id: &AccountId,
        expected: &RefreshDigest,
        replacement: &RefreshDigest,
    ) -> IdentityResult<bool> {
        // The row lock makes a concurrent swap re-check the WHERE clause
        // against the committed digest
        let updated = sqlx::query(
            r#"
            UPDATE accounts SET
                refresh_digest = $3,
                updated_at = now()
            WHERE account_id = $1 AND NOT deleted AND refresh_digest = $2
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(expected.as_str())
        .bind(replacement.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }

    async fn clear_refresh_digest(&self, account_id: &AccountId) -> IdentityResult<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE accounts SET
                refresh_digest = NULL,
                updated_at = now()
            WHERE account_id = $1 AND NOT deleted AND refresh_digest IS NOT NULL
            "#,
        )
        .bind(account_id.as_uuid())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }

    async fn set_deleted(&self, account_id: &AccountId, deleted: bool) -> IdentityResult<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE accounts SET
                deleted = $2,
                refresh_digest = CASE WHEN $2 THEN NULL ELSE refresh_digest END,
                updated_at = now()
            WHERE account_id = $1 AND deleted <> $2
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(deleted)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?
        .rows_affected();

        Ok(updated == 1)
    }

    async fn update_fields(
        &self,
        account_id: &AccountId,
        patch: &AccountPatch,
    ) -> IdentityResult<bool> {
        let profile = patch.profile.as_ref();
        let updated = sqlx::query(
            r#"
            UPDATE accounts SET
                role = COALESCE($2, role),
                first_name = CASE WHEN $3 THEN $4 ELSE first_name END,
                last_name = CASE WHEN $3 THEN $5 ELSE last_name END,
                address = CASE WHEN $3 THEN $6 ELSE address END,
                updated_at = now()
            WHERE account_id = $1 AND NOT deleted
            "#,
        )
        .bind(account_id.as_uuid())
        .bind(patch.role.map(|role| role.code()))
        .bind(profile.is_some())
        .bind(profile.and_then(|p| p.first_name.as_deref()))
        .bind(profile.and_then(|p| p.last_name.as_deref()))
        .bind(profile.and_then(|p| p.address.as_deref()))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated == 1)
    }
}

/// Unique index violations become the matching registration conflict
fn map_unique_violation(err: sqlx::Error) -> IdentityError {
    let conflict = match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => match db.constraint() {
            Some(EMAIL_UNIQUE_INDEX) => Some(RegistrationConflict::Email),
            Some(PHONE_UNIQUE_INDEX) => Some(RegistrationConflict::Phone),
            _ => None,
        },
        _ => None,
    };

    match conflict {
        Some(conflict) => IdentityError::Conflict(conflict),
        None => IdentityError::Database(err),
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    account_id: Uuid,
    email: Option<String>,
    phone: Option<String>,
    password_hash: String,
    salt: String,
    role: String,
    first_name: Option<String>,
    last_name: Option<String>,
    address: Option<String>,
    refresh_digest: Option<String>,
    deleted: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self) -> IdentityResult<Account> {
        let password = AccountPassword::from_db(self.password_hash)
            .map_err(|e| IdentityError::Internal(format!("Invalid password hash: {}", e)))?;
        let role = AccountRole::from_code(&self.role)
            .ok_or_else(|| IdentityError::Internal(format!("Invalid role: {}", self.role)))?;

        Ok(Account {
            account_id: AccountId::from_uuid(self.account_id),
            email: self.email.map(Email::from_db),
            phone: self.phone.map(Phone::from_db),
            password,
            salt: AccountSalt::from_db(self.salt),
            role,
            profile: AccountProfile {
                first_name: self.first_name,
                last_name: self.last_name,
                address: self.address,
            },
            refresh_digest: self.refresh_digest.map(RefreshDigest::from_db),
            deleted: self.deleted,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
