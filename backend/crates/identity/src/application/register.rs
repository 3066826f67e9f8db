//! Register Use Case
//!
//! Creates an account unless either identifier is already in use. Matches
//! against soft-deleted accounts are rejected with an activation hint; they
//! are never revived from here.

use std::sync::Arc;

use kernel::id::AccountId;

use crate::domain::entity::{Account, AccountProfile};
use crate::domain::repository::AccountRepository;
use crate::domain::service::conflict::{self, IdentifierMatch, Resolution};
use crate::domain::value_object::{
    AccountPassword, AccountRole, AccountSalt, Email, Identifier, Phone, RawPassword,
};
use crate::error::{IdentityError, IdentityResult};

/// Register input
pub struct RegisterInput {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
}

/// Register output
#[derive(Debug)]
pub struct RegisterOutput {
    pub account_id: AccountId,
    pub role: AccountRole,
}

/// Register use case
pub struct RegisterUseCase<R>
where
    R: AccountRepository,
{
    repo: Arc<R>,
}

impl<R> RegisterUseCase<R>
where
    R: AccountRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, input: RegisterInput) -> IdentityResult<RegisterOutput> {
        let email = non_blank(input.email).map(Email::new).transpose()?;
        let phone = non_blank(input.phone).map(Phone::new).transpose()?;
        if email.is_none() && phone.is_none() {
            return Err(IdentityError::MissingIdentifier);
        }

        let raw_password = RawPassword::chosen(input.password)?;
        let profile = AccountProfile::new(input.first_name, input.last_name, input.address)?;

        // Email and phone are looked up independently
        let email_match = self.lookup(email.clone().map(Identifier::from)).await?;
        let phone_match = self.lookup(phone.clone().map(Identifier::from)).await?;

        if let Resolution::Reject(conflict) = conflict::resolve(email_match, phone_match) {
            tracing::info!(
                email_match = ?email_match,
                phone_match = ?phone_match,
                "Registration rejected"
            );
            return Err(IdentityError::Conflict(conflict));
        }

        let salt = AccountSalt::generate();
        let password = AccountPassword::hash(&raw_password, &salt)
            .map_err(|e| IdentityError::Hashing(e.message().to_string()))?;

        let account = Account::register(email, phone, password, salt, profile)
            .ok_or(IdentityError::MissingIdentifier)?;

        self.repo.create(&account).await?;

        tracing::info!(account_id = %account.account_id, "Account registered");

        Ok(RegisterOutput {
            account_id: account.account_id,
            role: account.role,
        })
    }

    async fn lookup(&self, identifier: Option<Identifier>) -> IdentityResult<IdentifierMatch> {
        let Some(identifier) = identifier else {
            return Ok(IdentifierMatch::Absent);
        };

        // A live match is preferred when deleted rows are included
        let found = self.repo.find_by_identifier(&identifier, true).await?;
        Ok(match found {
            None => IdentifierMatch::Absent,
            Some(account) if account.deleted => IdentifierMatch::Deleted,
            Some(_) => IdentifierMatch::Active,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
