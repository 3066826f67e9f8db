//! Use case tests for the identity crate
//! All run against the in-memory record store.

#[cfg(test)]
mod support {
    use std::sync::Arc;

    use crate::application::{
        IdentityConfig, LoginInput, LoginOutput, LoginUseCase, RegisterInput, RegisterOutput,
        RegisterUseCase,
    };
    use crate::domain::entity::Account;
    use crate::domain::repository::AccountRepository;
    use crate::domain::value_object::Identifier;
    use crate::error::IdentityResult;
    use crate::infra::memory::InMemoryAccountRepository;

    pub const PASSWORD: &str = "Harbour-View-42";
    pub const EMAIL: &str = "guest@example.com";
    pub const PHONE: &str = "+15550102030";

    pub fn setup() -> (Arc<InMemoryAccountRepository>, Arc<IdentityConfig>) {
        (
            Arc::new(InMemoryAccountRepository::new()),
            Arc::new(IdentityConfig::development()),
        )
    }

    pub async fn register(
        repo: &Arc<InMemoryAccountRepository>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> IdentityResult<RegisterOutput> {
        RegisterUseCase::new(repo.clone())
            .execute(RegisterInput {
                email: email.map(str::to_string),
                phone: phone.map(str::to_string),
                password: PASSWORD.to_string(),
                first_name: Some("Ada".to_string()),
                last_name: Some("Lovelace".to_string()),
                address: None,
            })
            .await
    }

    pub async fn login(
        repo: &Arc<InMemoryAccountRepository>,
        config: &Arc<IdentityConfig>,
        identifier: &str,
        password: &str,
    ) -> IdentityResult<LoginOutput> {
        LoginUseCase::new(repo.clone(), config.clone())
            .execute(LoginInput {
                identifier: identifier.to_string(),
                password: password.to_string(),
            })
            .await
    }

    /// Config whose refresh lifetime overflows any representable expiry
    pub fn unmintable_refresh() -> Arc<IdentityConfig> {
        Arc::new(IdentityConfig {
            refresh_token_ttl: std::time::Duration::from_secs(u64::MAX / 2),
            ..IdentityConfig::development()
        })
    }

    /// Current record, deleted or not
    pub async fn stored(repo: &InMemoryAccountRepository, identifier: &str) -> Option<Account> {
        let identifier = Identifier::parse(identifier).unwrap();
        repo.find_by_identifier(&identifier, true).await.unwrap()
    }
}

#[cfg(test)]
mod register_tests {
    use super::support::*;
    use crate::application::ActivateUseCase;
    use crate::domain::repository::AccountRepository;
    use crate::domain::service::conflict::RegistrationConflict;
    use crate::domain::value_object::AccountRole;
    use crate::error::IdentityError;

    #[tokio::test]
    async fn test_register_then_login_by_either_identifier() {
        let (repo, config) = setup();

        let registered = register(&repo, Some(EMAIL), Some(PHONE)).await.unwrap();
        assert_eq!(registered.role, AccountRole::User);

        let by_email = login(&repo, &config, EMAIL, PASSWORD).await.unwrap();
        assert_eq!(by_email.account_id, registered.account_id);

        let by_phone = login(&repo, &config, "+1 (555) 010-2030", PASSWORD)
            .await
            .unwrap();
        assert_eq!(by_phone.account_id, registered.account_id);
    }

    #[tokio::test]
    async fn test_register_with_phone_only() {
        let (repo, config) = setup();
        register(&repo, None, Some(PHONE)).await.unwrap();

        let account = stored(&repo, PHONE).await.unwrap();
        assert_eq!(account.subject(), Some(PHONE));
        assert!(login(&repo, &config, PHONE, PASSWORD).await.is_ok());
    }

    #[tokio::test]
    async fn test_register_requires_an_identifier() {
        let (repo, _) = setup();
        let err = register(&repo, None, None).await.unwrap_err();
        assert!(matches!(err, IdentityError::MissingIdentifier));

        let err = register(&repo, Some("  "), Some("")).await.unwrap_err();
        assert!(matches!(err, IdentityError::MissingIdentifier));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let (repo, _) = setup();

        let err = register(&repo, Some("not-an-email@"), None).await.unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));

        let err = register(&repo, None, Some("12")).await.unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));

        let err = crate::application::RegisterUseCase::new(repo.clone())
            .execute(crate::application::RegisterInput {
                email: Some(EMAIL.to_string()),
                phone: None,
                password: "password123".to_string(),
                first_name: None,
                last_name: None,
                address: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_conflicts_are_identifier_specific() {
        let (repo, _) = setup();
        register(&repo, Some(EMAIL), Some(PHONE)).await.unwrap();

        let err = register(&repo, Some(EMAIL), None).await.unwrap_err();
        assert!(matches!(err, IdentityError::Conflict(RegistrationConflict::Email)));

        let err = register(&repo, Some("other@example.com"), Some(PHONE))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Conflict(RegistrationConflict::Phone)));

        let err = register(&repo, Some("GUEST@example.com"), Some(PHONE))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IdentityError::Conflict(RegistrationConflict::EmailAndPhone)
        ));

        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_conflict_across_two_accounts() {
        let (repo, _) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();
        register(&repo, None, Some(PHONE)).await.unwrap();

        let err = register(&repo, Some(EMAIL), Some(PHONE)).await.unwrap_err();
        assert!(matches!(
            err,
            IdentityError::Conflict(RegistrationConflict::EmailAndPhone)
        ));
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn test_deleted_match_asks_for_activation() {
        let (repo, _) = setup();
        let registered = register(&repo, Some(EMAIL), Some(PHONE)).await.unwrap();
        repo.set_deleted(&registered.account_id, true).await.unwrap();

        let err = register(&repo, Some(EMAIL), None).await.unwrap_err();
        assert!(matches!(
            err,
            IdentityError::Conflict(RegistrationConflict::DeletedEmail)
        ));

        let err = register(&repo, None, Some(PHONE)).await.unwrap_err();
        assert!(matches!(
            err,
            IdentityError::Conflict(RegistrationConflict::DeletedPhone)
        ));

        let err = register(&repo, Some(EMAIL), Some(PHONE)).await.unwrap_err();
        assert!(matches!(
            err,
            IdentityError::Conflict(RegistrationConflict::DeletedEmailAndPhone)
        ));

        // Still deleted, nothing created
        assert!(stored(&repo, EMAIL).await.unwrap().deleted);
        assert_eq!(repo.len().await, 1);

        ActivateUseCase::new(repo.clone()).execute(EMAIL).await.unwrap();
        assert!(!stored(&repo, EMAIL).await.unwrap().deleted);

        let err = register(&repo, Some(EMAIL), Some(PHONE)).await.unwrap_err();
        assert!(matches!(
            err,
            IdentityError::Conflict(RegistrationConflict::EmailAndPhone)
        ));
    }

    #[tokio::test]
    async fn test_live_match_wins_over_deleted_match() {
        let (repo, _) = setup();
        let old = register(&repo, Some(EMAIL), None).await.unwrap();
        repo.set_deleted(&old.account_id, true).await.unwrap();
        register(&repo, None, Some(PHONE)).await.unwrap();

        let err = register(&repo, Some(EMAIL), Some(PHONE)).await.unwrap_err();
        assert!(matches!(err, IdentityError::Conflict(RegistrationConflict::Phone)));
    }
}

#[cfg(test)]
mod activate_tests {
    use super::support::*;
    use crate::application::{ActivateUseCase, RefreshUseCase};
    use crate::domain::entity::{Account, AccountProfile};
    use crate::domain::repository::AccountRepository;
    use crate::domain::service::conflict::RegistrationConflict;
    use crate::domain::value_object::{AccountPassword, AccountSalt, Email, Phone, RawPassword};
    use crate::error::IdentityError;

    #[tokio::test]
    async fn test_activate_unknown_account() {
        let (repo, _) = setup();
        let err = ActivateUseCase::new(repo.clone())
            .execute(EMAIL)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::NoSuchAccount));
    }

    #[tokio::test]
    async fn test_activate_active_account() {
        let (repo, _) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();

        let err = ActivateUseCase::new(repo.clone())
            .execute(EMAIL)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::AlreadyActive));
        assert!(err.is_already_in_state());
    }

    #[tokio::test]
    async fn test_activate_restores_login() {
        let (repo, config) = setup();
        let registered = register(&repo, Some(EMAIL), Some(PHONE)).await.unwrap();
        repo.set_deleted(&registered.account_id, true).await.unwrap();

        let err = login(&repo, &config, EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, IdentityError::AccountNotFound));

        let activated = ActivateUseCase::new(repo.clone())
            .execute(PHONE)
            .await
            .unwrap();
        assert_eq!(activated, registered.account_id);

        assert!(login(&repo, &config, EMAIL, PASSWORD).await.is_ok());
    }

    #[tokio::test]
    async fn test_deletion_ends_the_session() {
        let (repo, config) = setup();
        let registered = register(&repo, Some(EMAIL), None).await.unwrap();
        let session = login(&repo, &config, EMAIL, PASSWORD).await.unwrap();

        repo.set_deleted(&registered.account_id, true).await.unwrap();
        assert!(stored(&repo, EMAIL).await.unwrap().refresh_digest.is_none());

        ActivateUseCase::new(repo.clone())
            .execute(EMAIL)
            .await
            .unwrap();
        let err = RefreshUseCase::new(repo.clone(), config.clone())
            .execute(&session.tokens.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::TokenRevoked));
    }

    #[tokio::test]
    async fn test_activate_refuses_when_identifier_reused() {
        let (repo, _) = setup();
        let old = register(&repo, Some(EMAIL), Some(PHONE)).await.unwrap();
        repo.set_deleted(&old.account_id, true).await.unwrap();

        // Registration would refuse the deleted phone, so write directly
        let salt = AccountSalt::generate();
        let raw = RawPassword::chosen(PASSWORD.to_string()).unwrap();
        let password = AccountPassword::hash(&raw, &salt).unwrap();
        let account = Account::register(
            Some(Email::new("new@example.com").unwrap()),
            Some(Phone::new(PHONE).unwrap()),
            password,
            salt,
            AccountProfile::default(),
        )
        .unwrap();
        repo.create(&account).await.unwrap();

        let err = ActivateUseCase::new(repo.clone())
            .execute(EMAIL)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Conflict(RegistrationConflict::Phone)));
        assert!(stored(&repo, EMAIL).await.unwrap().deleted);
    }
}

#[cfg(test)]
mod login_tests {
    use super::support::*;
    use crate::domain::repository::AccountRepository;
    use crate::domain::value_object::RefreshDigest;
    use crate::error::IdentityError;

    #[tokio::test]
    async fn test_login_records_refresh_digest() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();

        let output = login(&repo, &config, EMAIL, PASSWORD).await.unwrap();
        assert_ne!(output.tokens.access_token, output.tokens.refresh_token);

        let account = stored(&repo, EMAIL).await.unwrap();
        assert_eq!(
            account.refresh_digest,
            Some(RefreshDigest::of(&output.tokens.refresh_token))
        );
    }

    #[tokio::test]
    async fn test_wrong_password_never_mutates() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();

        let err = login(&repo, &config, EMAIL, "Harbour-View-43")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));
        assert!(stored(&repo, EMAIL).await.unwrap().refresh_digest.is_none());

        let session = login(&repo, &config, EMAIL, PASSWORD).await.unwrap();
        let before = stored(&repo, EMAIL).await.unwrap().refresh_digest;

        let err = login(&repo, &config, EMAIL, "wrong").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));
        let after = stored(&repo, EMAIL).await.unwrap().refresh_digest;
        assert_eq!(before, after);
        assert_eq!(after, Some(RefreshDigest::of(&session.tokens.refresh_token)));
    }

    #[tokio::test]
    async fn test_login_unknown_or_deleted_account() {
        let (repo, config) = setup();
        let err = login(&repo, &config, EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, IdentityError::AccountNotFound));

        let registered = register(&repo, Some(EMAIL), None).await.unwrap();
        repo.set_deleted(&registered.account_id, true).await.unwrap();
        let err = login(&repo, &config, EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, IdentityError::AccountNotFound));
    }

    #[tokio::test]
    async fn test_failed_mint_records_no_session() {
        let (repo, _) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();

        let err = login(&repo, &unmintable_refresh(), EMAIL, PASSWORD)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Internal(_)));
        assert!(stored(&repo, EMAIL).await.unwrap().refresh_digest.is_none());
    }

    #[tokio::test]
    async fn test_login_rejects_bad_input() {
        let (repo, config) = setup();
        let err = login(&repo, &config, "nobody@", PASSWORD).await.unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));

        let err = login(&repo, &config, EMAIL, "").await.unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));
    }
}

#[cfg(test)]
mod refresh_tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::support::*;
    use crate::application::{LogoutUseCase, RefreshUseCase};
    use crate::domain::repository::AccountRepository;
    use crate::domain::service::token;
    use crate::domain::value_object::{AccountSalt, Identifier, RefreshDigest};
    use crate::error::{IdentityError, TokenError};

    #[tokio::test]
    async fn test_refresh_rotates_exactly_once() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();
        let session = login(&repo, &config, EMAIL, PASSWORD).await.unwrap();
        let use_case = RefreshUseCase::new(repo.clone(), config.clone());

        let rotated = use_case.execute(&session.tokens.refresh_token).await.unwrap();
        assert_ne!(rotated.tokens.refresh_token, session.tokens.refresh_token);

        let err = use_case
            .execute(&session.tokens.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::TokenRevoked));

        // The new token still works, once
        let again = use_case.execute(&rotated.tokens.refresh_token).await.unwrap();
        assert_eq!(
            stored(&repo, EMAIL).await.unwrap().refresh_digest,
            Some(RefreshDigest::of(&again.tokens.refresh_token))
        );
    }

    #[tokio::test]
    async fn test_failed_mint_keeps_current_session() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();
        let session = login(&repo, &config, EMAIL, PASSWORD).await.unwrap();
        let recorded = Some(RefreshDigest::of(&session.tokens.refresh_token));

        let err = RefreshUseCase::new(repo.clone(), unmintable_refresh())
            .execute(&session.tokens.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Internal(_)));
        assert_eq!(stored(&repo, EMAIL).await.unwrap().refresh_digest, recorded);

        // The presented token was not consumed
        RefreshUseCase::new(repo.clone(), config.clone())
            .execute(&session.tokens.refresh_token)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_refresh_after_logout_is_revoked() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();
        let session = login(&repo, &config, EMAIL, PASSWORD).await.unwrap();

        LogoutUseCase::new(repo.clone())
            .execute(&Identifier::parse(EMAIL).unwrap())
            .await
            .unwrap();

        let err = RefreshUseCase::new(repo.clone(), config.clone())
            .execute(&session.tokens.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::TokenRevoked));
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();
        let session = login(&repo, &config, EMAIL, PASSWORD).await.unwrap();

        let err = RefreshUseCase::new(repo.clone(), config.clone())
            .execute(&session.tokens.access_token)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::TokenRevoked));
    }

    #[tokio::test]
    async fn test_refresh_rejects_foreign_signature() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();
        login(&repo, &config, EMAIL, PASSWORD).await.unwrap();

        let forged = token::mint(EMAIL, &AccountSalt::generate(), Duration::minutes(60)).unwrap();
        let err = RefreshUseCase::new(repo.clone(), config.clone())
            .execute(&forged)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Token(TokenError::InvalidSignature)));
    }

    #[tokio::test]
    async fn test_refresh_rejects_expired_token() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();
        let account = stored(&repo, EMAIL).await.unwrap();

        let expired = token::mint(EMAIL, &account.salt, Duration::minutes(-5)).unwrap();
        repo.set_refresh_digest(&account.account_id, Some(&RefreshDigest::of(&expired)))
            .await
            .unwrap();

        let err = RefreshUseCase::new(repo.clone(), config.clone())
            .execute(&expired)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Token(TokenError::Expired)));
    }

    #[tokio::test]
    async fn test_refresh_unknown_or_deleted_account() {
        let (repo, config) = setup();
        let use_case = RefreshUseCase::new(repo.clone(), config.clone());

        let orphan = token::mint(EMAIL, &AccountSalt::generate(), Duration::minutes(60)).unwrap();
        let err = use_case.execute(&orphan).await.unwrap_err();
        assert!(matches!(err, IdentityError::AccountNotFound));

        let registered = register(&repo, Some(EMAIL), None).await.unwrap();
        let session = login(&repo, &config, EMAIL, PASSWORD).await.unwrap();
        repo.set_deleted(&registered.account_id, true).await.unwrap();

        let err = use_case
            .execute(&session.tokens.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::AccountNotFound));
    }

    #[tokio::test]
    async fn test_refresh_malformed_token() {
        let (repo, config) = setup();
        let err = RefreshUseCase::new(repo.clone(), config.clone())
            .execute("definitely-not-a-token")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Token(TokenError::MalformedToken)));
    }

    #[tokio::test]
    async fn test_concurrent_refresh_same_task() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();
        let session = login(&repo, &config, EMAIL, PASSWORD).await.unwrap();
        let use_case = RefreshUseCase::new(repo.clone(), config.clone());

        let (a, b) = tokio::join!(
            use_case.execute(&session.tokens.refresh_token),
            use_case.execute(&session.tokens.refresh_token),
        );

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(successes, 1);
        let failure = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
        assert!(matches!(failure, IdentityError::TokenRevoked));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_many_tasks() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();
        let session = login(&repo, &config, EMAIL, PASSWORD).await.unwrap();
        let refresh_token = Arc::new(session.tokens.refresh_token);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                let config = config.clone();
                let refresh_token = refresh_token.clone();
                tokio::spawn(async move {
                    RefreshUseCase::new(repo, config)
                        .execute(&refresh_token)
                        .await
                })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(output) => winners.push(output),
                Err(err) => assert!(matches!(err, IdentityError::TokenRevoked), "{err:?}"),
            }
        }

        assert_eq!(winners.len(), 1);
        assert_eq!(
            stored(&repo, EMAIL).await.unwrap().refresh_digest,
            Some(RefreshDigest::of(&winners[0].tokens.refresh_token))
        );
    }
}

#[cfg(test)]
mod logout_tests {
    use super::support::*;
    use crate::application::LogoutUseCase;
    use crate::domain::value_object::Identifier;
    use crate::error::IdentityError;

    #[tokio::test]
    async fn test_second_logout_is_already_logged_out() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();
        login(&repo, &config, EMAIL, PASSWORD).await.unwrap();
        let use_case = LogoutUseCase::new(repo.clone());
        let identifier = Identifier::parse(EMAIL).unwrap();

        use_case.execute(&identifier).await.unwrap();
        assert!(stored(&repo, EMAIL).await.unwrap().refresh_digest.is_none());

        let err = use_case.execute(&identifier).await.unwrap_err();
        assert!(matches!(err, IdentityError::AlreadyLoggedOut));
        assert!(err.is_already_in_state());
    }

    #[tokio::test]
    async fn test_logout_without_session() {
        let (repo, _) = setup();
        register(&repo, None, Some(PHONE)).await.unwrap();

        let err = LogoutUseCase::new(repo.clone())
            .execute(&Identifier::parse(PHONE).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::AlreadyLoggedOut));
    }

    #[tokio::test]
    async fn test_logout_unknown_account() {
        let (repo, _) = setup();
        let err = LogoutUseCase::new(repo.clone())
            .execute(&Identifier::parse(EMAIL).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::AccountNotFound));
    }
}

#[cfg(test)]
mod authenticate_tests {
    use chrono::Duration;

    use super::support::*;
    use crate::application::{AuthenticateUseCase, LogoutUseCase};
    use crate::domain::repository::AccountRepository;
    use crate::domain::service::token;
    use crate::domain::value_object::{AccountRole, Identifier};
    use crate::error::{IdentityError, TokenError};

    #[tokio::test]
    async fn test_authenticate_access_token() {
        let (repo, config) = setup();
        let registered = register(&repo, Some(EMAIL), Some(PHONE)).await.unwrap();
        let session = login(&repo, &config, PHONE, PASSWORD).await.unwrap();

        let caller = AuthenticateUseCase::new(repo.clone())
            .execute(&session.tokens.access_token)
            .await
            .unwrap();
        assert_eq!(caller.account_id, registered.account_id);
        assert_eq!(caller.identifier, Identifier::parse(EMAIL).unwrap());
        assert_eq!(caller.role, AccountRole::User);
        assert!(caller.logged_in);
    }

    #[tokio::test]
    async fn test_access_token_dies_with_session() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();
        let session = login(&repo, &config, EMAIL, PASSWORD).await.unwrap();
        LogoutUseCase::new(repo.clone())
            .execute(&Identifier::parse(EMAIL).unwrap())
            .await
            .unwrap();

        let use_case = AuthenticateUseCase::new(repo.clone());
        let err = use_case
            .execute(&session.tokens.access_token)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::SessionExpired));

        let caller = use_case.identify(&session.tokens.access_token).await.unwrap();
        assert!(!caller.logged_in);
    }

    #[tokio::test]
    async fn test_salts_isolate_accounts() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();
        register(&repo, Some("mallory@example.com"), None).await.unwrap();
        login(&repo, &config, EMAIL, PASSWORD).await.unwrap();

        // Mallory signs a token naming the guest with her own salt
        let mallory = stored(&repo, "mallory@example.com").await.unwrap();
        let forged = token::mint(EMAIL, &mallory.salt, Duration::minutes(15)).unwrap();

        let err = AuthenticateUseCase::new(repo.clone())
            .execute(&forged)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Token(TokenError::InvalidSignature)));
    }

    #[tokio::test]
    async fn test_deleted_account_is_rejected() {
        let (repo, config) = setup();
        let registered = register(&repo, Some(EMAIL), None).await.unwrap();
        let session = login(&repo, &config, EMAIL, PASSWORD).await.unwrap();
        repo.set_deleted(&registered.account_id, true).await.unwrap();

        let err = AuthenticateUseCase::new(repo.clone())
            .execute(&session.tokens.access_token)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Token(TokenError::ValidationRejected)));
    }
}

#[cfg(test)]
mod account_tests {
    use super::support::*;
    use crate::application::{
        AccountUseCase, AuthenticateUseCase, AuthenticatedAccount, UpdateProfileInput,
    };
    use crate::domain::entity::AccountPatch;
    use crate::domain::repository::AccountRepository;
    use crate::domain::service::conflict::RegistrationConflict;
    use crate::domain::value_object::AccountRole;
    use crate::error::IdentityError;
    use crate::infra::memory::InMemoryAccountRepository;
    use std::sync::Arc;

    async fn caller(
        repo: &Arc<InMemoryAccountRepository>,
        identifier: &str,
    ) -> AuthenticatedAccount {
        let config = Arc::new(crate::application::IdentityConfig::development());
        let session = login(repo, &config, identifier, PASSWORD).await.unwrap();
        AuthenticateUseCase::new(repo.clone())
            .execute(&session.tokens.access_token)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_profile_and_update() {
        let (repo, _) = setup();
        register(&repo, Some(EMAIL), Some(PHONE)).await.unwrap();
        let me = caller(&repo, EMAIL).await;
        let use_case = AccountUseCase::new(repo.clone());

        let view = use_case.profile(&me).await.unwrap();
        assert_eq!(view.email.as_deref(), Some(EMAIL));
        assert_eq!(view.phone.as_deref(), Some(PHONE));
        assert_eq!(view.profile.first_name.as_deref(), Some("Ada"));

        let view = use_case
            .update_profile(
                &me,
                UpdateProfileInput {
                    first_name: Some("Grace".to_string()),
                    last_name: Some("Hopper".to_string()),
                    address: Some("1 Harbour Road".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.profile.first_name.as_deref(), Some("Grace"));

        let stored = stored(&repo, EMAIL).await.unwrap();
        assert_eq!(stored.profile.address.as_deref(), Some("1 Harbour Road"));
    }

    #[tokio::test]
    async fn test_update_role_is_admin_only() {
        let (repo, _) = setup();
        let admin = register(&repo, Some("admin@example.com"), None).await.unwrap();
        register(&repo, Some(EMAIL), None).await.unwrap();
        repo.update_fields(&admin.account_id, &AccountPatch::role(AccountRole::Admin))
            .await
            .unwrap();
        let use_case = AccountUseCase::new(repo.clone());

        let guest = caller(&repo, EMAIL).await;
        let err = use_case
            .update_role(&guest, EMAIL, "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Forbidden));

        let admin = caller(&repo, "admin@example.com").await;
        let view = use_case.update_role(&admin, EMAIL, "partner").await.unwrap();
        assert_eq!(view.role, AccountRole::Partner);
        assert_eq!(stored(&repo, EMAIL).await.unwrap().role, AccountRole::Partner);

        let err = use_case
            .update_role(&admin, EMAIL, "overlord")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Validation(_)));

        let err = use_case
            .update_role(&admin, "nobody@example.com", "user")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::AccountNotFound));
    }

    #[tokio::test]
    async fn test_deactivate_self() {
        let (repo, config) = setup();
        register(&repo, Some(EMAIL), None).await.unwrap();
        let me = caller(&repo, EMAIL).await;
        let use_case = AccountUseCase::new(repo.clone());

        use_case.deactivate(&me).await.unwrap();
        let account = stored(&repo, EMAIL).await.unwrap();
        assert!(account.deleted);
        assert!(account.refresh_digest.is_none());

        let err = use_case.deactivate(&me).await.unwrap_err();
        assert!(matches!(err, IdentityError::AlreadyDeactivated));

        let err = login(&repo, &config, EMAIL, PASSWORD).await.unwrap_err();
        assert!(matches!(err, IdentityError::AccountNotFound));

        let err = register(&repo, Some(EMAIL), None).await.unwrap_err();
        assert!(matches!(
            err,
            IdentityError::Conflict(RegistrationConflict::DeletedEmail)
        ));
    }
}

#[cfg(test)]
mod router_tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{HeaderMap, Method, Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::support::*;
    use crate::application::{IdentityConfig, RefreshTransport};
    use crate::infra::memory::InMemoryAccountRepository;
    use crate::presentation::router::identity_router_generic;

    fn app(transport: RefreshTransport) -> Router {
        let config = IdentityConfig {
            refresh_transport: transport,
            ..IdentityConfig::development()
        };
        identity_router_generic(InMemoryAccountRepository::new(), config)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(header::HeaderName, String)],
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, headers, body)
    }

    async fn register_and_login(app: &Router) -> Value {
        let (status, _, body) = send(
            app,
            Method::POST,
            "/auth/register",
            Some(json!({ "email": EMAIL, "phone": PHONE, "password": PASSWORD })),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["role"], "user");

        let (status, _, body) = send(
            app,
            Method::POST,
            "/auth/login",
            Some(json!({ "identifier": EMAIL, "password": PASSWORD })),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }

    fn bearer(token: &Value) -> Vec<(header::HeaderName, String)> {
        vec![(
            header::AUTHORIZATION,
            format!("Bearer {}", token.as_str().unwrap()),
        )]
    }

    #[tokio::test]
    async fn test_body_transport_session_flow() {
        let app = app(RefreshTransport::Body);
        let tokens = register_and_login(&app).await;
        assert_eq!(tokens["token_type"], "Bearer");
        assert!(tokens["refresh_token"].is_string());

        let (status, _, profile) = send(
            &app,
            Method::GET,
            "/account/profile",
            None,
            &bearer(&tokens["access_token"]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["email"], EMAIL);
        assert!(profile.get("salt").is_none());
        assert!(profile.get("password_hash").is_none());

        let (status, _, rotated) = send(
            &app,
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": tokens["refresh_token"] })),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(rotated["refresh_token"], tokens["refresh_token"]);

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/auth/refresh",
            Some(json!({ "refresh_token": tokens["refresh_token"] })),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/auth/logout",
            None,
            &bearer(&rotated["access_token"]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/auth/logout",
            None,
            &bearer(&rotated["access_token"]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Account already logged out");

        let (status, _, _) = send(
            &app,
            Method::GET,
            "/account/profile",
            None,
            &bearer(&rotated["access_token"]),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cookie_transport() {
        let app = app(RefreshTransport::Cookie);
        register_and_login(&app).await;

        let (status, headers, tokens) = send(
            &app,
            Method::POST,
            "/auth/login",
            Some(json!({ "identifier": PHONE, "password": PASSWORD })),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(tokens.get("refresh_token").is_none());

        let set_cookie = headers
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        let cookie = set_cookie.split(';').next().unwrap().to_string();

        let (status, headers, _) = send(
            &app,
            Method::POST,
            "/auth/refresh",
            None,
            &[(header::COOKIE, cookie)],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers.get(header::SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn test_error_responses() {
        let app = app(RefreshTransport::Body);
        register_and_login(&app).await;

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/auth/register",
            Some(json!({ "email": EMAIL, "password": PASSWORD })),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], 409);

        let (status, _, _) = send(
            &app,
            Method::POST,
            "/auth/login",
            Some(json!({ "identifier": EMAIL, "password": "nope-nope" })),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = send(&app, Method::GET, "/account/profile", None, &[]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = send(&app, Method::POST, "/auth/refresh", None, &[]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, body) = send(
            &app,
            Method::PATCH,
            "/auth/activate",
            Some(json!({ "identifier": EMAIL })),
            &[],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Account is already active");
    }
}
