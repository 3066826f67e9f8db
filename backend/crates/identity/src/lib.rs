//! Identity & Session Lifecycle
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, record store trait, token and
//!   conflict services
//! - `application/` - Use cases and configuration
//! - `infra/` - PostgreSQL and in-memory record stores
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Registration by email and/or phone, with conflict detection across
//!   soft-deleted accounts and explicit reactivation
//! - Login by either identifier
//! - Access / refresh token pairs, rotated on every refresh
//! - Logout, profile management, admin role changes, self-deactivation
//!
//! ## Security Model
//! - Passwords hashed with Argon2id over `password || account salt`
//! - Tokens are HS256 JWS signed with the account's own salt; there is no
//!   global signing key
//! - Only a SHA-256 digest of the current refresh token is stored, and it is
//!   swapped with a compare-and-set so each refresh token works once

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::IdentityConfig;
pub use error::{IdentityError, IdentityResult, TokenError};
pub use infra::{memory::InMemoryAccountRepository, postgres::PgAccountRepository};
pub use presentation::router::{identity_router, identity_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod store {
    pub use crate::infra::memory::InMemoryAccountRepository as MemoryStore;
    pub use crate::infra::postgres::PgAccountRepository as AccountStore;
}
