//! Domain Services

pub mod conflict;
pub mod token;

pub use conflict::{IdentifierMatch, RegistrationConflict, Resolution};
pub use token::{ClaimedSubject, VerifiedClaims};
