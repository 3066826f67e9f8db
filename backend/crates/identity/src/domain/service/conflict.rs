//! Registration Conflict Resolution
//!
//! Decision table over what each proposed identifier matched:
//!
//! | email   | phone   | outcome                |
//! |---------|---------|------------------------|
//! | absent  | absent  | create                 |
//! | active  | active  | `EmailAndPhone`        |
//! | active  | *       | `Email`                |
//! | *       | active  | `Phone`                |
//! | deleted | absent  | `DeletedEmail`         |
//! | absent  | deleted | `DeletedPhone`         |
//! | deleted | deleted | `DeletedEmailAndPhone` |
//!
//! A live match always wins over a deleted one. Deleted matches are never
//! revived here; the caller has to go through activation.

use derive_more::Display;

/// What a single identifier matched in the record store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierMatch {
    /// Not supplied, or no account uses it
    Absent,
    /// Used by a non-deleted account
    Active,
    /// Used only by soft-deleted accounts
    Deleted,
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationConflict {
    #[display("Account already exists with this email id")]
    Email,
    #[display("Account already exists with this phone number")]
    Phone,
    #[display("Account already exists with this email id and phone number")]
    EmailAndPhone,
    #[display("A deactivated account exists with this email id, please activate it")]
    DeletedEmail,
    #[display("A deactivated account exists with this phone number, please activate it")]
    DeletedPhone,
    #[display(
        "A deactivated account exists with this email id and phone number, please activate it"
    )]
    DeletedEmailAndPhone,
}

impl RegistrationConflict {
    pub fn requires_activation(&self) -> bool {
        use RegistrationConflict::*;
        matches!(self, DeletedEmail | DeletedPhone | DeletedEmailAndPhone)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Create,
    Reject(RegistrationConflict),
}

pub fn resolve(email: IdentifierMatch, phone: IdentifierMatch) -> Resolution {
    use IdentifierMatch::*;
    use RegistrationConflict::*;

    match (email, phone) {
        (Absent, Absent) => Resolution::Create,
        (Active, Active) => Resolution::Reject(EmailAndPhone),
        (Active, _) => Resolution::Reject(Email),
        (_, Active) => Resolution::Reject(Phone),
        (Deleted, Absent) => Resolution::Reject(DeletedEmail),
        (Absent, Deleted) => Resolution::Reject(DeletedPhone),
        (Deleted, Deleted) => Resolution::Reject(DeletedEmailAndPhone),
    }
}
