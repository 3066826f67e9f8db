//! Value Object Module

pub mod account_password;
pub mod account_role;
pub mod account_salt;
pub mod email;
pub mod identifier;
pub mod phone;
pub mod refresh_digest;

pub use account_password::{AccountPassword, RawPassword};
pub use account_role::AccountRole;
pub use account_salt::AccountSalt;
pub use email::Email;
pub use identifier::Identifier;
pub use phone::Phone;
pub use refresh_digest::RefreshDigest;
