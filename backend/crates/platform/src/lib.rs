//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations with no domain knowledge:
//! - Credential hashing (Argon2id)
//! - Digest helpers (SHA-256 hex, constant-time comparison)
//! - Cookie construction and extraction

pub mod cookie;
pub mod crypto;
pub mod password;
