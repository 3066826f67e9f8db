//! Domain Layer
//!
//! Entities, value objects, the record store trait and the stateless
//! services (token signing, registration conflict table).

pub mod entity;
pub mod repository;
pub mod service;
pub mod value_object;

// Re-exports
pub use entity::{Account, AccountPatch, AccountProfile};
pub use repository::AccountRepository;
