//! Application Layer
//!
//! Use cases and application services.

pub mod account;
pub mod activate;
pub mod authenticate;
pub mod config;
pub mod login;
pub mod logout;
pub mod refresh;
pub mod register;
pub mod session;

// Re-exports
pub use account::{AccountUseCase, AccountView, UpdateProfileInput};
pub use activate::ActivateUseCase;
pub use authenticate::{AuthenticateUseCase, AuthenticatedAccount};
pub use config::{IdentityConfig, RefreshTransport};
pub use login::{LoginInput, LoginOutput, LoginUseCase};
pub use logout::LogoutUseCase;
pub use refresh::{RefreshOutput, RefreshUseCase};
pub use register::{RegisterInput, RegisterOutput, RegisterUseCase};
pub use session::SessionTokens;
