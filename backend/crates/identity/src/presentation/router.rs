//! Identity Router
//!
//! Routes are relative; the binary nests them under `/v1`.

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use std::sync::Arc;

use crate::application::config::IdentityConfig;
use crate::domain::repository::AccountRepository;
use crate::infra::postgres::PgAccountRepository;
use crate::presentation::handlers::{self, IdentityAppState};
use crate::presentation::middleware::require_access_token;

/// Create the Identity router with PostgreSQL repository
pub fn identity_router(repo: PgAccountRepository, config: IdentityConfig) -> Router {
    identity_router_generic(repo, config)
}

/// Create a generic Identity router for any repository implementation
pub fn identity_router_generic<R>(repo: R, config: IdentityConfig) -> Router
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    let state = IdentityAppState {
        repo: Arc::new(repo),
        config: Arc::new(config),
    };

    let auth = Router::new()
        .route("/register", post(handlers::register::<R>))
        .route("/activate", patch(handlers::activate::<R>))
        .route("/login", post(handlers::login::<R>))
        .route("/refresh", post(handlers::refresh::<R>))
        .route("/logout", post(handlers::logout::<R>));

    let account = Router::new()
        .route(
            "/profile",
            get(handlers::profile::<R>)
                .put(handlers::update_profile::<R>)
                .delete(handlers::deactivate::<R>),
        )
        .route("/role", patch(handlers::update_role::<R>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_access_token::<R>,
        ));

    Router::new()
        .nest("/auth", auth)
        .nest("/account", account)
        .with_state(state)
}
