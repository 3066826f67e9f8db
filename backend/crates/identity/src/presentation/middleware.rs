//! Bearer Token Middleware
//!
//! Guards the account routes: the access token must verify against its
//! account's salt and the account must still hold a session.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::application::AuthenticateUseCase;
use crate::domain::repository::AccountRepository;
use crate::error::IdentityError;
use crate::presentation::handlers::IdentityAppState;

/// Middleware that requires a valid access token with an active session
///
/// Inserts the `AuthenticatedAccount` into request extensions.
pub async fn require_access_token<R>(
    State(state): State<IdentityAppState<R>>,
    mut req: Request,
    next: Next,
) -> Result<Response, IdentityError>
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    let token = bearer_token(req.headers()).ok_or(IdentityError::MissingToken)?;

    let caller = AuthenticateUseCase::new(state.repo.clone())
        .execute(token)
        .await?;

    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}

/// Token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
