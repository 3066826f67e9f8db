//! HTTP Handlers

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use kernel::error::app_error::AppError;
use std::sync::Arc;

use crate::application::config::{IdentityConfig, RefreshTransport};
use crate::application::{
    AccountUseCase, ActivateUseCase, AuthenticateUseCase, AuthenticatedAccount, LoginInput,
    LoginUseCase, LogoutUseCase, RefreshUseCase, RegisterInput, RegisterUseCase, SessionTokens,
    UpdateProfileInput,
};
use crate::domain::repository::AccountRepository;
use crate::error::{IdentityError, IdentityResult};
use crate::presentation::dto::{
    ActivateRequest, LoginRequest, MessageResponse, ProfileResponse, RefreshRequest,
    RegisterRequest, RegisterResponse, TokenResponse, UpdateProfileRequest, UpdateRoleRequest,
};
use crate::presentation::middleware::bearer_token;

/// Shared state for identity handlers
#[derive(Clone)]
pub struct IdentityAppState<R>
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<IdentityConfig>,
}

// ============================================================================
// Register / Activate
// ============================================================================

/// POST /v1/auth/register
pub async fn register<R>(
    State(state): State<IdentityAppState<R>>,
    Json(req): Json<RegisterRequest>,
) -> IdentityResult<impl IntoResponse>
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    let use_case = RegisterUseCase::new(state.repo.clone());

    let input = RegisterInput {
        email: req.email,
        phone: req.phone,
        password: req.password,
        first_name: req.first_name,
        last_name: req.last_name,
        address: req.address,
    };

    let output = use_case.execute(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            account_id: output.account_id.to_string(),
            role: output.role,
        }),
    ))
}

/// PATCH /v1/auth/activate
pub async fn activate<R>(
    State(state): State<IdentityAppState<R>>,
    Json(req): Json<ActivateRequest>,
) -> IdentityResult<Json<MessageResponse>>
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    let use_case = ActivateUseCase::new(state.repo.clone());
    use_case.execute(&req.identifier).await?;

    Ok(Json(MessageResponse::success("Account activated")))
}

// ============================================================================
// Session
// ============================================================================

/// POST /v1/auth/login
pub async fn login<R>(
    State(state): State<IdentityAppState<R>>,
    Json(req): Json<LoginRequest>,
) -> IdentityResult<Response>
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    let use_case = LoginUseCase::new(state.repo.clone(), state.config.clone());

    let input = LoginInput {
        identifier: req.identifier,
        password: req.password,
    };

    let output = use_case.execute(input).await?;

    token_response(&state.config, output.tokens)
}

/// POST /v1/auth/refresh
pub async fn refresh<R>(
    State(state): State<IdentityAppState<R>>,
    headers: HeaderMap,
    body: Bytes,
) -> IdentityResult<Response>
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    let refresh_token =
        presented_refresh_token(&state.config, &headers, &body)?.ok_or(IdentityError::MissingToken)?;

    let use_case = RefreshUseCase::new(state.repo.clone(), state.config.clone());
    let output = use_case.execute(&refresh_token).await?;

    token_response(&state.config, output.tokens)
}

/// POST /v1/auth/logout
///
/// Only needs a verified access token, not an active session, so that a
/// repeated logout reports `AlreadyLoggedOut` instead of `SessionExpired`.
pub async fn logout<R>(
    State(state): State<IdentityAppState<R>>,
    headers: HeaderMap,
) -> IdentityResult<Response>
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    let access_token = bearer_token(&headers).ok_or(IdentityError::MissingToken)?;
    let caller = AuthenticateUseCase::new(state.repo.clone())
        .identify(access_token)
        .await?;

    let message = match LogoutUseCase::new(state.repo.clone())
        .execute(&caller.identifier)
        .await
    {
        Ok(_) => "Logged out".to_string(),
        Err(e) if e.is_already_in_state() => e.to_string(),
        Err(e) => return Err(e),
    };

    let mut response = Json(MessageResponse::success(message)).into_response();
    if state.config.refresh_transport == RefreshTransport::Cookie {
        let cookie = state.config.refresh_cookie().build_delete_cookie();
        set_cookie(&mut response, &cookie)?;
    }

    Ok(response)
}

// ============================================================================
// Account (requires authentication)
// ============================================================================

/// GET /v1/account/profile
pub async fn profile<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(caller): Extension<AuthenticatedAccount>,
) -> IdentityResult<Json<ProfileResponse>>
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    let view = AccountUseCase::new(state.repo.clone()).profile(&caller).await?;
    Ok(Json(view.into()))
}

/// PUT /v1/account/profile
pub async fn update_profile<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(caller): Extension<AuthenticatedAccount>,
    Json(req): Json<UpdateProfileRequest>,
) -> IdentityResult<Json<ProfileResponse>>
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    let input = UpdateProfileInput {
        first_name: req.first_name,
        last_name: req.last_name,
        address: req.address,
    };

    let view = AccountUseCase::new(state.repo.clone())
        .update_profile(&caller, input)
        .await?;
    Ok(Json(view.into()))
}

/// DELETE /v1/account/profile
pub async fn deactivate<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(caller): Extension<AuthenticatedAccount>,
) -> IdentityResult<Json<MessageResponse>>
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    AccountUseCase::new(state.repo.clone())
        .deactivate(&caller)
        .await?;
    Ok(Json(MessageResponse::success("Account deactivated")))
}

/// PATCH /v1/account/role
pub async fn update_role<R>(
    State(state): State<IdentityAppState<R>>,
    Extension(caller): Extension<AuthenticatedAccount>,
    Json(req): Json<UpdateRoleRequest>,
) -> IdentityResult<Json<ProfileResponse>>
where
    R: AccountRepository + Clone + Send + Sync + 'static,
{
    let view = AccountUseCase::new(state.repo.clone())
        .update_role(&caller, &req.identifier, &req.role)
        .await?;
    Ok(Json(view.into()))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Token pair in the body, or access token in the body and refresh token in
/// a cookie
fn token_response(config: &IdentityConfig, tokens: SessionTokens) -> IdentityResult<Response> {
    match config.refresh_transport {
        RefreshTransport::Body => Ok(Json(TokenResponse::bearer(
            tokens.access_token,
            Some(tokens.refresh_token),
        ))
        .into_response()),
        RefreshTransport::Cookie => {
            let cookie = config.refresh_cookie().build_set_cookie(&tokens.refresh_token);
            let mut response =
                Json(TokenResponse::bearer(tokens.access_token, None)).into_response();
            set_cookie(&mut response, &cookie)?;
            Ok(response)
        }
    }
}

fn presented_refresh_token(
    config: &IdentityConfig,
    headers: &HeaderMap,
    body: &[u8],
) -> IdentityResult<Option<String>> {
    if config.refresh_transport == RefreshTransport::Cookie {
        if let Some(token) = platform::cookie::extract_cookie(headers, &config.refresh_cookie_name)
        {
            return Ok(Some(token));
        }
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let req: RefreshRequest = serde_json::from_slice(body).map_err(AppError::from)?;
    Ok(req.refresh_token.filter(|token| !token.is_empty()))
}

fn set_cookie(response: &mut Response, cookie: &str) -> IdentityResult<()> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| IdentityError::Internal(format!("Invalid Set-Cookie value: {e}")))?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}
