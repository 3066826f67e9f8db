//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::AccountView;
use crate::domain::value_object::AccountRole;

// ============================================================================
// Register / Activate
// ============================================================================

/// Register request; at least one of `email` / `phone` is required
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterResponse {
    pub account_id: String,
    pub role: AccountRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivateRequest {
    /// Email or phone number
    pub identifier: String,
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Email or phone number
    pub identifier: String,
    pub password: String,
}

/// Refresh request body; in cookie transport the cookie is used instead
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Login / refresh response
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Absent in cookie transport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    pub fn bearer(access_token: String, refresh_token: Option<String>) -> Self {
        Self {
            access_token,
            token_type: "Bearer",
            refresh_token,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: String,
}

impl MessageResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: message.into(),
        }
    }
}

// ============================================================================
// Account
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub account_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: AccountRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountView> for ProfileResponse {
    fn from(view: AccountView) -> Self {
        Self {
            account_id: view.account_id.to_string(),
            email: view.email,
            phone: view.phone,
            role: view.role,
            first_name: view.profile.first_name,
            last_name: view.profile.last_name,
            address: view.profile.address,
            created_at: view.created_at,
            updated_at: view.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoleRequest {
    /// Email or phone number of the target account
    pub identifier: String,
    pub role: String,
}
