//! Application Configuration
//!
//! Configuration for the identity application layer. There is no signing key
//! here; tokens are signed with each account's own salt.

use std::time::Duration;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;
use platform::cookie::CookieConfig;

/// Where the refresh token travels between client and server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshTransport {
    /// `refresh_token` field of the JSON body
    #[default]
    Body,
    /// `HttpOnly` cookie
    Cookie,
}

impl RefreshTransport {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "body" => Some(RefreshTransport::Body),
            "cookie" => Some(RefreshTransport::Cookie),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Access token lifetime (15 minutes)
    pub access_token_ttl: Duration,
    /// Refresh token lifetime (1 hour)
    pub refresh_token_ttl: Duration,
    pub refresh_transport: RefreshTransport,
    /// Refresh cookie name, in cookie transport
    pub refresh_cookie_name: String,
    /// Refresh cookie path; the cookie is only sent to the auth endpoints
    pub refresh_cookie_path: String,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(60 * 60),
            refresh_transport: RefreshTransport::Body,
            refresh_cookie_name: "refresh_token".to_string(),
            refresh_cookie_path: "/v1/auth".to_string(),
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
        }
    }
}

impl IdentityConfig {
    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Default::default()
        }
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        to_chrono(self.access_token_ttl)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        to_chrono(self.refresh_token_ttl)
    }

    /// Attributes of the refresh-token cookie
    pub fn refresh_cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.refresh_cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: self.refresh_cookie_path.clone(),
            max_age_secs: Some(self.refresh_token_ttl.as_secs()),
        }
    }
}

fn to_chrono(ttl: Duration) -> chrono::Duration {
    chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX)
}
