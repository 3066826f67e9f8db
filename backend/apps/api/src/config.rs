//! Server Configuration
//!
//! Read from the environment (after `.env` is loaded) at startup.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use identity::config::{IdentityConfig, RefreshTransport};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:31113";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";

/// Longest accepted token lifetime: one year
const MAX_TTL_MINUTES: u64 = 365 * 24 * 60;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_address: SocketAddr,
    pub frontend_origins: Vec<String>,
    pub identity: IdentityConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; missing and blank values are treated alike
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let bind_address: SocketAddr = var("BIND_ADDRESS")
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
            .trim()
            .parse()
            .context("BIND_ADDRESS must be a socket address")?;

        let frontend_origins: Vec<String> = var("FRONTEND_ORIGINS")
            .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let mut identity = if cfg!(debug_assertions) {
            IdentityConfig::development()
        } else {
            IdentityConfig::default()
        };
        if let Some(minutes) = var("ACCESS_TOKEN_EXPIRY") {
            identity.access_token_ttl = minutes_var("ACCESS_TOKEN_EXPIRY", &minutes)?;
        }
        if let Some(minutes) = var("REFRESH_TOKEN_EXPIRY") {
            identity.refresh_token_ttl = minutes_var("REFRESH_TOKEN_EXPIRY", &minutes)?;
        }
        if let Some(code) = var("REFRESH_TOKEN_TRANSPORT") {
            identity.refresh_transport = RefreshTransport::from_code(&code)
                .ok_or_else(|| anyhow!("REFRESH_TOKEN_TRANSPORT must be `body` or `cookie`"))?;
        }

        Ok(Self {
            database_url,
            bind_address,
            frontend_origins,
            identity,
        })
    }
}

fn minutes_var(key: &str, value: &str) -> anyhow::Result<Duration> {
    let minutes: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of minutes"))?;
    if minutes == 0 {
        return Err(anyhow!("{key} must be at least one minute"));
    }
    if minutes > MAX_TTL_MINUTES {
        return Err(anyhow!("{key} must be at most {MAX_TTL_MINUTES} minutes"));
    }
    let seconds = minutes
        .checked_mul(60)
        .ok_or_else(|| anyhow!("{key} is out of range"))?;
    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("DATABASE_URL", "postgres://localhost/stays")]).unwrap();
        assert_eq!(config.bind_address, SocketAddr::from(([0, 0, 0, 0], 31113)));
        assert_eq!(config.frontend_origins.len(), 2);
        assert_eq!(config.identity.access_token_ttl, Duration::from_secs(15 * 60));
        assert_eq!(config.identity.refresh_token_ttl, Duration::from_secs(60 * 60));
        assert_eq!(config.identity.refresh_transport, RefreshTransport::Body);
    }

    #[test]
    fn test_database_url_required() {
        assert!(config(&[]).is_err());
        assert!(config(&[("DATABASE_URL", "  ")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/stays"),
            ("BIND_ADDRESS", "127.0.0.1:8080"),
            ("ACCESS_TOKEN_EXPIRY", "5"),
            ("REFRESH_TOKEN_EXPIRY", "1440"),
            ("REFRESH_TOKEN_TRANSPORT", "Cookie"),
            ("FRONTEND_ORIGINS", "https://stays.example.com, "),
        ])
        .unwrap();
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.identity.access_token_ttl, Duration::from_secs(5 * 60));
        assert_eq!(config.identity.refresh_token_ttl, Duration::from_secs(1440 * 60));
        assert_eq!(config.identity.refresh_transport, RefreshTransport::Cookie);
        assert_eq!(config.frontend_origins, vec!["https://stays.example.com"]);
    }

    #[test]
    fn test_invalid_values() {
        let base = ("DATABASE_URL", "postgres://localhost/stays");
        assert!(config(&[base, ("ACCESS_TOKEN_EXPIRY", "soon")]).is_err());
        assert!(config(&[base, ("REFRESH_TOKEN_EXPIRY", "0")]).is_err());
        assert!(config(&[base, ("REFRESH_TOKEN_TRANSPORT", "header")]).is_err());
        assert!(config(&[base, ("BIND_ADDRESS", "localhost")]).is_err());
    }

    #[test]
    fn test_ttl_bounds() {
        let base = ("DATABASE_URL", "postgres://localhost/stays");
        assert!(config(&[base, ("ACCESS_TOKEN_EXPIRY", "307445734561825861")]).is_err());
        assert!(config(&[base, ("ACCESS_TOKEN_EXPIRY", "18446744073709551615")]).is_err());
        assert!(config(&[base, ("REFRESH_TOKEN_EXPIRY", "1000000000000")]).is_err());
        assert!(config(&[base, ("REFRESH_TOKEN_EXPIRY", "525601")]).is_err());

        let config = config(&[base, ("REFRESH_TOKEN_EXPIRY", "525600")]).unwrap();
        assert_eq!(
            config.identity.refresh_token_ttl,
            Duration::from_secs(525_600 * 60)
        );
    }
}
