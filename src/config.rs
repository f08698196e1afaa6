// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup. The credential encryption secret is
//! optional so that the service can still report connection status when the
//! vault is misconfigured; vault writes fail loudly in that case.

use std::env;
use std::time::Duration;

const DEFAULT_GARMIN_SSO_URL: &str = "https://sso.garmin.com/sso";
const DEFAULT_GARMIN_API_URL: &str = "https://connectapi.garmin.com";
const DEFAULT_GARMIN_TIMEOUT_SECS: u64 = 30;

/// Application configuration, loaded once at startup.
#[derive(Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID; `None` selects the in-memory store
    pub gcp_project_id: Option<String>,
    /// Server port
    pub port: u16,
    /// Garmin SSO base URL (token exchange)
    pub garmin_sso_url: String,
    /// Garmin Connect API base URL
    pub garmin_api_url: String,
    /// Upper bound for any single call to Garmin
    pub garmin_timeout: Duration,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Secret the credential vault key is derived from
    pub credential_encryption_key: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("frontend_url", &self.frontend_url)
            .field("gcp_project_id", &self.gcp_project_id)
            .field("port", &self.port)
            .field("garmin_sso_url", &self.garmin_sso_url)
            .field("garmin_api_url", &self.garmin_api_url)
            .field("garmin_timeout", &self.garmin_timeout)
            .field("jwt_signing_key", &"<redacted>")
            .field(
                "credential_encryption_key",
                &self.credential_encryption_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Config {
    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: None,
            port: 8080,
            garmin_sso_url: "http://127.0.0.1:9/sso".to_string(),
            garmin_api_url: "http://127.0.0.1:9".to_string(),
            garmin_timeout: Duration::from_secs(2),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            credential_encryption_key: Some("test-credential-secret-do-not-use".to_string()),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let garmin_timeout_secs = match env::var("GARMIN_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::Invalid("GARMIN_TIMEOUT_SECS"))?,
            Err(_) => DEFAULT_GARMIN_TIMEOUT_SECS,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: non_empty_var("GCP_PROJECT_ID"),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            garmin_sso_url: env::var("GARMIN_SSO_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_GARMIN_SSO_URL.to_string()),
            garmin_api_url: env::var("GARMIN_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_GARMIN_API_URL.to_string()),
            garmin_timeout: Duration::from_secs(garmin_timeout_secs),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            credential_encryption_key: non_empty_var("CREDENTIAL_ENCRYPTION_KEY"),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        env::set_var("JWT_SIGNING_KEY", "test_jwt_key_32_bytes_minimum!!");
        env::set_var("CREDENTIAL_ENCRYPTION_KEY", "  local-secret  ");
        env::set_var("GARMIN_API_URL", "http://localhost:9999/");
        env::remove_var("GARMIN_TIMEOUT_SECS");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.jwt_signing_key, b"test_jwt_key_32_bytes_minimum!!");
        assert_eq!(
            config.credential_encryption_key.as_deref(),
            Some("local-secret")
        );
        assert_eq!(config.garmin_api_url, "http://localhost:9999");
        assert_eq!(config.garmin_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", Config::test_default());
        assert!(!rendered.contains("test-credential-secret"));
        assert!(!rendered.contains("test_jwt_key"));
    }
}
