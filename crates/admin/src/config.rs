//! Admin API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_API_URL` - Commerce engine Admin API endpoint (e.g., `https://shop.example/admin-api`)
//! - `ADMIN_USERNAME` - Administrator login
//! - `ADMIN_PASSWORD` - Administrator password
//!
//! ## Optional
//! - `ADMIN_API_TIMEOUT_SECS` - Request timeout (default: 30)
//! - `SHOP_CHANNEL_TOKEN` - Channel token sent as `vendure-token`
//! - `PAYMENT_METHOD_CODE` - Payment method the storefront attaches payments with (default: stripe)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin API configuration.
#[derive(Clone)]
pub struct AdminConfig {
    /// Admin API GraphQL endpoint
    pub api_url: String,
    /// Administrator login
    pub username: String,
    /// Administrator password
    pub password: SecretString,
    /// Channel token, when the store has more than the default channel
    pub channel_token: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Payment method code the storefront expects to be enabled
    pub payment_method_code: String,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("api_url", &self.api_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("channel_token", &self.channel_token)
            .field("timeout", &self.timeout)
            .field("payment_method_code", &self.payment_method_code)
            .finish()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = get_required_env("ADMIN_API_URL")?;
        url::Url::parse(&api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_API_URL".to_string(), e.to_string()))?;

        let timeout_secs = get_env_or_default("ADMIN_API_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ADMIN_API_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "ADMIN_API_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_url,
            username: get_required_env("ADMIN_USERNAME")?,
            password: SecretString::from(get_required_env("ADMIN_PASSWORD")?),
            channel_token: std::env::var("SHOP_CHANNEL_TOKEN")
                .ok()
                .filter(|v| !v.is_empty()),
            timeout: Duration::from_secs(timeout_secs),
            payment_method_code: get_env_or_default("PAYMENT_METHOD_CODE", "stripe"),
        })
    }
}

/// Get a required, non-empty environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_password() {
        let config = AdminConfig {
            api_url: "http://localhost:3000/admin-api".to_string(),
            username: "superadmin".to_string(),
            password: SecretString::from("hunter2-but-longer".to_string()),
            channel_token: None,
            timeout: Duration::from_secs(30),
            payment_method_code: "stripe".to_string(),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }
}
