//! Configuration module for environment variable parsing.
//!
//! Everything is read once at process start. Binaries call
//! [`load_dotenv`] first so a local `.env` file can supply the same keys.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::resend::DEFAULT_BASE_URL;

/// Sender used when `EMAIL_FROM` is not set.
pub const DEFAULT_FROM: &str = "Acme <onboarding@resend.dev>";

/// Landing page linked from the confirmation email when
/// `CONFIRM_REDIRECT_URL` is not set.
pub const DEFAULT_CONFIRM_URL: &str = "https://example.com/confirmed";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Resend API key. Required by both binaries.
    pub api_key: Option<String>,

    /// Webhook signing secret (`whsec_...`). Checked per request.
    pub webhook_secret: Option<String>,

    /// Default `From` address for outgoing mail
    pub email_from: String,

    /// Audience holding double opt-in contacts
    pub audience_id: Option<String>,

    /// Link placed behind the "Confirm Subscription" button
    pub confirm_redirect_url: String,

    /// Port for the web server to listen on
    pub port: u16,

    /// Base URL of the Resend API
    pub api_base_url: String,

    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Maximum distance in seconds between a webhook timestamp and now
    pub webhook_tolerance_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            api_key: non_empty("RESEND_API_KEY"),

            webhook_secret: non_empty("RESEND_WEBHOOK_SECRET"),

            email_from: non_empty("EMAIL_FROM").unwrap_or_else(|| DEFAULT_FROM.to_string()),

            audience_id: non_empty("RESEND_AUDIENCE_ID"),

            confirm_redirect_url: non_empty("CONFIRM_REDIRECT_URL")
                .unwrap_or_else(|| DEFAULT_CONFIRM_URL.to_string()),

            port: parse_or("PORT", 3000),

            api_base_url: non_empty("RESEND_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 30_000),

            webhook_tolerance_secs: parse_or("WEBHOOK_TOLERANCE_SECS", 300), // 5 minutes
        }
    }

    /// The API key, or an error suitable for aborting startup.
    pub fn require_api_key(&self) -> anyhow::Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("RESEND_API_KEY environment variable is required"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn webhook_tolerance(&self) -> Duration {
        Duration::from_secs(self.webhook_tolerance_secs)
    }
}

/// Load `.env` from the working directory if one exists.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!(error = %e, "dotenv_load_failed");
        }
    }
}

/// Read a variable, treating an empty or whitespace-only value as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a numeric variable, falling back to `default` when unset or invalid.
fn parse_or<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_valid() {
        env::set_var("MAILKIT_TEST_PORT", "8081");
        assert_eq!(parse_or("MAILKIT_TEST_PORT", 3000u16), 8081);
        env::remove_var("MAILKIT_TEST_PORT");
    }

    #[test]
    fn test_parse_or_invalid_falls_back() {
        env::set_var("MAILKIT_TEST_TIMEOUT", "soon");
        assert_eq!(parse_or("MAILKIT_TEST_TIMEOUT", 30_000u64), 30_000);
        env::remove_var("MAILKIT_TEST_TIMEOUT");
    }

    #[test]
    fn test_parse_or_default() {
        assert_eq!(parse_or("MAILKIT_NONEXISTENT_VAR", 42u64), 42);
    }

    #[test]
    fn test_non_empty_treats_blank_as_unset() {
        env::set_var("MAILKIT_TEST_BLANK", "   ");
        assert_eq!(non_empty("MAILKIT_TEST_BLANK"), None);
        env::remove_var("MAILKIT_TEST_BLANK");

        env::set_var("MAILKIT_TEST_SET", " aud_123 ");
        assert_eq!(non_empty("MAILKIT_TEST_SET"), Some("aud_123".to_string()));
        env::remove_var("MAILKIT_TEST_SET");
    }

    #[test]
    fn test_require_api_key() {
        let mut config = Config::from_env();
        config.api_key = None;
        assert!(config.require_api_key().is_err());

        config.api_key = Some("re_123".to_string());
        assert_eq!(config.require_api_key().unwrap(), "re_123");
    }
}
