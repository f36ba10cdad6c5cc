//! Console configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SOKONI_MEDIA_BUCKET` - Object storage bucket for product images
//!
//! ## Optional
//! - `SOKONI_API_BASE_URL` - REST backend base URL
//!   (default: http://localhost:8080/api/v1)
//! - `SOKONI_MEDIA_BASE_URL` - Object storage base URL
//!   (default: <https://firebasestorage.googleapis.com>)
//! - `SOKONI_MEDIA_TOKEN` - Bearer token for storage writes/deletes
//! - `SOKONI_DATA_DIR` - Directory for persisted console state
//!   (default: .sokoni)

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Console application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// REST backend base URL (no trailing slash).
    pub api_base_url: String,
    /// Object storage configuration.
    pub media: MediaConfig,
    /// Directory holding persisted console state.
    pub data_dir: PathBuf,
}

/// Object storage configuration.
///
/// Implements `Debug` manually to redact the bearer token.
#[derive(Clone)]
pub struct MediaConfig {
    /// Storage service base URL (no trailing slash).
    pub base_url: String,
    /// Bucket holding uploaded objects.
    pub bucket: String,
    /// Bearer token for writes and deletes, when the bucket requires one.
    pub token: Option<SecretString>,
}

impl std::fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaConfig")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a URL
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = get_base_url("SOKONI_API_BASE_URL", "http://localhost:8080/api/v1")?;
        let media = MediaConfig::from_env()?;
        let data_dir = PathBuf::from(get_env_or_default("SOKONI_DATA_DIR", ".sokoni"));

        Ok(Self {
            api_base_url,
            media,
            data_dir,
        })
    }
}

impl MediaConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_base_url(
                "SOKONI_MEDIA_BASE_URL",
                "https://firebasestorage.googleapis.com",
            )?,
            bucket: get_required_env("SOKONI_MEDIA_BUCKET")?,
            token: get_optional_env("SOKONI_MEDIA_TOKEN").map(SecretString::from),
        })
    }

    /// Host of the storage service, used to recognise our own download URLs.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.base_url)
            .ok()
            .and_then(|u| u.host_str().map(ToOwned::to_owned))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a base URL (defaulted), validated and with any trailing slash removed.
fn get_base_url(key: &str, default: &str) -> Result<String, ConfigError> {
    let raw = get_env_or_default(key, default);
    let url = Url::parse(&raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_strips_trailing_slash() {
        let url = get_base_url("SOKONI_TEST_UNSET_URL", "http://localhost:8080/api/v1/").unwrap();
        assert_eq!(url, "http://localhost:8080/api/v1");
    }

    #[test]
    fn test_base_url_rejects_garbage() {
        let result = get_base_url("SOKONI_TEST_UNSET_URL", "not a url");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_base_url_rejects_non_http_scheme() {
        let result = get_base_url("SOKONI_TEST_UNSET_URL", "ftp://example.com");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_media_host() {
        let media = MediaConfig {
            base_url: "https://firebasestorage.googleapis.com".to_string(),
            bucket: "sokoni-images".to_string(),
            token: None,
        };
        assert_eq!(
            media.host().as_deref(),
            Some("firebasestorage.googleapis.com")
        );
    }

    #[test]
    fn test_media_debug_redacts_token() {
        let media = MediaConfig {
            base_url: "https://firebasestorage.googleapis.com".to_string(),
            bucket: "sokoni-images".to_string(),
            token: Some(SecretString::from("very-secret-upload-token")),
        };

        let debug_output = format!("{media:?}");
        assert!(debug_output.contains("sokoni-images"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("very-secret-upload-token"));
    }
}
