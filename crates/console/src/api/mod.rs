//! Thin HTTP client wrapper over the REST backend.
//!
//! Owns the base URL and the JSON request/response plumbing: bearer token
//! attachment, non-2xx status mapping, and error-message extraction from
//! `{error}` / `{message}` bodies. Endpoint paths stay with the stores that
//! call them.

pub mod types;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

/// Errors from talking to the REST backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("API error ({status}): {}", .message.as_deref().unwrap_or("(no details provided)"))]
    Status {
        /// HTTP status code of the response.
        status: reqwest::StatusCode,
        /// Message extracted from the response body, if the backend sent one.
        message: Option<String>,
    },

    /// Response body was not the expected JSON shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether the backend rejected the bearer token.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Status { status, .. } if *status == reqwest::StatusCode::UNAUTHORIZED
        )
    }

    /// The backend's own error message, when one was extracted.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            Self::Http(_) | Self::Parse(_) => None,
        }
    }
}

/// Client for the Sokoni REST API.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the backend at `base_url` (no trailing slash).
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        }
    }

    /// Base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    /// GET `path`, parsing the JSON response into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or an
    /// unparseable body.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let request = self.inner.client.get(self.url(path));
        self.execute(request, token).await
    }

    /// GET `path` with query parameters, parsing the JSON response into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or an
    /// unparseable body.
    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let request = self.inner.client.get(self.url(path)).query(query);
        self.execute(request, token).await
    }

    /// POST a JSON `body` to `path`, parsing the JSON response into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or an
    /// unparseable body.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let request = self.inner.client.post(self.url(path)).json(body);
        self.execute(request, token).await
    }

    /// PUT a JSON `body` to `path`, parsing the JSON response into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status, or an
    /// unparseable body.
    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let request = self.inner.client.put(self.url(path)).json(body);
        self.execute(request, token).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();

        // Read the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            debug!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "backend returned non-success status"
            );
            return Err(ApiError::Status {
                status,
                message: extract_error_message(&body),
            });
        }

        match serde_json::from_str(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "failed to parse backend response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }
}

/// Pull the human-readable message out of an error body.
///
/// The backend answers errors as `{"error": "..."}` or `{"message": "..."}`;
/// anything else yields `None`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["error", "message"] {
        if let Some(message) = value.get(key).and_then(|v| v.as_str())
            && !message.is_empty()
        {
            return Some(message.to_owned());
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_field() {
        assert_eq!(
            extract_error_message(r#"{"error": "Email already registered"}"#).as_deref(),
            Some("Email already registered")
        );
    }

    #[test]
    fn test_extract_message_field() {
        assert_eq!(
            extract_error_message(r#"{"message": "Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
    }

    #[test]
    fn test_extract_prefers_error_over_message() {
        let body = r#"{"error": "first", "message": "second"}"#;
        assert_eq!(extract_error_message(body).as_deref(), Some("first"));
    }

    #[test]
    fn test_extract_from_non_json() {
        assert_eq!(extract_error_message("<html>502 Bad Gateway</html>"), None);
        assert_eq!(extract_error_message(""), None);
    }

    #[test]
    fn test_extract_ignores_empty_message() {
        assert_eq!(extract_error_message(r#"{"error": ""}"#), None);
    }

    #[test]
    fn test_status_error_display() {
        let err = ApiError::Status {
            status: reqwest::StatusCode::NOT_FOUND,
            message: Some("Product not found".to_string()),
        };
        assert_eq!(err.to_string(), "API error (404 Not Found): Product not found");

        let bare = ApiError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
            message: None,
        };
        assert_eq!(
            bare.to_string(),
            "API error (502 Bad Gateway): (no details provided)"
        );
    }

    #[test]
    fn test_is_unauthorized() {
        let err = ApiError::Status {
            status: reqwest::StatusCode::UNAUTHORIZED,
            message: None,
        };
        assert!(err.is_unauthorized());

        let err = ApiError::Status {
            status: reqwest::StatusCode::FORBIDDEN,
            message: None,
        };
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new("http://localhost:8080/api/v1/");
        assert_eq!(client.base_url(), "http://localhost:8080/api/v1");
        assert_eq!(client.url("/products"), "http://localhost:8080/api/v1/products");
    }
}
