//! Wire envelopes for the account and catalog endpoints.

use serde::{Deserialize, Serialize};
use sokoni_core::{Product, UserProfile};

/// Successful register/login response.
///
/// Older backend builds name the access token `token`, newer ones
/// `access_token`; the alias accepts either.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: UserProfile,
}

/// `{ user }` envelope from the profile endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEnvelope {
    pub user: UserProfile,
}

/// `{ product }` envelope from the single-product endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductEnvelope {
    #[serde(default)]
    pub product: Option<Product>,
}

/// Successful token refresh response.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    /// Present when the backend rotates the refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// `POST /users/login` request body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /users/refresh` request body.
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}
