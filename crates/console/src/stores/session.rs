//! Session store: current user, token pair, and the auth flows around them.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use sokoni_core::{NewUser, ProfileUpdate, UserProfile};

use crate::api::types::{AuthResponse, LoginRequest, RefreshRequest, RefreshResponse, UserEnvelope};
use crate::api::{ApiClient, ApiError};
use crate::storage::{SharedKv, keys};

use super::BusyGuard;

/// Errors from session actions.
///
/// The register/login/update variants carry the backend's own message (or
/// the action's default) so display surfaces can show it verbatim.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Registration was rejected.
    #[error("{0}")]
    Registration(String),

    /// Login was rejected.
    #[error("{0}")]
    Authentication(String),

    /// The action needs a signed-in session.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// A refresh was requested with no refresh token held.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The refresh endpoint rejected the refresh token.
    #[error("Token refresh failed")]
    TokenRefresh,

    /// Profile update was rejected.
    #[error("{0}")]
    Update(String),

    /// Transport or response-shape failure below the session layer.
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Default)]
struct SessionState {
    user: Option<UserProfile>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    error: Option<String>,
}

struct SessionInner {
    api: ApiClient,
    kv: SharedKv,
    state: RwLock<SessionState>,
    in_flight: AtomicU32,
}

/// Owns the current-user identity and token pair.
///
/// Construction only seeds tokens from the persistence port; the profile
/// fetch happens in [`SessionStore::initialize`], which the application
/// calls once and awaits. All flows fail closed: an irrecoverable fetch or
/// refresh failure clears the whole session.
///
/// State machine: `Anonymous -> (login | register) -> Authenticated ->
/// (logout | irrecoverable failure) -> Anonymous`, with a transient
/// refresh-and-retry sub-state inside `Authenticated` when a request meets
/// a 401.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl SessionStore {
    /// Create a store, seeding the token pair from persisted entries.
    #[must_use]
    pub fn new(api: ApiClient, kv: SharedKv) -> Self {
        let access_token = read_entry(&kv, keys::ACCESS_TOKEN);
        let refresh_token = read_entry(&kv, keys::REFRESH_TOKEN);

        Self {
            inner: Arc::new(SessionInner {
                api,
                kv,
                state: RwLock::new(SessionState {
                    user: None,
                    access_token,
                    refresh_token,
                    error: None,
                }),
                in_flight: AtomicU32::new(0),
            }),
        }
    }

    /// One-time entry point after construction: fetch the profile belonging
    /// to a persisted access token, if there is one.
    ///
    /// Returns `None` (without a request) when no token is held; otherwise
    /// behaves exactly like [`SessionStore::fetch_current_user`]. Completion
    /// of the returned future is the signal that session restore finished.
    pub async fn initialize(&self) -> Option<UserProfile> {
        if self.inner.state.read().await.access_token.is_none() {
            return None;
        }
        self.fetch_current_user().await
    }

    // =========================================================================
    // Auth flows
    // =========================================================================

    /// Register a new account and sign it in.
    ///
    /// On success the token pair is stored and persisted and the profile is
    /// held as the current user.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Registration`] with the backend's message
    /// when the registration is rejected, or [`SessionError::Api`] on
    /// transport failures.
    #[instrument(skip(self, new_user), fields(email = %new_user.email))]
    pub async fn register(&self, new_user: &NewUser) -> Result<UserProfile, SessionError> {
        let _busy = BusyGuard::enter(&self.inner.in_flight);
        self.set_error(None).await;

        let result: Result<AuthResponse, ApiError> =
            self.inner.api.post("/users/register", new_user, None).await;

        match result {
            Ok(auth) => Ok(self.adopt_session(auth).await),
            Err(e) => {
                let err = match e {
                    ApiError::Status { message, .. } => SessionError::Registration(
                        message.unwrap_or_else(|| "Registration failed".to_owned()),
                    ),
                    other => SessionError::Api(other),
                };
                self.set_error(Some(err.to_string())).await;
                Err(err)
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Authentication`] with the backend's message
    /// when the credentials are rejected, or [`SessionError::Api`] on
    /// transport failures.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, SessionError> {
        let _busy = BusyGuard::enter(&self.inner.in_flight);
        self.set_error(None).await;

        let result: Result<AuthResponse, ApiError> = self
            .inner
            .api
            .post("/users/login", &LoginRequest { email, password }, None)
            .await;

        match result {
            Ok(auth) => Ok(self.adopt_session(auth).await),
            Err(e) => {
                let err = match e {
                    ApiError::Status { message, .. } => SessionError::Authentication(
                        message.unwrap_or_else(|| "Login failed".to_owned()),
                    ),
                    other => SessionError::Api(other),
                };
                self.set_error(Some(err.to_string())).await;
                Err(err)
            }
        }
    }

    /// Fetch the profile for the held access token.
    ///
    /// No-op returning `None` when no token is held. On a 401 the store
    /// performs exactly one token refresh and one retry; any other failure
    /// (or a failed retry) clears the whole session and returns `None`.
    #[instrument(skip(self))]
    pub async fn fetch_current_user(&self) -> Option<UserProfile> {
        let _busy = BusyGuard::enter(&self.inner.in_flight);
        let mut retried = false;

        loop {
            let token = self.inner.state.read().await.access_token.clone()?;

            let result: Result<UserEnvelope, ApiError> =
                self.inner.api.get("/users/me", Some(&token)).await;

            match result {
                Ok(envelope) => {
                    let mut state = self.inner.state.write().await;
                    state.user = Some(envelope.user.clone());
                    return Some(envelope.user);
                }
                Err(e) if e.is_unauthorized() && !retried => {
                    debug!("access token rejected, attempting refresh");
                    retried = true;
                    if self.refresh_access_token().await.is_err() {
                        // Refresh already signed us out.
                        return None;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "profile fetch failed, signing out");
                    self.logout().await;
                    return None;
                }
            }
        }
    }

    /// Update the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotAuthenticated`] when token or user is
    /// absent, [`SessionError::Update`] with the backend's message when the
    /// update is rejected, or [`SessionError::Api`] on transport failures.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, SessionError> {
        let _busy = BusyGuard::enter(&self.inner.in_flight);
        self.set_error(None).await;

        let (token, user_id) = {
            let state = self.inner.state.read().await;
            match (&state.access_token, &state.user) {
                (Some(token), Some(user)) => (token.clone(), user.id.clone()),
                _ => {
                    drop(state);
                    let err = SessionError::NotAuthenticated;
                    self.set_error(Some(err.to_string())).await;
                    return Err(err);
                }
            }
        };

        let result: Result<UserEnvelope, ApiError> = self
            .inner
            .api
            .put(&format!("/users/{user_id}"), update, Some(&token))
            .await;

        match result {
            Ok(envelope) => {
                let mut state = self.inner.state.write().await;
                state.user = Some(envelope.user.clone());
                drop(state);
                Ok(envelope.user)
            }
            Err(e) => {
                let err = match e {
                    ApiError::Status { message, .. } => SessionError::Update(
                        message.unwrap_or_else(|| "Update failed".to_owned()),
                    ),
                    other => SessionError::Api(other),
                };
                self.set_error(Some(err.to_string())).await;
                Err(err)
            }
        }
    }

    /// Exchange the held refresh token for a new access token.
    ///
    /// On success the new access token (and refresh token, if the backend
    /// rotated it) replaces the held one in memory and in the persistence
    /// port. Any failure clears the whole session first.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoRefreshToken`] when no refresh token is
    /// held, or [`SessionError::TokenRefresh`] when the exchange fails.
    #[instrument(skip(self))]
    pub async fn refresh_access_token(&self) -> Result<String, SessionError> {
        let _busy = BusyGuard::enter(&self.inner.in_flight);

        let Some(refresh_token) = self.inner.state.read().await.refresh_token.clone() else {
            self.logout().await;
            return Err(SessionError::NoRefreshToken);
        };

        let result: Result<RefreshResponse, ApiError> = self
            .inner
            .api
            .post(
                "/users/refresh",
                &RefreshRequest {
                    refresh_token: &refresh_token,
                },
                None,
            )
            .await;

        match result {
            Ok(refresh) => {
                self.persist_entry(keys::ACCESS_TOKEN, Some(&refresh.access_token));
                if let Some(rotated) = refresh.refresh_token.as_deref() {
                    self.persist_entry(keys::REFRESH_TOKEN, Some(rotated));
                }

                let mut state = self.inner.state.write().await;
                state.access_token = Some(refresh.access_token.clone());
                if refresh.refresh_token.is_some() {
                    state.refresh_token = refresh.refresh_token;
                }
                Ok(refresh.access_token)
            }
            Err(e) => {
                debug!(error = %e, "token refresh failed, signing out");
                self.logout().await;
                Err(SessionError::TokenRefresh)
            }
        }
    }

    /// Clear the session: user, token pair, error, and the persisted token
    /// entries. Idempotent; never fails.
    pub async fn logout(&self) {
        self.persist_entry(keys::ACCESS_TOKEN, None);
        self.persist_entry(keys::REFRESH_TOKEN, None);
        *self.inner.state.write().await = SessionState::default();
    }

    // =========================================================================
    // State accessors
    // =========================================================================

    /// The signed-in user's profile, if any.
    pub async fn user(&self) -> Option<UserProfile> {
        self.inner.state.read().await.user.clone()
    }

    /// The held access token, if any.
    pub async fn access_token(&self) -> Option<String> {
        self.inner.state.read().await.access_token.clone()
    }

    /// The held refresh token, if any.
    pub async fn refresh_token(&self) -> Option<String> {
        self.inner.state.read().await.refresh_token.clone()
    }

    /// True iff both an access token and a user profile are held.
    pub async fn is_authenticated(&self) -> bool {
        let state = self.inner.state.read().await;
        state.access_token.is_some() && state.user.is_some()
    }

    /// True iff the signed-in user carries a server-issued admin claim.
    pub async fn is_admin(&self) -> bool {
        self.inner
            .state
            .read()
            .await
            .user
            .as_ref()
            .is_some_and(UserProfile::is_admin)
    }

    /// Last recorded action error, for display.
    pub async fn last_error(&self) -> Option<String> {
        self.inner.state.read().await.error.clone()
    }

    /// Clear the recorded error without altering auth state.
    pub async fn clear_error(&self) {
        self.set_error(None).await;
    }

    /// True while any session action is in flight.
    #[must_use]
    pub fn busy(&self) -> bool {
        self.inner.in_flight.load(Ordering::Relaxed) > 0
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn set_error(&self, error: Option<String>) {
        self.inner.state.write().await.error = error;
    }

    /// Store and persist a fresh token pair plus profile from an auth
    /// response, returning the profile.
    async fn adopt_session(&self, auth: AuthResponse) -> UserProfile {
        self.persist_entry(keys::ACCESS_TOKEN, Some(&auth.access_token));
        self.persist_entry(keys::REFRESH_TOKEN, auth.refresh_token.as_deref());

        let mut state = self.inner.state.write().await;
        state.access_token = Some(auth.access_token);
        state.refresh_token = auth.refresh_token;
        state.user = Some(auth.user.clone());
        auth.user
    }

    /// Best-effort write-through to the persistence port; `None` removes.
    fn persist_entry(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.inner.kv.set(key, value),
            None => self.inner.kv.remove(key),
        };
        if let Err(e) = result {
            warn!(key, error = %e, "failed to persist session entry");
        }
    }
}

fn read_entry(kv: &SharedKv, key: &str) -> Option<String> {
    match kv.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "failed to read persisted session entry");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    /// Backend address nothing listens on; used by tests that must not
    /// reach the network at all.
    fn offline_api() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9")
    }

    fn seeded_kv(entries: &[(&str, &str)]) -> SharedKv {
        Arc::new(MemoryStore::with_entries(
            entries
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned())),
        ))
    }

    #[tokio::test]
    async fn test_new_seeds_tokens_from_storage() {
        let kv = seeded_kv(&[
            (keys::ACCESS_TOKEN, "acc-1"),
            (keys::REFRESH_TOKEN, "ref-1"),
        ]);
        let store = SessionStore::new(offline_api(), kv);

        assert_eq!(store.access_token().await.as_deref(), Some("acc-1"));
        assert_eq!(store.refresh_token().await.as_deref(), Some("ref-1"));
        assert_eq!(store.user().await, None);
    }

    #[tokio::test]
    async fn test_token_without_user_is_not_authenticated() {
        let kv = seeded_kv(&[(keys::ACCESS_TOKEN, "acc-1")]);
        let store = SessionStore::new(offline_api(), kv);

        assert!(!store.is_authenticated().await);
        assert!(!store.is_admin().await);
    }

    #[tokio::test]
    async fn test_initialize_without_token_is_offline_noop() {
        let store = SessionStore::new(offline_api(), seeded_kv(&[]));
        assert_eq!(store.initialize().await, None);
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_fetch_current_user_without_token_is_offline_noop() {
        let store = SessionStore::new(offline_api(), seeded_kv(&[]));
        assert_eq!(store.fetch_current_user().await, None);
    }

    #[tokio::test]
    async fn test_update_profile_requires_session() {
        let store = SessionStore::new(offline_api(), seeded_kv(&[]));
        let result = store.update_profile(&ProfileUpdate::default()).await;
        assert!(matches!(result, Err(SessionError::NotAuthenticated)));
        assert_eq!(
            store.last_error().await.as_deref(),
            Some("Not authenticated")
        );
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_signs_out() {
        let kv = seeded_kv(&[(keys::ACCESS_TOKEN, "acc-1")]);
        let store = SessionStore::new(offline_api(), Arc::clone(&kv));

        let result = store.refresh_access_token().await;
        assert!(matches!(result, Err(SessionError::NoRefreshToken)));
        assert_eq!(store.access_token().await, None);
        assert_eq!(kv.get(keys::ACCESS_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_state_and_storage() {
        let kv = seeded_kv(&[
            (keys::ACCESS_TOKEN, "acc-1"),
            (keys::REFRESH_TOKEN, "ref-1"),
        ]);
        let store = SessionStore::new(offline_api(), Arc::clone(&kv));

        store.logout().await;
        store.logout().await; // idempotent

        assert_eq!(store.access_token().await, None);
        assert_eq!(store.refresh_token().await, None);
        assert!(!store.is_authenticated().await);
        assert_eq!(kv.get(keys::ACCESS_TOKEN).unwrap(), None);
        assert_eq!(kv.get(keys::REFRESH_TOKEN).unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear_error() {
        let store = SessionStore::new(offline_api(), seeded_kv(&[]));
        let _ = store.update_profile(&ProfileUpdate::default()).await;
        assert!(store.last_error().await.is_some());

        store.clear_error().await;
        assert_eq!(store.last_error().await, None);
    }

    #[tokio::test]
    async fn test_not_busy_at_rest() {
        let store = SessionStore::new(offline_api(), seeded_kv(&[]));
        assert!(!store.busy());
    }
}
