//! Session management: token acquisition and invalidation, startup
//! bootstrap, and the cached profile of the current user.
//!
//! The session moves between four states:
//!
//! ```text
//!  Anonymous ──login/register──▶ Authenticating ──ok──▶ Authenticated
//!      ▲                               │                     │
//!      └──────────── error ────────────┘◀────── logout ──────┘
//!
//!  (startup with stored token) Bootstrapping ──ok──▶ Authenticated
//!                                    └──error (token cleared)──▶ Anonymous
//! ```
//!
//! Login and registration are serialized, and the loading flag is reset by a
//! drop guard so it can never stay set after a call returns or is cancelled.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use super::CredentialStore;
use crate::api::{ApiClient, ApiError};
use crate::models::{LoginRequest, Profile, ProfileUpdate, RegisterRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
    Bootstrapping,
}

/// One place a login response may carry its token.
#[derive(Clone, Copy)]
pub struct TokenCandidate {
    pub name: &'static str,
    pub extract: fn(&Value) -> Option<&str>,
}

fn token_field(payload: &Value) -> Option<&str> {
    payload.get("token").and_then(Value::as_str)
}

fn access_token_field(payload: &Value) -> Option<&str> {
    payload.get("accessToken").and_then(Value::as_str)
}

fn jwt_field(payload: &Value) -> Option<&str> {
    payload.get("jwt").and_then(Value::as_str)
}

/// Login response token locations, in priority order.
pub const TOKEN_CANDIDATES: &[TokenCandidate] = &[
    TokenCandidate { name: "token", extract: token_field },
    TokenCandidate { name: "accessToken", extract: access_token_field },
    TokenCandidate { name: "jwt", extract: jwt_field },
    TokenCandidate { name: "raw", extract: Value::as_str },
];

/// First non-blank token found by [`TOKEN_CANDIDATES`].
pub fn resolve_token(payload: &Value) -> Option<String> {
    TOKEN_CANDIDATES.iter().find_map(|candidate| {
        (candidate.extract)(payload)
            .filter(|token| !token.trim().is_empty())
            .map(|token| {
                debug!(field = candidate.name, "Resolved token from login response");
                token.to_string()
            })
    })
}

#[derive(Debug, Default)]
struct Inner {
    profile: Option<Profile>,
    bootstrapped: bool,
    bootstrap_pending: bool,
    in_flight: usize,
    authenticating: usize,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Bootstrap,
    Authenticate,
}

/// Marks a call as in flight for as long as it lives.
struct LoadingGuard<'a> {
    inner: &'a Mutex<Inner>,
    kind: CallKind,
}

impl<'a> LoadingGuard<'a> {
    fn begin(inner: &'a Mutex<Inner>, kind: CallKind) -> Self {
        let mut state = lock(inner);
        state.in_flight += 1;
        match kind {
            CallKind::Authenticate => state.authenticating += 1,
            CallKind::Bootstrap => state.bootstrap_pending = true,
        }
        Self { inner, kind }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.inner);
        state.in_flight = state.in_flight.saturating_sub(1);
        match self.kind {
            CallKind::Authenticate => {
                state.authenticating = state.authenticating.saturating_sub(1)
            }
            CallKind::Bootstrap => state.bootstrap_pending = false,
        }
    }
}

/// Owns the session: the profile snapshot and the loading state, with the
/// token itself kept in the shared [`CredentialStore`].
pub struct SessionManager {
    api: ApiClient,
    store: Arc<CredentialStore>,
    inner: Mutex<Inner>,
    auth_lock: AsyncMutex<()>,
}

impl SessionManager {
    /// Create a session over the client's credential store.
    ///
    /// Starts in `Bootstrapping` when a token is already stored, else `Anonymous`.
    pub fn new(api: ApiClient) -> Self {
        let store = Arc::clone(api.credential_store());
        let has_token = match store.get() {
            Ok(token) => token.is_some(),
            Err(e) => {
                warn!(error = %e, "Could not read stored token, starting anonymous");
                false
            }
        };

        Self {
            api,
            store,
            inner: Mutex::new(Inner {
                bootstrap_pending: has_token,
                ..Inner::default()
            }),
            auth_lock: AsyncMutex::new(()),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn state(&self) -> SessionState {
        let inner = lock(&self.inner);
        if inner.authenticating > 0 {
            SessionState::Authenticating
        } else if inner.bootstrap_pending {
            SessionState::Bootstrapping
        } else if inner.profile.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    /// True while a login, registration or bootstrap call is in flight.
    pub fn loading(&self) -> bool {
        lock(&self.inner).in_flight > 0
    }

    pub fn profile(&self) -> Option<Profile> {
        lock(&self.inner).profile.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// The stored token, if any. Storage failures read as no token.
    pub fn token(&self) -> Option<String> {
        self.store.get().ok().flatten()
    }

    /// Restore the session from a stored token. Runs once; later calls only
    /// report the current state.
    ///
    /// An invalid token is cleared and the session drops to `Anonymous`;
    /// that failure is logged, never returned.
    pub async fn bootstrap(&self) -> SessionState {
        let first_run = {
            let mut inner = lock(&self.inner);
            !std::mem::replace(&mut inner.bootstrapped, true)
        };
        if !first_run {
            debug!("Bootstrap already ran");
            return self.state();
        }

        let _serial = self.auth_lock.lock().await;

        let token = match self.store.get() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read stored token during bootstrap");
                None
            }
        };
        if token.is_none() {
            lock(&self.inner).bootstrap_pending = false;
            debug!("No stored token, staying anonymous");
            return self.state();
        }

        let loading = LoadingGuard::begin(&self.inner, CallKind::Bootstrap);
        match self.fetch_profile().await {
            Ok(Some(profile)) => info!(user = %profile.display_name(), "Session restored"),
            Ok(None) => debug!("Token disappeared during bootstrap"),
            Err(e) => {
                warn!(error = %e, "Stored token rejected, clearing it");
                self.discard_session();
            }
        }
        drop(loading);

        self.state()
    }

    /// Log in and load the profile.
    ///
    /// If the profile cannot be loaded the new token is cleared again and a
    /// `ProfileFetch` error is returned, the same policy as bootstrap.
    pub async fn login(&self, credentials: &LoginRequest) -> Result<Profile, ApiError> {
        let _loading = LoadingGuard::begin(&self.inner, CallKind::Authenticate);
        let _serial = self.auth_lock.lock().await;
        self.login_serialized(credentials).await
    }

    /// Register an account, then log in with the same credentials.
    pub async fn register(&self, payload: &RegisterRequest) -> Result<Profile, ApiError> {
        let _loading = LoadingGuard::begin(&self.inner, CallKind::Authenticate);
        let _serial = self.auth_lock.lock().await;

        info!(username = %payload.username, "Registering account");
        self.api.register(payload).await?;
        self.login_serialized(&payload.credentials()).await
    }

    /// Caller must hold `auth_lock`.
    async fn login_serialized(&self, credentials: &LoginRequest) -> Result<Profile, ApiError> {
        info!(username = %credentials.username, "Logging in");
        let response = self.api.login(credentials).await?;

        let token = resolve_token(&response).ok_or_else(|| {
            warn!("Login response carried no token");
            ApiError::MissingCredential
        })?;
        self.store.set(Some(&token))?;
        {
            // A fresh token supersedes any restore still waiting to run
            let mut inner = lock(&self.inner);
            inner.bootstrapped = true;
            inner.bootstrap_pending = false;
        }

        match self.fetch_profile().await {
            Ok(Some(profile)) => {
                info!(user = %profile.display_name(), "Logged in");
                Ok(profile)
            }
            Ok(None) => Err(ApiError::ProfileFetch {
                message: "Session ended before the profile was loaded".to_string(),
            }),
            Err(e) => {
                warn!(error = %e, "Profile fetch failed after login, discarding token");
                self.discard_session();
                Err(e)
            }
        }
    }

    /// Load the profile for the stored token, replacing the cached one.
    ///
    /// Returns `Ok(None)` without a network call when there is no token.
    pub async fn fetch_profile(&self) -> Result<Option<Profile>, ApiError> {
        let Some(token) = self.store.get()? else {
            lock(&self.inner).profile = None;
            return Ok(None);
        };

        let profile = self
            .api
            .current_user()
            .await
            .map_err(ApiError::into_profile_fetch)?;

        Ok(self.adopt_profile(&token, profile))
    }

    /// Edit the current user's profile and cache the server's copy.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ApiError> {
        let token = self.store.get()?.ok_or(ApiError::MissingCredential)?;
        let profile = self.api.update_current_user(update).await?;
        self.adopt_profile(&token, profile.clone());
        Ok(profile)
    }

    /// Cache `profile` only if `token` is still the live token. A logout or a
    /// login as someone else may have happened while the request was in flight.
    fn adopt_profile(&self, token: &str, profile: Profile) -> Option<Profile> {
        // Checked under the state lock so a concurrent discard always wins
        let mut inner = lock(&self.inner);
        if self.token().as_deref() != Some(token) {
            debug!("Token changed while the profile was loading, dropping result");
            return None;
        }
        inner.profile = Some(profile.clone());
        Some(profile)
    }

    /// Forget the token and the profile. Always succeeds.
    pub fn logout(&self) {
        self.discard_session();
        info!("Logged out");
    }

    fn discard_session(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored token");
        }
        let mut inner = lock(&self.inner);
        inner.profile = None;
        inner.bootstrap_pending = false;
    }
}
