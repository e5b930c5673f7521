//! Login state: the persisted credential pair, the bearer default on the
//! shared API client, and the cached profile of the signed-in user.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::api::{ApiClient, ApiError, ProfilePatch, RegisterRequest, User};
use crate::core::storage::StorageError;
use crate::core::token_store::{CredentialPair, TokenStore};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";
const PROFILE_FAILED: &str = "Could not load your profile";
const PROFILE_UPDATE_FAILED: &str = "Profile update failed";
const REGISTRATION_FIELDS: &[&str] = &["username", "email"];

#[derive(Debug)]
pub enum AuthError {
    /// The backend rejected the submitted credentials or form.
    InvalidCredentials { message: String },
    MissingToken,
    Expired,
    ProfileFetch { message: String },
    Network(String),
    Storage(StorageError),
}

impl AuthError {
    fn rejected(err: ApiError, preferred: &[&str], fallback: &str) -> Self {
        match err {
            ApiError::Status { .. } => AuthError::InvalidCredentials {
                message: err
                    .body_message(preferred)
                    .unwrap_or_else(|| fallback.to_string()),
            },
            other => AuthError::Network(other.to_string()),
        }
    }

    fn profile(err: ApiError, fallback: &str) -> Self {
        if err.is_unauthorized() {
            return AuthError::Expired;
        }
        match err {
            ApiError::Status { .. } => AuthError::ProfileFetch {
                message: err
                    .body_message(&[])
                    .unwrap_or_else(|| fallback.to_string()),
            },
            other => AuthError::Network(other.to_string()),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials { message } | AuthError::ProfileFetch { message } => {
                write!(f, "{message}")
            }
            AuthError::MissingToken => write!(f, "You are not logged in"),
            AuthError::Expired => write!(f, "Your session has expired; please log in again"),
            AuthError::Network(reason) => write!(f, "{reason}"),
            AuthError::Storage(err) => write!(f, "Could not store credentials: {err}"),
        }
    }
}

impl StdError for AuthError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            AuthError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::Storage(err)
    }
}

/// Owns who is signed in.
///
/// Every token change goes through here so the stored pair and the bearer
/// default on the shared [`ApiClient`] never disagree.
pub struct AuthSession {
    api: Arc<ApiClient>,
    tokens: TokenStore,
    user: Option<User>,
    loading: bool,
}

impl AuthSession {
    /// Starts in the loading state until [`AuthSession::init`] has run.
    pub fn new(api: Arc<ApiClient>, tokens: TokenStore) -> Self {
        Self {
            api,
            tokens,
            user: None,
            loading: true,
        }
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn current_user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Restore a previous login. Any failure signs out silently.
    pub async fn init(&mut self) {
        self.loading = true;
        if let Some(pair) = self.tokens.load() {
            self.api.set_bearer(&pair.access);
            match self.api.profile().await {
                Ok(user) => {
                    tracing::info!(username = %user.username, "Restored login");
                    self.user = Some(user);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Stored login is no longer valid; signing out");
                    self.logout();
                }
            }
        }
        self.loading = false;
    }

    fn install(&mut self, pair: &CredentialPair) -> Result<(), AuthError> {
        self.tokens.save(pair)?;
        self.api.set_bearer(&pair.access);
        Ok(())
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<&User, AuthError> {
        let tokens = self
            .api
            .login(username, password)
            .await
            .map_err(|err| AuthError::rejected(err, &[], LOGIN_FAILED))?;
        self.install(&CredentialPair {
            access: tokens.access,
            refresh: tokens.refresh,
        })?;

        let user = match self.api.profile().await {
            Ok(user) => user,
            Err(err) => {
                self.logout();
                return Err(AuthError::profile(err, PROFILE_FAILED));
            }
        };
        tracing::info!(username = %user.username, "Logged in");
        Ok(&*self.user.insert(user))
    }

    /// The registration response already carries the new user.
    pub async fn register(&mut self, fields: &RegisterRequest) -> Result<&User, AuthError> {
        let registered = self
            .api
            .register(fields)
            .await
            .map_err(|err| AuthError::rejected(err, REGISTRATION_FIELDS, REGISTRATION_FAILED))?;
        self.install(&CredentialPair {
            access: registered.access,
            refresh: registered.refresh,
        })?;
        tracing::info!(username = %registered.user.username, "Registered new account");
        Ok(&*self.user.insert(registered.user))
    }

    pub fn logout(&mut self) {
        if let Err(err) = self.tokens.clear() {
            tracing::warn!(error = %err, "Failed to remove stored credentials");
        }
        self.api.clear_bearer();
        if let Some(user) = self.user.take() {
            tracing::info!(username = %user.username, "Logged out");
        }
    }

    /// Forget the in-memory login without touching stored credentials.
    pub fn dispose(&mut self) {
        self.api.clear_bearer();
        self.user = None;
    }

    /// Swap the stored access token for a fresh one.
    pub async fn refresh(&mut self) -> Result<(), AuthError> {
        let pair = self.tokens.load().ok_or(AuthError::MissingToken)?;
        let refreshed = self.api.refresh(&pair.refresh).await.map_err(|err| {
            if err.is_unauthorized() {
                AuthError::Expired
            } else {
                AuthError::Network(err.to_string())
            }
        })?;
        self.install(&CredentialPair {
            access: refreshed.access,
            refresh: refreshed.refresh.unwrap_or(pair.refresh),
        })?;
        tracing::debug!("Refreshed access token");
        Ok(())
    }

    pub async fn update_profile(&mut self, patch: &ProfilePatch) -> Result<&User, AuthError> {
        if self.tokens.load().is_none() {
            return Err(AuthError::MissingToken);
        }
        let user = self
            .api
            .update_profile(patch)
            .await
            .map_err(|err| AuthError::profile(err, PROFILE_UPDATE_FAILED))?;
        Ok(&*self.user.insert(user))
    }
}
