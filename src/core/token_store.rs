use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::storage::{read_json, write_json, KeyValueStore, StorageError};

pub const CREDENTIALS_KEY: &str = "credentials";

/// Access and refresh token issued by the backend's auth endpoints.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access: String,
    pub refresh: String,
}

// Tokens never show up in logs or panics.
impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Persists the credential pair as a single JSON value.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Absent and unreadable credentials both come back as `None`.
    pub fn load(&self) -> Option<CredentialPair> {
        match read_json(self.backend.as_ref(), CREDENTIALS_KEY) {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(error = %err, "Ignoring unreadable stored credentials");
                None
            }
        }
    }

    pub fn save(&self, pair: &CredentialPair) -> Result<(), StorageError> {
        write_json(self.backend.as_ref(), CREDENTIALS_KEY, pair)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.backend.delete(CREDENTIALS_KEY)
    }

    pub fn access_token(&self) -> Option<String> {
        self.load().map(|pair| pair.access)
    }
}
