//! Obfuscated, durable persistence of the session payload

use crate::codec::{CodecError, Obfuscator};
use crate::storage::{KeyValueStore, StorageError};
use crate::types::{SessionPayload, UserProfile};
use std::sync::Arc;
use talent_core::SessionConfig;
use tracing::{debug, warn};

/// Owns the durable copy of the session under a single storage key
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
    key: String,
    codec: Obfuscator,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, key: impl Into<String>, codec: Obfuscator) -> Self {
        Self {
            backend,
            key: key.into(),
            codec,
        }
    }

    /// Build a store using the configured key and secret
    pub fn from_config(
        backend: Arc<dyn KeyValueStore>,
        config: &SessionConfig,
    ) -> Result<Self, CodecError> {
        let codec = Obfuscator::new(&config.obfuscation_secret)?;
        Ok(Self::new(backend, config.storage_key.clone(), codec))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persist the session, overwriting any existing entry
    pub fn save(
        &self,
        user: &UserProfile,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), StorageError> {
        let payload = SessionPayload {
            user: Some(user.clone()),
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
        };
        self.write(&payload)
    }

    fn write(&self, payload: &SessionPayload) -> Result<(), StorageError> {
        let plain = serde_json::to_string(payload)?;
        self.backend.set(&self.key, &self.codec.encode(&plain))?;
        debug!(key = %self.key, "Session persisted");
        Ok(())
    }

    /// Load the session, distinguishing "absent" from the failure cause
    pub fn try_load(&self) -> Result<Option<SessionPayload>, StorageError> {
        let Some(raw) = self.backend.get(&self.key)? else {
            return Ok(None);
        };
        let plain = self.codec.decode(&raw)?;
        Ok(Some(serde_json::from_str(&plain)?))
    }

    /// Load the session; any failure reads as "no session"
    pub fn load(&self) -> Option<SessionPayload> {
        match self.try_load() {
            Ok(payload) => payload,
            Err(e) if e.is_corrupted() => {
                warn!(key = %self.key, error = %e, "Discarding corrupted stored session");
                None
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read stored session");
                None
            }
        }
    }

    /// Remove the stored session; clearing an empty store is a no-op
    pub fn clear(&self) -> Result<(), StorageError> {
        self.backend.remove(&self.key)?;
        debug!(key = %self.key, "Stored session cleared");
        Ok(())
    }

    /// Replace the tokens of the stored session, keeping its user
    ///
    /// Returns `false` when there is no stored session to update.
    pub fn update_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<bool, StorageError> {
        let Some(mut payload) = self.try_load()? else {
            return Ok(false);
        };
        payload.access_token = access_token.to_string();
        if let Some(refresh_token) = refresh_token {
            payload.refresh_token = Some(refresh_token.to_string());
        }
        self.write(&payload)?;
        Ok(true)
    }

    /// Stored access token, if present and non-empty
    pub fn access_token(&self) -> Option<String> {
        self.load()
            .map(|p| p.access_token)
            .filter(|t| !t.is_empty())
    }

    /// Stored refresh token, if present and non-empty
    pub fn refresh_token(&self) -> Option<String> {
        self.load()
            .and_then(|p| p.refresh_token)
            .filter(|t| !t.is_empty())
    }

    pub fn user_profile(&self) -> Option<UserProfile> {
        self.load().and_then(|p| p.user)
    }
}
