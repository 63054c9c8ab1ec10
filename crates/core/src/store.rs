//! Origin-scoped credential persistence
//!
//! The credential and its claim snapshot are written and cleared as a pair.
//! Storage failures never reach callers: they are logged and read back as
//! "no credential".

use crate::claims::{self, ClaimSnapshot};
use crate::error::{CoreError, CoreResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Key/value storage shared by everything running in the same origin
pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> CoreResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> CoreResult<()>;
    fn remove_item(&self, key: &str) -> CoreResult<()>;
}

/// In-process storage, used off the browser and in tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> CoreResult<()> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> CoreResult<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

/// Storage for execution contexts without an origin (server-side rendering,
/// workers without `localStorage`); every operation fails
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableStorage;

impl KeyValueStorage for UnavailableStorage {
    fn get_item(&self, _key: &str) -> CoreResult<Option<String>> {
        Err(CoreError::storage("no origin storage in this context"))
    }

    fn set_item(&self, _key: &str, _value: &str) -> CoreResult<()> {
        Err(CoreError::storage("no origin storage in this context"))
    }

    fn remove_item(&self, _key: &str) -> CoreResult<()> {
        Err(CoreError::storage("no origin storage in this context"))
    }
}

/// Persists the current credential and its claim snapshot.
///
/// Writes are reserved to the session authority; everything else reads.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Rc<dyn KeyValueStorage>,
    token_key: String,
    user_info_key: String,
}

impl CredentialStore {
    pub fn new(
        storage: Rc<dyn KeyValueStorage>,
        token_key: impl Into<String>,
        user_info_key: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            token_key: token_key.into(),
            user_info_key: user_info_key.into(),
        }
    }

    /// Replace the credential and its snapshot.
    ///
    /// The previous snapshot is dropped before anything else is written, so a
    /// partially failed write can never pair the new credential with claims
    /// from the old one.
    pub(crate) fn put(&self, credential: &str) {
        if let Err(e) = self.storage.remove_item(&self.user_info_key) {
            tracing::warn!(error = %e, "Could not drop previous claim snapshot");
        }

        if let Err(e) = self.storage.set_item(&self.token_key, credential) {
            tracing::error!(error = %e, "Failed to persist credential");
            return;
        }

        match claims::decode(credential) {
            Ok(decoded) => {
                let written = serde_json::to_string(&ClaimSnapshot::from(&decoded))
                    .map_err(CoreError::from)
                    .and_then(|json| self.storage.set_item(&self.user_info_key, &json));
                if let Err(e) = written {
                    tracing::warn!(error = %e, "Failed to persist claim snapshot");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored credential could not be decoded for snapshot");
            }
        }

        tracing::debug!("Credential stored");
    }

    pub fn get(&self) -> Option<String> {
        match self.storage.get_item(&self.token_key) {
            Ok(value) => value.filter(|token| !token.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read credential");
                None
            }
        }
    }

    /// Remove both the credential and the snapshot
    pub(crate) fn clear(&self) {
        for key in [&self.token_key, &self.user_info_key] {
            if let Err(e) = self.storage.remove_item(key) {
                tracing::warn!(key = %key, error = %e, "Failed to clear stored session entry");
            }
        }
        tracing::debug!("Credential and claim snapshot cleared");
    }

    /// Last written snapshot, without touching the credential
    pub fn cached_claims(&self) -> Option<ClaimSnapshot> {
        let raw = match self.storage.get_item(&self.user_info_key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read claim snapshot");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable claim snapshot");
                None
            }
        }
    }
}
