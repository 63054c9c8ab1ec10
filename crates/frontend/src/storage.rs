//! `localStorage` backend for the credential store

use std::rc::Rc;
use tienda_core::{CoreError, CoreResult, KeyValueStorage, UnavailableStorage};
use tracing::warn;
use web_sys::Storage;

/// The origin's `localStorage`, shared by every tab of the application
#[derive(Clone)]
pub struct BrowserStorage {
    storage: Storage,
}

impl BrowserStorage {
    /// Open the origin's `localStorage`
    pub fn local() -> CoreResult<Self> {
        let window = web_sys::window().ok_or_else(|| CoreError::storage("no window"))?;
        let storage = window
            .local_storage()
            .map_err(|_| CoreError::storage("localStorage access denied"))?
            .ok_or_else(|| CoreError::storage("localStorage not available"))?;
        Ok(Self { storage })
    }
}

impl KeyValueStorage for BrowserStorage {
    fn get_item(&self, key: &str) -> CoreResult<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|_| CoreError::storage(format!("failed to read {key}")))
    }

    fn set_item(&self, key: &str, value: &str) -> CoreResult<()> {
        // Throws when the quota is exceeded or storage is disabled
        self.storage
            .set_item(key, value)
            .map_err(|_| CoreError::storage(format!("failed to write {key}")))
    }

    fn remove_item(&self, key: &str) -> CoreResult<()> {
        self.storage
            .remove_item(key)
            .map_err(|_| CoreError::storage(format!("failed to remove {key}")))
    }
}

/// `localStorage` when the browser grants it, otherwise a backend that
/// behaves as if no credential were ever stored
pub fn origin_storage() -> Rc<dyn KeyValueStorage> {
    match BrowserStorage::local() {
        Ok(storage) => Rc::new(storage),
        Err(e) => {
            warn!(error = %e, "Browser storage unavailable, sessions will not persist");
            Rc::new(UnavailableStorage)
        }
    }
}
