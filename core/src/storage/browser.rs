use std::fmt;

use tracing::{debug, warn};

use super::{AdapterKind, Error, Result, StorageAdapter, PROBE_KEY};

/// A host-provided persistent key/value store, such as `window.localStorage`.
///
/// Every operation may fail independently (quota exceeded, storage disabled by
/// privacy settings, ...). [`BrowserStorage`] turns those failures into no-ops.
pub trait HostKv: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Adapter over a [`HostKv`]. Each call is wrapped on its own, so one failing
/// operation is logged and ignored without affecting the next.
pub struct BrowserStorage {
    host: Box<dyn HostKv>,
}

impl BrowserStorage {
    /// Wraps `host` after proving it is writable with a write-then-delete cycle.
    ///
    /// The presence of a key/value API says nothing about whether writes will be
    /// accepted, so the probe performs a real one.
    pub fn probe(host: Box<dyn HostKv>) -> Result<Self> {
        let probe_failed = |e: Error| Error::ProbeFailed {
            backend: AdapterKind::Browser,
            reason: e.to_string(),
        };
        host.set_item(PROBE_KEY, "test").map_err(probe_failed)?;
        host.remove_item(PROBE_KEY).map_err(probe_failed)?;
        debug!("Browser storage probe succeeded");
        Ok(BrowserStorage { host })
    }
}

impl fmt::Debug for BrowserStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserStorage").finish_non_exhaustive()
    }
}

impl StorageAdapter for BrowserStorage {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Browser
    }

    fn get(&self, key: &str) -> Option<String> {
        self.host.get_item(key).unwrap_or_else(|e| {
            warn!("Failed to get item '{}' from browser storage: {}", key, e);
            None
        })
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.host.set_item(key, value) {
            warn!("Failed to set item '{}' in browser storage: {}", key, e);
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.host.remove_item(key) {
            warn!("Failed to remove item '{}' from browser storage: {}", key, e);
        }
    }

    fn clear(&self) {
        if let Err(e) = self.host.clear() {
            warn!("Failed to clear browser storage: {}", e);
        }
    }
}

#[cfg(all(feature = "browser", target_arch = "wasm32"))]
pub use self::web::LocalStorage;

#[cfg(all(feature = "browser", target_arch = "wasm32"))]
mod web {
    use super::{Error, HostKv, Result};

    /// `window.localStorage`, looked up on every call so the handle itself stays
    /// `Send + Sync`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct LocalStorage;

    impl LocalStorage {
        /// Returns `Some` when the page exposes a `localStorage` object at all.
        pub fn detect() -> Option<Self> {
            Self::storage().ok().map(|_| LocalStorage)
        }

        fn storage() -> Result<web_sys::Storage> {
            let window = web_sys::window()
                .ok_or_else(|| Error::HostUnavailable("no window object".to_string()))?;
            window
                .local_storage()
                .map_err(|e| Error::HostUnavailable(format!("{:?}", e)))?
                .ok_or_else(|| Error::HostUnavailable("localStorage is not exposed".to_string()))
        }
    }

    impl HostKv for LocalStorage {
        fn get_item(&self, key: &str) -> Result<Option<String>> {
            Self::storage()?
                .get_item(key)
                .map_err(|e| Error::Host(format!("{:?}", e)))
        }

        fn set_item(&self, key: &str, value: &str) -> Result<()> {
            Self::storage()?
                .set_item(key, value)
                .map_err(|e| Error::Host(format!("{:?}", e)))
        }

        fn remove_item(&self, key: &str) -> Result<()> {
            Self::storage()?
                .remove_item(key)
                .map_err(|e| Error::Host(format!("{:?}", e)))
        }

        fn clear(&self) -> Result<()> {
            Self::storage()?.clear().map_err(|e| Error::Host(format!("{:?}", e)))
        }
    }
}
