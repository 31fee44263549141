use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;

use super::{BrowserStorage, DesktopHost, FileStorage, HostKv, MemoryStorage, NativeHost, StorageAdapter};

/// The host capabilities visible to the process at startup.
///
/// Each field is only a *candidate*: [`select_adapter`] still verifies it
/// before committing to the backend.
#[derive(Default)]
pub struct HostEnvironment {
    desktop: Option<Box<dyn DesktopHost>>,
    browser: Option<Box<dyn HostKv>>,
}

impl HostEnvironment {
    /// No capabilities at all; the cascade ends at the memory adapter.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Inspects the compile target and runtime for available hosts.
    pub fn detect(config: &Config) -> Self {
        #[cfg(all(feature = "browser", target_arch = "wasm32"))]
        {
            let _ = config;
            let browser = super::LocalStorage::detect().map(|kv| Box::new(kv) as Box<dyn HostKv>);
            return HostEnvironment { desktop: None, browser };
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            return HostEnvironment::empty().with_desktop(NativeHost::new(&config.app_name));
        }

        #[cfg(all(target_arch = "wasm32", not(feature = "browser")))]
        {
            let _ = config;
            HostEnvironment::empty()
        }
    }

    pub fn with_desktop(mut self, host: impl DesktopHost + 'static) -> Self {
        self.desktop = Some(Box::new(host));
        self
    }

    pub fn with_browser(mut self, host: impl HostKv + 'static) -> Self {
        self.browser = Some(Box::new(host));
        self
    }
}

impl fmt::Debug for HostEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostEnvironment")
            .field("desktop", &self.desktop)
            .field("browser", &self.browser.is_some())
            .finish()
    }
}

/// Picks the first working backend: filesystem, then browser, then memory.
///
/// Every step is allowed to fail; the last one cannot.
pub fn select_adapter(host: HostEnvironment, config: &Config) -> Arc<dyn StorageAdapter> {
    let HostEnvironment { desktop, browser } = host;

    if let Some(desktop) = desktop {
        match FileStorage::open(desktop.as_ref(), config) {
            Ok(storage) => {
                info!("Using filesystem storage at {}", storage.path().display());
                return Arc::new(storage);
            }
            Err(e) => warn!("Filesystem storage unavailable: {}", e),
        }
    } else {
        debug!("No desktop host, skipping filesystem storage");
    }

    if let Some(browser) = browser {
        match BrowserStorage::probe(browser) {
            Ok(storage) => {
                info!("Using browser storage");
                return Arc::new(storage);
            }
            Err(e) => warn!("Browser storage unavailable: {}", e),
        }
    } else {
        debug!("No browser key/value store, skipping browser storage");
    }

    info!("Using in-memory storage; nothing will survive a restart");
    Arc::new(MemoryStorage::new())
}
