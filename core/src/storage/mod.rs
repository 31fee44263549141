//! Key/value storage backends with a uniform, infallible contract.
//!
//! The persistence layer never talks to a concrete backend directly. It holds an
//! `Arc<dyn StorageAdapter>` chosen once at startup by [`select_adapter`], which
//! probes the host in a fixed order:
//!
//! 1.  **[`FileStorage`]:** a JSON file in the host's application-data directory.
//!     Only used when a [`DesktopHost`] is present *and* its data directory can be
//!     resolved and created.
//! 2.  **[`BrowserStorage`]:** a host-provided key/value store ([`HostKv`]), used only
//!     after a real write-then-delete probe succeeds.
//! 3.  **[`MemoryStorage`]:** an in-process map. Always available.
//!
//! # Failure Semantics
//!
//! Adapters never surface errors. A failed `set`, `remove` or `clear` is logged and
//! behaves as a no-op; a failed `get` behaves as if the key were absent. The
//! [`Error`] type below is used inside adapters and by the probe, and stops at
//! their boundary.
//!
//! # Example Usage
//!
//! ```rust
//! use tabstash_core::config::Config;
//! use tabstash_core::storage::{select_adapter, AdapterKind, HostEnvironment};
//!
//! let storage = select_adapter(HostEnvironment::empty(), &Config::default());
//! assert_eq!(storage.kind(), AdapterKind::Memory);
//!
//! storage.set("demo-layout", "{}");
//! assert_eq!(storage.get("demo-layout").as_deref(), Some("{}"));
//! storage.remove("demo-layout");
//! assert_eq!(storage.get("demo-layout"), None);
//! ```

pub use self::browser::{BrowserStorage, HostKv};
pub use self::filesystem::{DesktopHost, FileStorage, FixedDataDir, NativeHost};
pub use self::memory::MemoryStorage;
pub use self::probe::{select_adapter, HostEnvironment};

#[cfg(all(feature = "browser", target_arch = "wasm32"))]
pub use self::browser::LocalStorage;

mod browser;
mod filesystem;
mod memory;
mod probe;

use std::fmt;
use thiserror::Error;

/// Key written and deleted by the browser probe.
pub const PROBE_KEY: &str = "__storage_test__";

/// Uniform contract over opaque string values.
///
/// All calls are synchronous and infallible from the caller's point of view.
pub trait StorageAdapter: fmt::Debug + Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> AdapterKind;

    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);

    fn clear(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    Filesystem,
    Browser,
    Memory,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterKind::Filesystem => f.write_str("filesystem"),
            AdapterKind::Browser => f.write_str("browser"),
            AdapterKind::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Storage file serialization/deserialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("Host exposes neither a data path nor a home directory")]
    NoDataDirectory,

    #[error("Host storage unavailable: {0}")]
    HostUnavailable(String),

    #[error("Host storage operation failed: {0}")]
    Host(String),

    #[error("Probe of {backend} storage failed: {reason}")]
    ProbeFailed { backend: AdapterKind, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
