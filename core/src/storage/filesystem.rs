use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::Config;

use super::{AdapterKind, Error, Result, StorageAdapter};

/// A desktop host runtime able to hand out a place on disk for application data.
pub trait DesktopHost: fmt::Debug + Send + Sync {
    /// The host's application-data directory, if it exposes one.
    fn data_path(&self) -> Option<PathBuf>;

    /// The user's home directory, used when there is no data path.
    fn home_dir(&self) -> Option<PathBuf>;
}

/// The operating system the process runs on.
#[derive(Debug, Clone)]
pub struct NativeHost {
    app_name: String,
}

impl NativeHost {
    pub fn new(app_name: impl Into<String>) -> Self {
        NativeHost { app_name: app_name.into() }
    }
}

impl DesktopHost for NativeHost {
    fn data_path(&self) -> Option<PathBuf> {
        platform_data_dir().map(|dir| dir.join(&self.app_name))
    }

    fn home_dir(&self) -> Option<PathBuf> {
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
    }
}

fn platform_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        return std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join("Library/Application Support"));
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(xdg) = std::env::var_os("XDG_DATA_HOME") {
            return Some(PathBuf::from(xdg));
        }
        return std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share"));
    }

    #[cfg(target_os = "windows")]
    {
        return std::env::var_os("APPDATA").map(PathBuf::from);
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

/// A host whose data directory is given explicitly (command-line override, tests).
#[derive(Debug, Clone)]
pub struct FixedDataDir {
    path: PathBuf,
}

impl FixedDataDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FixedDataDir { path: path.into() }
    }
}

impl DesktopHost for FixedDataDir {
    fn data_path(&self) -> Option<PathBuf> {
        Some(self.path.clone())
    }

    fn home_dir(&self) -> Option<PathBuf> {
        None
    }
}

/// All keys live in one JSON object file. Reads are served from an in-memory
/// mirror; every mutation rewrites the whole file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Resolves the storage file for `host`, creating its directory if needed,
    /// and loads whatever it already contains.
    ///
    /// Fails only if no directory can be resolved or created. An unreadable or
    /// malformed file is treated as empty.
    #[instrument(skip(host, config))]
    pub fn open(host: &dyn DesktopHost, config: &Config) -> Result<Self> {
        let dir = match host.data_path() {
            Some(dir) => dir,
            None => host
                .home_dir()
                .ok_or(Error::NoDataDirectory)?
                .join(&config.data_dir_name),
        };

        if !dir.exists() {
            debug!("Creating storage directory {}", dir.display());
            fs::create_dir_all(&dir)?;
        }

        let path = dir.join(&config.storage_file_name);
        let entries = load_entries(&path);
        debug!("Opened file storage at {} with {} keys", path.display(), entries.len());

        Ok(FileStorage {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the backing JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Writes to a sibling temp file first so a crash never leaves half a file behind.
    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, content)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(Error::Io(e));
        }
        Ok(())
    }
}

fn load_entries(path: &Path) -> BTreeMap<String, String> {
    if !path.exists() {
        return BTreeMap::new();
    }
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read storage file '{}': {}", path.display(), e);
            return BTreeMap::new();
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!("Failed to parse storage file '{}': {}", path.display(), e);
        BTreeMap::new()
    })
}

impl StorageAdapter for FileStorage {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Filesystem
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries();
        entries.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&entries) {
            warn!("Failed to save storage file: {}", e);
        }
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn remove(&self, key: &str) {
        let mut entries = self.entries();
        if entries.remove(key).is_none() {
            return;
        }
        if let Err(e) = self.persist(&entries) {
            warn!("Failed to save storage file: {}", e);
        }
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn clear(&self) {
        self.entries().clear();
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Storage file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to clear storage file: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug)]
    struct HomeOnly(PathBuf);

    impl DesktopHost for HomeOnly {
        fn data_path(&self) -> Option<PathBuf> {
            None
        }

        fn home_dir(&self) -> Option<PathBuf> {
            Some(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct NoDirs;

    impl DesktopHost for NoDirs {
        fn data_path(&self) -> Option<PathBuf> {
            None
        }

        fn home_dir(&self) -> Option<PathBuf> {
            None
        }
    }

    #[test]
    fn test_file_storage_creates_directory() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("data");
        let storage = FileStorage::open(&FixedDataDir::new(&data_dir), &Config::default()).unwrap();

        assert!(data_dir.is_dir());
        assert_eq!(storage.path(), data_dir.join("storage.json"));
        // Nothing is written until the first mutation
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_file_storage_falls_back_to_home() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(&HomeOnly(dir.path().to_path_buf()), &Config::default()).unwrap();
        assert_eq!(storage.path(), dir.path().join(".layout-manager-demo").join("storage.json"));
    }

    #[test]
    fn test_file_storage_needs_some_directory() {
        let result = FileStorage::open(&NoDirs, &Config::default());
        assert!(matches!(result, Err(Error::NoDataDirectory)));
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempdir().unwrap();
        let host = FixedDataDir::new(dir.path());
        let config = Config::default();

        let storage = FileStorage::open(&host, &config).unwrap();
        storage.set("demo-layout", "{\"layout\":1}");
        storage.set("demo-storage-enabled", "true");
        storage.remove("demo-storage-enabled");

        let content = std::fs::read_to_string(storage.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).expect("Storage file should be valid JSON");
        assert_eq!(json["demo-layout"], "{\"layout\":1}");
        assert!(json.get("demo-storage-enabled").is_none());

        let reopened = FileStorage::open(&host, &config).unwrap();
        assert_eq!(reopened.get("demo-layout").as_deref(), Some("{\"layout\":1}"));
    }

    #[test]
    fn test_file_storage_clear_deletes_file() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(&FixedDataDir::new(dir.path()), &Config::default()).unwrap();
        storage.set("k", "v");
        assert!(storage.path().exists());

        storage.clear();
        assert!(!storage.path().exists());
        assert_eq!(storage.get("k"), None);
        // Clearing twice is harmless
        storage.clear();
    }

    #[test]
    fn test_file_storage_ignores_malformed_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("storage.json"), "{ not json }").unwrap();

        let storage = FileStorage::open(&FixedDataDir::new(dir.path()), &Config::default()).unwrap();
        assert_eq!(storage.get("anything"), None);

        // The next write replaces the broken file
        storage.set("k", "v");
        let reopened = FileStorage::open(&FixedDataDir::new(dir.path()), &Config::default()).unwrap();
        assert_eq!(reopened.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_file_storage_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(&FixedDataDir::new(dir.path()), &Config::default()).unwrap();
        storage.set("a", "1");
        storage.set("b", "2");

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["storage.json".to_string()]);
    }
}
