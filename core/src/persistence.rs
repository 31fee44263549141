//! Debounced write-back of the workspace to storage.
//!
//! Every observed change replaces the pending model and restarts a timer. When
//! the timer fires, the latest pending model is serialized and written under
//! the storage key. A burst of edits inside the window therefore produces a
//! single write. Dropping the controller writes whatever is still pending.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use clap::crate_version;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::config::Config;
use crate::model::WorkspaceModel;
use crate::storage::StorageAdapter;

#[derive(Debug)]
pub struct PersistenceController {
    inner: Arc<Inner>,
    window: Duration,
    enabled: AtomicBool,
}

#[derive(Debug)]
struct Inner {
    storage: Arc<dyn StorageAdapter>,
    key: String,
    pending: Mutex<Pending>,
}

#[derive(Debug, Default)]
struct Pending {
    latest: Option<WorkspaceModel>,
    timer: Option<JoinHandle<()>>,
}

impl PersistenceController {
    pub fn new(storage: Arc<dyn StorageAdapter>, config: &Config, enabled: bool) -> Self {
        PersistenceController {
            inner: Arc::new(Inner {
                storage,
                key: config.storage_key.clone(),
                pending: Mutex::new(Pending::default()),
            }),
            window: config.debounce,
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Turning persistence off drops any pending commit.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.cancel();
        }
    }

    /// Whether a commit is scheduled but has not happened yet.
    pub fn is_pending(&self) -> bool {
        self.inner.pending().latest.is_some()
    }

    /// Schedules `model` to be written once the window passes without another
    /// change.
    ///
    /// Outside a tokio runtime there is no timer to schedule, so the model is
    /// written immediately.
    #[instrument(skip_all, fields(key = %self.inner.key))]
    pub fn observe(&self, model: &WorkspaceModel) {
        if !self.is_enabled() {
            return;
        }

        let mut pending = self.inner.pending();
        pending.latest = Some(model.clone());
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }

        match Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                let window = self.window;
                pending.timer = Some(handle.spawn(async move {
                    tokio::time::sleep(window).await;
                    inner.commit_pending();
                }));
                debug!("Commit scheduled in {:?}", window);
            }
            Err(_) => {
                drop(pending);
                debug!("No runtime, committing immediately");
                self.inner.commit_pending();
            }
        }
    }

    /// Writes the pending model now. Returns whether anything was written.
    pub fn flush(&self) -> bool {
        if let Some(timer) = self.inner.pending().timer.take() {
            timer.abort();
        }
        self.inner.commit_pending()
    }

    /// Drops the pending model without writing it.
    pub fn cancel(&self) {
        let mut pending = self.inner.pending();
        pending.latest = None;
        if let Some(timer) = pending.timer.take() {
            timer.abort();
            debug!("Pending commit cancelled");
        }
    }
}

// A commit still inside its window is written rather than lost.
impl Drop for PersistenceController {
    fn drop(&mut self) {
        if self.flush() {
            debug!("Pending commit written on drop");
        }
    }
}

impl Inner {
    fn pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit_pending(&self) -> bool {
        let latest = self.pending().latest.take();
        match latest {
            Some(model) => self.commit(model),
            None => false,
        }
    }

    fn commit(&self, mut model: WorkspaceModel) -> bool {
        model.metadata.written_by = Some(crate_version!().to_string());
        match model.to_snapshot() {
            Ok(snapshot) => {
                self.storage.set(&self.key, &snapshot);
                debug!("Committed workspace ({} bytes) under '{}'", snapshot.len(), self.key);
                true
            }
            Err(e) => {
                error!("Failed to serialize workspace: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{update_by_id, Direction, NodeUpdate};
    use crate::storage::{AdapterKind, MemoryStorage};
    use std::sync::atomic::AtomicUsize;
    use tokio::time::sleep;

    /// Counts writes on top of a memory store.
    #[derive(Debug, Default)]
    struct CountingStorage {
        inner: MemoryStorage,
        writes: AtomicUsize,
    }

    impl StorageAdapter for CountingStorage {
        fn kind(&self) -> AdapterKind {
            AdapterKind::Memory
        }

        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value);
        }

        fn remove(&self, key: &str) {
            self.inner.remove(key);
        }

        fn clear(&self) {
            self.inner.clear();
        }
    }

    fn setup(enabled: bool) -> (Arc<CountingStorage>, PersistenceController) {
        let storage = Arc::new(CountingStorage::default());
        let controller = PersistenceController::new(storage.clone(), &Config::default(), enabled);
        (storage, controller)
    }

    fn stored(storage: &CountingStorage) -> WorkspaceModel {
        let raw = storage.get("demo-layout").expect("Nothing was written");
        WorkspaceModel::from_snapshot(&raw, Direction::Ltr).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_coalesced_into_one_write() {
        let (storage, controller) = setup(true);
        let mut model = WorkspaceModel::default_with(Direction::Ltr);

        for index in 0..3 {
            model.layout = update_by_id(&model.layout, "left-main", NodeUpdate::Select(index)).unwrap();
            controller.observe(&model);
            sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
        assert!(controller.is_pending());

        sleep(Duration::from_millis(500)).await;
        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);
        assert!(!controller.is_pending());

        let written = stored(&storage);
        assert_eq!(written.layout, model.layout);
        assert_eq!(written.metadata.written_by.as_deref(), Some(crate_version!()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_change_restarts_the_window() {
        let (storage, controller) = setup(true);
        let model = WorkspaceModel::default_with(Direction::Ltr);

        controller.observe(&model);
        sleep(Duration::from_millis(400)).await;
        controller.observe(&model);
        sleep(Duration::from_millis(400)).await;
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_controller_never_writes() {
        let (storage, controller) = setup(false);
        controller.observe(&WorkspaceModel::default_with(Direction::Ltr));
        assert!(!controller.is_pending());

        sleep(Duration::from_secs(2)).await;
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_drops_pending_commit() {
        let (storage, controller) = setup(true);
        controller.observe(&WorkspaceModel::default_with(Direction::Ltr));
        controller.set_enabled(false);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_writes_immediately() {
        let (storage, controller) = setup(true);
        controller.observe(&WorkspaceModel::default_with(Direction::Rtl));

        assert!(controller.flush());
        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);
        assert_eq!(stored(&storage).global.direction, Direction::Rtl);

        // The aborted timer does not write again
        sleep(Duration::from_secs(1)).await;
        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);
        assert!(!controller.flush());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_writes_pending_commit() {
        let (storage, controller) = setup(true);
        controller.observe(&WorkspaceModel::default_with(Direction::Rtl));
        drop(controller);
        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);
        assert_eq!(stored(&storage).global.direction, Direction::Rtl);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_after_cancel_writes_nothing() {
        let (storage, controller) = setup(true);
        controller.observe(&WorkspaceModel::default_with(Direction::Ltr));
        controller.cancel();
        drop(controller);
        assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_without_runtime_commits_immediately() {
        let (storage, controller) = setup(true);
        controller.observe(&WorkspaceModel::default_with(Direction::Ltr));
        assert_eq!(storage.writes.load(Ordering::SeqCst), 1);
    }
}
