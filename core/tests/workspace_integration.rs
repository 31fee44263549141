use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;
use tokio::time::sleep;

use tabstash_core::config::{Config, StartupConfig};
use tabstash_core::layout::{find_by_id, remove_empty_containers, remove_node, Direction, LayoutAction};
use tabstash_core::model::{GlobalUpdate, ModelUpdate, WorkspaceModel};
use tabstash_core::storage::{select_adapter, AdapterKind, FixedDataDir, HostEnvironment, MemoryStorage, StorageAdapter};
use tabstash_core::workspace::{ActionOutcome, ToggleOutcome, Workspace};

fn stored_json(storage: &dyn StorageAdapter) -> serde_json::Value {
    let raw = storage.get("demo-layout").expect("Workspace should be stored");
    serde_json::from_str(&raw).expect("Stored workspace should be valid JSON")
}

#[tokio::test(start_paused = true)]
async fn integration_full_scenario() {
    let storage = Arc::new(MemoryStorage::new());
    let mut workspace = Workspace::open(storage.clone(), Config::default());

    // Empty store: default workspace, left to right
    assert_eq!(workspace.direction(), Direction::Ltr);
    assert!(workspace.is_visible("messages"));

    assert_eq!(workspace.toggle_panel("messages"), ToggleOutcome::Hidden);
    assert!(workspace.restore_cache().lookup("messages").is_some());
    assert!(!workspace.is_visible("messages"));

    assert_eq!(workspace.toggle_panel("messages"), ToggleOutcome::Shown);
    assert!(workspace.layout().contains_component("messages"));

    sleep(Duration::from_millis(600)).await;
    let json = stored_json(storage.as_ref());
    assert!(json["metadata"]["restoreData"]["messages"].is_object());

    workspace.reset();
    assert_eq!(storage.get("demo-layout"), None);

    // Reset never schedules a write of its own
    sleep(Duration::from_secs(2)).await;
    assert_eq!(storage.get("demo-layout"), None);
}

#[tokio::test(start_paused = true)]
async fn integration_round_trip_through_storage() {
    let storage = Arc::new(MemoryStorage::new());
    let mut workspace = Workspace::open(storage.clone(), Config::default());
    workspace.set_direction(Direction::Rtl);
    workspace.toggle_panel("git");
    workspace.close_tab("center-main", 1).unwrap();
    let expected = workspace.model().clone();

    assert!(workspace.has_pending_commit());
    sleep(Duration::from_millis(600)).await;
    assert!(!workspace.has_pending_commit());

    let reopened = Workspace::open(storage.clone(), Config::default());
    assert_eq!(reopened.layout(), &expected.layout);
    assert_eq!(reopened.direction(), Direction::Rtl);
    assert!(reopened.restore_cache().lookup("git").is_some());
    assert!(reopened.restore_cache().lookup("tab-terminal").is_some());
}

#[tokio::test(start_paused = true)]
async fn integration_burst_of_edits_is_one_write() {
    let storage = Arc::new(MemoryStorage::new());
    let mut workspace = Workspace::open(storage.clone(), Config::default());

    for key in ["dashboard", "analytics", "search", "dashboard"] {
        workspace.toggle_panel(key);
        sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(storage.get("demo-layout"), None);

    sleep(Duration::from_millis(500)).await;
    let reopened = Workspace::open(storage.clone(), Config::default());
    assert!(reopened.is_visible("dashboard"));
    assert!(!reopened.is_visible("analytics"));
    assert!(!reopened.is_visible("search"));
}

#[tokio::test]
async fn integration_toggle_is_idempotent() {
    let storage = Arc::new(MemoryStorage::new());
    let mut once = Workspace::open(storage.clone(), Config::default());
    once.toggle_panel("logs");

    let mut thrice = Workspace::open(Arc::new(MemoryStorage::new()), Config::default());
    thrice.toggle_panel("logs");
    thrice.toggle_panel("logs");
    thrice.toggle_panel("logs");
    assert_eq!(thrice.layout(), once.layout());

    // The entry survives being used
    assert_eq!(thrice.toggle_panel("logs"), ToggleOutcome::Shown);
    assert_eq!(thrice.toggle_panel("logs"), ToggleOutcome::Hidden);
    assert_eq!(thrice.toggle_panel("logs"), ToggleOutcome::Shown);
}

#[tokio::test]
async fn integration_updates_preserve_direction() {
    let mut workspace = Workspace::open(Arc::new(MemoryStorage::new()), Config::default());
    workspace.set_direction(Direction::Rtl);

    // A drag and drop moving the messages tab next to dashboard
    let (layout, _) = remove_node(workspace.layout(), "tab-messages").unwrap();
    let mut moved = remove_empty_containers(&layout);
    let tab = tabstash_core::catalog::panel("messages").unwrap();
    let left_main = moved.children[0].children[0].clone();
    assert_eq!(left_main.id, "left-main");
    moved.children[0].children[0].children.push(tabstash_core::layout::tab(tab.tab_id, tab.component, tab.name));

    assert!(workspace.apply_update(ModelUpdate::layout_only(moved.clone())));
    assert_eq!(workspace.direction(), Direction::Rtl);
    assert_eq!(workspace.model().global.direction, Direction::Rtl);
    assert_eq!(find_by_id(workspace.layout(), "left-main").unwrap().children.len(), 4);

    // The engine echoing the same tree back is not a change
    assert!(!workspace.apply_update(ModelUpdate::layout_only(moved.clone())));

    // An explicit direction in an update wins
    let update = ModelUpdate {
        global: GlobalUpdate {
            direction: Some(Direction::Ltr),
            splitter_size: None,
        },
        ..ModelUpdate::layout_only(moved)
    };
    assert!(workspace.apply_update(update));
    assert_eq!(workspace.direction(), Direction::Ltr);

    let outcome = workspace
        .handle_action(LayoutAction::ChangeDirection { direction: Direction::Rtl })
        .unwrap();
    assert_eq!(outcome, ActionOutcome::Intercepted);
    assert_eq!(workspace.direction(), Direction::Ltr);
}

#[tokio::test]
async fn integration_filesystem_backed_workspace() {
    let dir = tempdir().unwrap();
    let config = Config::default();

    let storage = select_adapter(HostEnvironment::empty().with_desktop(FixedDataDir::new(dir.path())), &config);
    assert_eq!(storage.kind(), AdapterKind::Filesystem);

    let mut workspace = Workspace::open(storage.clone(), config.clone());
    workspace.toggle_panel("extensions");
    assert!(workspace.flush());
    drop(workspace);

    let content = std::fs::read_to_string(dir.path().join("storage.json")).unwrap();
    let file: serde_json::Value = serde_json::from_str(&content).unwrap();
    let raw = file["demo-layout"].as_str().expect("Workspace should be stored as a string value");
    let model = WorkspaceModel::from_snapshot(raw, Direction::Ltr).unwrap();
    assert!(!model.layout.contains_component("extensions"));

    let storage = select_adapter(HostEnvironment::empty().with_desktop(FixedDataDir::new(dir.path())), &config);
    let mut reopened = Workspace::open(storage, config);
    assert!(!reopened.is_visible("extensions"));
    assert_eq!(reopened.toggle_panel("extensions"), ToggleOutcome::Shown);
}

#[tokio::test]
async fn integration_malformed_snapshot_falls_back_to_default() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set("demo-layout", "{\"layout\": 42}");

    let startup = StartupConfig::read(storage.as_ref(), &Config::default());
    assert_eq!(startup.direction, Direction::Ltr);

    let workspace = Workspace::open(storage.clone(), Config::default());
    assert_eq!(workspace.layout(), &tabstash_core::catalog::default_layout());
    // Left in place until something is committed
    assert!(storage.get("demo-layout").is_some());
}

#[test]
fn integration_cascade_without_host_is_memory() {
    let storage = select_adapter(HostEnvironment::empty(), &Config::default());
    assert_eq!(storage.kind(), AdapterKind::Memory);
    let workspace = Workspace::open(storage, Config::default());
    assert_eq!(workspace.storage_kind(), AdapterKind::Memory);
}
