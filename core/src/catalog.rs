//! The panels a workspace knows about and the default arrangement of them.

use crate::layout::{column, row, tab, tabset, LayoutNode};

/// A panel that can be toggled on and off by its component key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelSpec {
    pub key: &'static str,
    pub tab_id: &'static str,
    pub component: &'static str,
    pub name: &'static str,
}

const fn panel_spec(key: &'static str, tab_id: &'static str, name: &'static str) -> PanelSpec {
    PanelSpec { key, tab_id, component: key, name }
}

pub const PANELS: &[PanelSpec] = &[
    panel_spec("dashboard", "tab-dashboard", "Dashboard"),
    panel_spec("analytics", "tab-analytics", "Analytics"),
    panel_spec("reports", "tab-reports", "Reports"),
    panel_spec("notifications", "tab-notifications", "Notifications"),
    panel_spec("messages", "tab-messages", "Messages"),
    panel_spec("editor", "tab-editor", "Code Editor"),
    panel_spec("terminal", "tab-terminal", "Terminal"),
    panel_spec("output", "tab-output", "Output"),
    panel_spec("console", "tab-console", "Console"),
    panel_spec("logs", "tab-logs", "Logs"),
    panel_spec("settings", "tab-settings", "Settings"),
    panel_spec("properties", "tab-properties", "Properties"),
    panel_spec("explorer", "tab-explorer", "Explorer"),
    panel_spec("search", "tab-search", "Search"),
    panel_spec("git", "tab-git", "Git"),
    panel_spec("extensions", "tab-extensions", "Extensions"),
];

pub fn panel(key: &str) -> Option<&'static PanelSpec> {
    PANELS.iter().find(|panel| panel.key == key)
}

fn panel_tab(key: &str) -> LayoutNode {
    match panel(key) {
        Some(panel) => tab(panel.tab_id, panel.component, panel.name),
        None => tab(format!("tab-{key}"), key, key),
    }
}

fn panel_tabs(keys: &[&str]) -> Vec<LayoutNode> {
    keys.iter().map(|key| panel_tab(key)).collect()
}

/// The pristine layout. Every panel in [`PANELS`] appears exactly once.
pub fn default_layout() -> LayoutNode {
    row("root", vec![
        column("left-panel", vec![
            tabset("left-main", panel_tabs(&["dashboard", "analytics", "reports"])),
            tabset("left-secondary", panel_tabs(&["notifications", "messages"])),
        ]),
        column("center-panel", vec![
            row("top-center", vec![tabset(
                "center-main",
                panel_tabs(&["editor", "terminal", "output"]),
            )]),
            row("bottom-center", vec![tabset(
                "center-bottom",
                panel_tabs(&["console", "logs"]),
            )]),
        ]),
        column("right-panel", vec![
            tabset("right-main", panel_tabs(&["settings", "properties", "explorer", "search"])),
            tabset("right-secondary", panel_tabs(&["git", "extensions"])),
        ]),
    ])
}
