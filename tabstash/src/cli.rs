use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tabstash_core::layout::Direction;

/// Tabstash: inspect and edit a persisted tabbed panel workspace.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store the workspace in this directory instead of the platform data directory.
    #[arg(long, global = true, env = "TABSTASH_DATA_DIR", conflicts_with = "memory")]
    pub data_dir: Option<PathBuf>,

    /// Key the workspace is stored under.
    #[arg(long, global = true, env = "TABSTASH_STORAGE_KEY")]
    pub storage_key: Option<String>,

    /// Skip persistent backends and keep everything in memory.
    #[arg(long, global = true)]
    pub memory: bool,

    /// Increase verbosity (use multiple times for more).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the current layout tree.
    Show(ShowArgs),
    /// List known panels and whether they are visible.
    Panels,
    /// Hide visible panels and show hidden ones.
    Toggle(ToggleArgs),
    /// Report whether a panel is visible.
    Visible {
        /// Component key of the panel.
        key: String,
    },
    /// Set the reading direction, or flip it when none is given.
    Direction {
        /// `ltr` or `rtl`.
        direction: Option<Direction>,
    },
    /// Make a tab the active one in its tabset.
    Select(TabArgs),
    /// Close a single tab.
    Close(TabArgs),
    /// Close a whole tabset.
    CloseTabset {
        /// Id of the tabset.
        tabset: String,
    },
    /// Reopen a tab closed with `close` or `close-tabset`.
    Restore {
        /// Id of the closed tab.
        tab_id: String,
    },
    /// Reinstate the default layout.
    Reset(ResetArgs),
    /// Inspect or change persistence.
    Storage(StorageArgs),
    /// Feed a JSON file to the workspace as if the layout engine produced it.
    Apply(ApplyArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Print the full model as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ToggleArgs {
    /// Component keys of the panels to toggle.
    #[arg(required = true)]
    pub keys: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TabArgs {
    /// Id of the tabset holding the tab.
    pub tabset: String,
    /// Position of the tab in the tabset.
    pub index: usize,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    pub yes: bool,

    /// Only reset the layout; keep the stored workspace and remembered panels.
    #[arg(long)]
    pub layout_only: bool,
}

#[derive(Args, Debug)]
pub struct StorageArgs {
    #[command(subcommand)]
    pub command: StorageCommands,
}

#[derive(Subcommand, Debug)]
pub enum StorageCommands {
    /// Show the active backend and persistence state.
    Status,
    /// Turn persistence on and save the current workspace.
    Enable,
    /// Turn persistence off. The stored workspace is left as it is.
    Disable,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to the JSON file.
    pub path: PathBuf,

    /// Treat the file as a single layout action instead of a model update.
    #[arg(long)]
    pub action: bool,
}
