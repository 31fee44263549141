use tabstash_core::config::Config;
use tabstash_core::storage::{select_adapter, FixedDataDir, HostEnvironment};
use tabstash_core::workspace::Workspace;

use crate::cli::Cli;

pub mod cli;
pub mod commands;

pub struct AppContext {
    pub workspace: Workspace,
}

impl AppContext {
    /// Selects a backend according to the global flags and opens the workspace
    /// stored in it.
    pub fn open(cli: &Cli) -> Self {
        let mut config = Config::default();
        if let Some(key) = &cli.storage_key {
            config.storage_key = key.clone();
        }

        let host = if cli.memory {
            HostEnvironment::empty()
        } else if let Some(dir) = &cli.data_dir {
            HostEnvironment::empty().with_desktop(FixedDataDir::new(dir))
        } else {
            HostEnvironment::detect(&config)
        };

        let storage = select_adapter(host, &config);
        AppContext {
            workspace: Workspace::open(storage, config),
        }
    }
}
