use anyhow::Result;
use clap::Parser;
use tabstash::cli::{Cli, Commands};
use tabstash::{commands, AppContext};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let mut cx = AppContext::open(&cli);

    match cli.command {
        Commands::Show(args) => commands::handle_show(args, &cx).await?,
        Commands::Panels => commands::handle_panels(&cx).await?,
        Commands::Toggle(args) => commands::handle_toggle(args, &mut cx).await?,
        Commands::Visible { key } => commands::handle_visible(&key, &cx).await?,
        Commands::Direction { direction } => commands::handle_direction(direction, &mut cx).await?,
        Commands::Select(args) => commands::handle_select(args, &mut cx).await?,
        Commands::Close(args) => commands::handle_close(args, &mut cx).await?,
        Commands::CloseTabset { tabset } => commands::handle_close_tabset(&tabset, &mut cx).await?,
        Commands::Restore { tab_id } => commands::handle_restore(&tab_id, &mut cx).await?,
        Commands::Reset(args) => commands::handle_reset(args, &mut cx).await?,
        Commands::Storage(args) => commands::handle_storage(args, &mut cx).await?,
        Commands::Apply(args) => commands::handle_apply(args, &mut cx).await?,
    }

    // The process exits long before a debounce window would pass.
    if cx.workspace.flush() {
        debug!("Workspace saved");
    }

    Ok(())
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_directives = if quiet {
        "error"
    } else {
        match verbose {
            0 => "tabstash=info,tabstash_core=info",
            1 => "tabstash=debug,tabstash_core=debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
