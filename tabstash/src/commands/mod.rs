use anyhow::{Context, Result};
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use tabstash_core::catalog::PANELS;
use tabstash_core::layout::{Direction, LayoutAction, LayoutNode, NodeKind};
use tabstash_core::model::ModelUpdate;
use tabstash_core::workspace::{ActionOutcome, ToggleOutcome};
use tracing::info;

use crate::AppContext;
use crate::cli::{ApplyArgs, ResetArgs, ShowArgs, StorageArgs, StorageCommands, TabArgs, ToggleArgs};

pub async fn handle_show(args: ShowArgs, cx: &AppContext) -> Result<()> {
    let model = cx.workspace.model();
    if args.json {
        println!("{}", serde_json::to_string_pretty(model)?);
        return Ok(());
    }

    println!(
        "Direction: {}  Splitter: {}px  Remembered panels: {}",
        style(model.global.direction).bold(),
        model.global.splitter_size,
        cx.workspace.restore_cache().len()
    );
    print_node(&model.layout, 0, false);
    Ok(())
}

fn print_node(node: &LayoutNode, depth: usize, active: bool) {
    let indent = "  ".repeat(depth);
    match node.kind {
        NodeKind::Tab => {
            let marker = if active { "*" } else { "-" };
            println!(
                "{}{} {} {}",
                indent,
                marker,
                node.name.as_deref().unwrap_or(&node.id),
                style(format!("({}, {})", node.component.as_deref().unwrap_or("?"), node.id)).dim()
            );
        }
        kind => {
            let label = match kind {
                NodeKind::Row => "row",
                NodeKind::Column => "column",
                _ => "tabset",
            };
            println!("{}{} {}", indent, style(label).cyan(), node.id);
        }
    }
    for (index, child) in node.children.iter().enumerate() {
        print_node(child, depth + 1, node.selected == Some(index));
    }
}

pub async fn handle_panels(cx: &AppContext) -> Result<()> {
    for panel in PANELS {
        let visible = cx.workspace.is_visible(panel.key);
        let mark = if visible {
            style("[x]").green()
        } else {
            style("[ ]").dim()
        };
        println!("{} {:<14} {}", mark, panel.key, panel.name);
    }
    Ok(())
}

pub async fn handle_toggle(args: ToggleArgs, cx: &mut AppContext) -> Result<()> {
    for key in &args.keys {
        match cx.workspace.toggle_panel(key) {
            ToggleOutcome::Hidden => println!("{} {}", style("Hidden").yellow(), key),
            ToggleOutcome::Shown => println!("{} {}", style("Shown").green(), key),
            ToggleOutcome::UnknownPanel => anyhow::bail!("Unknown panel: {}", key),
            ToggleOutcome::NotRestorable => println!("{} {} (no way to restore it)", style("Unchanged").red(), key),
        }
    }
    Ok(())
}

pub async fn handle_visible(key: &str, cx: &AppContext) -> Result<()> {
    if cx.workspace.is_visible(key) {
        println!("{} is visible", key);
    } else {
        println!("{} is hidden", key);
    }
    Ok(())
}

pub async fn handle_direction(direction: Option<Direction>, cx: &mut AppContext) -> Result<()> {
    let direction = match direction {
        Some(direction) => {
            cx.workspace.set_direction(direction);
            direction
        }
        None => cx.workspace.toggle_direction(),
    };
    println!("Direction: {}", style(direction).bold());
    Ok(())
}

pub async fn handle_select(args: TabArgs, cx: &mut AppContext) -> Result<()> {
    let changed = cx
        .workspace
        .select_tab(&args.tabset, args.index)
        .with_context(|| format!("Cannot select tab {} of '{}'", args.index, args.tabset))?;
    if !changed {
        println!("Tab {} of '{}' is already active", args.index, args.tabset);
    }
    Ok(())
}

pub async fn handle_close(args: TabArgs, cx: &mut AppContext) -> Result<()> {
    let tab_id = cx
        .workspace
        .close_tab(&args.tabset, args.index)
        .with_context(|| format!("Cannot close tab {} of '{}'", args.index, args.tabset))?;
    println!("Closed {} (reopen with `tabstash restore {}`)", tab_id, tab_id);
    Ok(())
}

pub async fn handle_close_tabset(tabset: &str, cx: &mut AppContext) -> Result<()> {
    let closed = cx
        .workspace
        .close_tabset(tabset)
        .with_context(|| format!("Cannot close tabset '{}'", tabset))?;
    println!("Closed {}: {}", tabset, closed.join(", "));
    Ok(())
}

pub async fn handle_restore(tab_id: &str, cx: &mut AppContext) -> Result<()> {
    let restored = cx
        .workspace
        .restore_closed(tab_id)
        .with_context(|| format!("No closed tab '{}' to restore", tab_id))?;
    if restored {
        println!("Restored {}", tab_id);
    } else {
        println!("{} is already open", tab_id);
    }
    Ok(())
}

pub async fn handle_reset(args: ResetArgs, cx: &mut AppContext) -> Result<()> {
    if args.layout_only {
        cx.workspace.reset_layout();
        println!("Layout reset");
        return Ok(());
    }

    if !args.yes && !confirm("Delete the stored workspace and start over?").await? {
        println!("Cancelled");
        return Ok(());
    }
    cx.workspace.reset();
    println!("Stored workspace deleted");
    Ok(())
}

// Runs the prompt off the async executor.
async fn confirm(prompt: &str) -> Result<bool> {
    let prompt = prompt.to_string();
    let answer = tokio::task::spawn_blocking(move || {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    })
    .await
    .context("Blocking task failed (panic)")??;
    Ok(answer)
}

pub async fn handle_storage(args: StorageArgs, cx: &mut AppContext) -> Result<()> {
    match args.command {
        StorageCommands::Status => {
            let workspace = &cx.workspace;
            let enabled = if workspace.persistence_enabled() {
                style("enabled").green()
            } else {
                style("disabled").yellow()
            };
            println!("Backend:     {}", workspace.storage_kind());
            println!("Persistence: {}", enabled);
            println!("Storage key: {}", workspace.config().storage_key);
            println!("Remembered:  {} panel(s)", workspace.restore_cache().len());
        }
        StorageCommands::Enable => {
            cx.workspace.set_persistence_enabled(true);
            info!("Persistence enabled");
        }
        StorageCommands::Disable => {
            cx.workspace.set_persistence_enabled(false);
            info!("Persistence disabled");
        }
    }
    Ok(())
}

pub async fn handle_apply(args: ApplyArgs, cx: &mut AppContext) -> Result<()> {
    let content = tokio::fs::read_to_string(&args.path)
        .await
        .with_context(|| format!("Failed to read {}", args.path.display()))?;

    if args.action {
        let action: LayoutAction = serde_json::from_str(&content).context("Not a layout action")?;
        match cx.workspace.handle_action(action)? {
            ActionOutcome::Applied => println!("Action applied"),
            ActionOutcome::Ignored => println!("Action changed nothing"),
            ActionOutcome::Intercepted => println!("Direction changes go through `tabstash direction`"),
        }
    } else {
        let update: ModelUpdate = serde_json::from_str(&content).context("Not a model update")?;
        if cx.workspace.apply_update(update) {
            println!("Update applied");
        } else {
            println!("Update changed nothing");
        }
    }
    Ok(())
}
