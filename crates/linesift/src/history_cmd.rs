use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use linesift_core::Filterer;
use linesift_history::{HistoryEntry, HistoryStore};
use linesift_logging::Logger;

use crate::config::Settings;
use crate::filter_cmd;
use crate::input::Input;

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// List remembered filter sets, most recent first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the filters of one entry
    Show {
        /// Entry number as shown by `history list` (1 is the most recent)
        n: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply a remembered filter set to a source
    Rerun {
        /// File to filter, or `-` for stdin
        source: String,

        /// Entry number (launches interactive picker if omitted)
        #[arg(short = 'n', long = "entry")]
        entry: Option<usize>,

        /// Write matching lines to this file instead of stdout
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },

    /// Edit the history file in $EDITOR
    Edit,

    /// Forget all remembered filter sets
    Clear,
}

/// Run a history action and return the process exit code.
pub fn handle_history_command(
    action: HistoryAction,
    settings: &Settings,
    logger: &Logger,
) -> Result<i32> {
    let store = settings.history_store();

    match action {
        HistoryAction::List { json } => {
            let history = store.load();
            if json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else if history.is_empty() {
                println!("{}", "No history yet.".dimmed());
            } else {
                print_history_table(&history);
            }
        }
        HistoryAction::Show { n, json } => {
            let history = store.load();
            let entry = entry_at(&history, n)?;
            if json {
                println!("{}", serde_json::to_string_pretty(entry)?);
            } else {
                println!("{}  {}", "Applied:".dimmed(), entry.timestamp);
                for term in &entry.filters {
                    println!("  {}", term);
                }
            }
        }
        HistoryAction::Rerun {
            source,
            entry,
            output,
        } => {
            let filters = resolve_filters(&store, entry)?;
            let (input, source_id) = Input::open(&source)?;
            let filterer = Filterer::new(input, store);
            let mut target = filter_cmd::open_target(output);
            let outcome =
                filter_cmd::apply(&filterer, target.as_mut(), source_id, &filters, logger)?;
            return Ok(outcome.exit_code());
        }
        HistoryAction::Edit => {
            edit_history(&store)?;
        }
        HistoryAction::Clear => {
            store.clear().context("Failed to clear history")?;
            eprintln!("{} History cleared", "✓".bright_green());
        }
    }

    Ok(0)
}

/// Look up an entry by its 1-based position.
fn entry_at(history: &[HistoryEntry], n: usize) -> Result<&HistoryEntry> {
    n.checked_sub(1)
        .and_then(|i| history.get(i))
        .with_context(|| format!("No history entry {} ({} entries)", n, history.len()))
}

fn resolve_filters(store: &HistoryStore, entry: Option<usize>) -> Result<Vec<String>> {
    let history = store.load();

    if let Some(n) = entry {
        return Ok(entry_at(&history, n)?.filters.clone());
    }

    // Interactive picker
    if history.is_empty() {
        anyhow::bail!("No history yet.");
    }

    let items: Vec<String> = history
        .iter()
        .map(|e| format!("{} | {}", e.timestamp, e.summary()))
        .collect();

    let selection = dialoguer::FuzzySelect::new()
        .with_prompt("Select a filter set")
        .items(&items)
        .default(0)
        .interact()?;

    Ok(history[selection].filters.clone())
}

/// Let the user edit the raw JSON. A malformed entry rejects the whole edit.
fn edit_history(store: &HistoryStore) -> Result<()> {
    let raw = store.to_raw()?;
    let edited = dialoguer::Editor::new()
        .extension(".json")
        .edit(&raw)
        .context("Failed to open editor")?;

    let Some(edited) = edited else {
        eprintln!("{}", "History unchanged.".dimmed());
        return Ok(());
    };

    let saved = store
        .save_raw(&edited)
        .context("Edited history was not saved")?;
    eprintln!(
        "{} Saved {} {}",
        "✓".bright_green(),
        saved.len(),
        if saved.len() == 1 { "entry" } else { "entries" }
    );
    Ok(())
}

fn print_history_table(history: &[HistoryEntry]) {
    println!(
        "{:<4} {:<20} {}",
        "#".dimmed(),
        "TIMESTAMP".dimmed(),
        "FILTERS".dimmed(),
    );

    for (i, entry) in history.iter().enumerate() {
        println!(
            "{:<4} {:<20} {}",
            i + 1,
            entry.timestamp,
            format_filters(&entry.filters)
        );
    }
}

/// Include terms plain, exclude terms in red.
fn format_filters(filters: &[String]) -> String {
    if filters.is_empty() {
        return "(no filters)".dimmed().to_string();
    }
    filters
        .iter()
        .map(|term| {
            if term.starts_with(linesift_core::NEGATION_PREFIX) {
                term.bright_red().to_string()
            } else {
                term.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
