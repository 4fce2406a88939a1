use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use linesift_core::{FileTarget, FilterOutcome, Filterer, LineTarget, SourceId, WriterTarget};
use linesift_logging::{LogEvent, Logger};

use crate::config::Settings;
use crate::input::Input;

#[derive(Args, Debug)]
pub struct FilterArgs {
    /// File to filter, or `-` for stdin
    pub source: String,

    /// Terms to match; prefix with `!` to exclude lines containing the term
    pub terms: Vec<String>,

    /// Write matching lines to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// After each run, edit the terms in $EDITOR and apply them again
    #[arg(short, long)]
    pub edit: bool,
}

pub fn handle_filter_command(
    args: FilterArgs,
    settings: &Settings,
    logger: &Logger,
) -> Result<i32> {
    let (input, source_id) = Input::open(&args.source)?;
    let filterer = Filterer::new(input, settings.history_store());
    let mut target = open_target(args.output);

    let mut outcome = apply(&filterer, target.as_mut(), source_id, &args.terms, logger)?;

    if args.edit {
        while let Some(terms) = edit_terms(outcome.session.filters())? {
            let session = outcome.session.clone();
            outcome = filterer
                .rerun_to(target.as_mut(), &session, &terms)
                .with_context(|| format!("Failed to filter {}", session.source()))?;
            report(&outcome, logger);
        }
    }

    Ok(outcome.exit_code())
}

/// Filter `source_id` into `target` and log the result.
pub fn apply(
    filterer: &Filterer<Input>,
    target: &mut dyn LineTarget,
    source_id: SourceId,
    terms: &[String],
    logger: &Logger,
) -> Result<FilterOutcome> {
    let outcome = filterer
        .apply_to(target, source_id.clone(), terms)
        .with_context(|| format!("Failed to filter {}", source_id))?;
    report(&outcome, logger);
    Ok(outcome)
}

pub fn open_target(output: Option<PathBuf>) -> Box<dyn LineTarget> {
    match output {
        Some(path) => Box::new(FileTarget::new(path)),
        None => Box::new(WriterTarget::new(std::io::stdout())),
    }
}

fn report(outcome: &FilterOutcome, logger: &Logger) {
    logger.log(&LogEvent::FilterApplied {
        source: outcome.session.source().to_string(),
        terms: outcome.session.filters().to_vec(),
        matched: outcome.matched(),
        total: outcome.total_lines,
    });
    if let Some(ref warning) = outcome.history_warning {
        logger.log(&LogEvent::HistoryWarning {
            error: warning.to_string(),
        });
    }
}

/// Open the current terms in the editor. `None` ends the edit loop: the
/// editor was closed without saving, or the terms are empty or unchanged.
fn edit_terms(current: &[String]) -> Result<Option<Vec<String>>> {
    let text = current.join("\n");
    let edited = dialoguer::Editor::new()
        .extension(".txt")
        .edit(&text)
        .context("Failed to open editor")?;

    let Some(edited) = edited else {
        debug!("Editor closed without saving");
        return Ok(None);
    };

    let terms = parse_editor_terms(&edited);
    if terms.is_empty() || terms == current {
        return Ok(None);
    }
    Ok(Some(terms))
}

/// One term per line; blank lines are dropped.
pub fn parse_editor_terms(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}
