//! The `build-log` subcommand: offline event-log rebuild from extracted documents.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use n225_lib::extract::UnparsedDocument;
use n225_lib::pipeline::rebuild_event_log;
use n225_lib::{N225Config, TradingCalendar};
use serde::Serialize;

use crate::output::{build_event_rows, build_unparsed_rows, print_rows, print_table, OutputFormat};

#[derive(Args)]
pub struct BuildLogArgs {
    /// Directory of extracted `YYYY-MM-DD_<title>.json` documents
    #[arg(long)]
    pub documents: Option<PathBuf>,

    /// Where to write the event log (defaults to the configured path)
    #[arg(long)]
    pub event_log: Option<PathBuf>,
}

#[derive(Serialize)]
struct BuildSummary<'a> {
    event_log: &'a PathBuf,
    events: usize,
    change_documents: usize,
    divisor_notices: usize,
    skipped_before_cutover: usize,
    unparsed: &'a [UnparsedDocument],
}

pub fn run(args: &BuildLogArgs, config: &N225Config, format: &OutputFormat) -> Result<()> {
    let mut config = config.clone();
    if let Some(dir) = &args.documents {
        config.documents_dir = dir.clone();
    }
    if let Some(path) = &args.event_log {
        config.event_log_path = path.clone();
    }

    let calendar = TradingCalendar::jpx()?;
    let rebuild = rebuild_event_log(&config, &calendar)?;
    let report = &rebuild.report;
    let events = rebuild.composition.events();

    eprintln!(
        "Wrote {} events to {} ({} change documents, {} divisor notices, {} unparsed, {} before cutover)",
        events.len(),
        config.event_log_path.display(),
        report.changes.len(),
        report.divisors.len(),
        report.unparsed.len(),
        report.skipped
    );

    let summary = BuildSummary {
        event_log: &config.event_log_path,
        events: events.len(),
        change_documents: report.changes.len(),
        divisor_notices: report.divisors.len(),
        skipped_before_cutover: report.skipped,
        unparsed: &report.unparsed,
    };
    match format {
        OutputFormat::Table => {
            print_table(build_event_rows(events.events()));
            if !report.unparsed.is_empty() {
                print_table(build_unparsed_rows(&report.unparsed));
            }
        }
        _ => print_rows(build_unparsed_rows(&report.unparsed), &summary, format)?,
    }
    Ok(())
}
