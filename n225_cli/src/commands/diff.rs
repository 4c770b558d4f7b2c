//! The `diff` subcommand: membership changes between two dates.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::Args;
use n225_lib::pipeline::load_composition;
use n225_lib::{ChangeEvent, MembershipDiff, N225Config};
use serde::Serialize;

use crate::output::{build_diff_rows, build_event_rows, print_rows, print_table, OutputFormat};

#[derive(Args)]
pub struct DiffArgs {
    /// Earlier date (YYYY-MM-DD), exclusive
    #[arg(long)]
    pub from: NaiveDate,

    /// Later date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub to: NaiveDate,

    /// Also list the change events in the window
    #[arg(long)]
    pub events: bool,
}

#[derive(Serialize)]
struct DiffOutput<'a> {
    diff: MembershipDiff,
    events: &'a [ChangeEvent],
}

pub fn run(args: &DiffArgs, config: &N225Config, format: &OutputFormat) -> Result<()> {
    if args.from > args.to {
        bail!("--from {} is after --to {}", args.from, args.to);
    }
    let composition = load_composition(config)?;
    let earlier = composition.get_compositions(args.from)?;
    let later = composition.get_compositions(args.to)?;
    let diff = earlier.diff(&later);
    let events = composition.changes_between(args.from, args.to);

    eprintln!(
        "{} removed, {} added, {} factor changes between {} and {} ({} events)",
        diff.removed.len(),
        diff.added.len(),
        diff.refactored.len(),
        args.from,
        args.to,
        events.len()
    );

    let rows = build_diff_rows(&diff);
    print_rows(rows, &DiffOutput { diff, events }, format)?;
    if args.events && matches!(format, OutputFormat::Table) {
        print_table(build_event_rows(events));
    }
    Ok(())
}
