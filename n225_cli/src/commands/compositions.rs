//! The `compositions` subcommand: membership and divisor on a date.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use n225_lib::pipeline::load_composition;
use n225_lib::N225Config;

use crate::output::{build_member_rows, print_rows, OutputFormat};

#[derive(Args)]
pub struct CompositionsArgs {
    /// Query date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,
}

pub fn run(args: &CompositionsArgs, config: &N225Config, format: &OutputFormat) -> Result<()> {
    let composition = load_composition(config)?;
    let snapshot = composition.get_compositions(args.date)?;

    eprintln!(
        "{} members as of {} (divisor {})",
        snapshot.len(),
        snapshot.as_of,
        snapshot.divisor
    );
    print_rows(build_member_rows(&snapshot), &snapshot, format)
}
