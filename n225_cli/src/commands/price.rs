//! The `price` subcommand: index value from a price file.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use n225_lib::pipeline::load_composition;
use n225_lib::store::read_prices;
use n225_lib::{compute_index_value, N225Config};
use serde::Serialize;

use crate::output::{build_value_rows, print_rows, OutputFormat};

#[derive(Args)]
pub struct PriceArgs {
    /// Valuation date (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    /// CSV file with `code,price` rows
    #[arg(long)]
    pub prices: PathBuf,
}

#[derive(Serialize)]
struct IndexValue {
    date: NaiveDate,
    divisor: f64,
    members: usize,
    value: f64,
}

pub fn run(args: &PriceArgs, config: &N225Config, format: &OutputFormat) -> Result<()> {
    let composition = load_composition(config)?;
    let prices = read_prices(&args.prices)?;
    let snapshot = composition.get_compositions(args.date)?;
    let value = compute_index_value(&snapshot, &prices)?;

    let data = IndexValue {
        date: snapshot.as_of,
        divisor: snapshot.divisor,
        members: snapshot.len(),
        value,
    };
    print_rows(build_value_rows(&snapshot, value), &data, format)
}
