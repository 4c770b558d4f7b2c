//! The `codes` subcommand: every code that was ever a constituent.

use anyhow::Result;
use n225_lib::pipeline::load_composition;
use n225_lib::N225Config;

use crate::output::{build_code_rows, print_rows, OutputFormat};

pub fn run(config: &N225Config, format: &OutputFormat) -> Result<()> {
    let composition = load_composition(config)?;
    let codes = composition.get_all_stock_codes();

    eprintln!("{} known codes", codes.len());
    print_rows(build_code_rows(&codes), &codes, format)
}
