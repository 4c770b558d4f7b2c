mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use n225_lib::N225Config;

use crate::output::OutputFormat;

const DEFAULT_CONFIG: &str = "n225.toml";

#[derive(Parser)]
#[command(name = "n225")]
#[command(about = "Reconstruct point-in-time Nikkei 225 membership from announcements")]
struct Cli {
    /// Output format: table, json, or csv
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// Config file (TOML). Falls back to $N225_CONFIG, then ./n225.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Constituents and divisor on a date
    Compositions(commands::compositions::CompositionsArgs),
    /// Every code that was ever a constituent
    Codes,
    /// Index value on a date from a price file
    Price(commands::price::PriceArgs),
    /// Membership changes between two dates
    Diff(commands::diff::DiffArgs),
    /// Rebuild the event log from extracted documents
    BuildLog(commands::build_log::BuildLogArgs),
    /// Trading-day status of a date
    Calendar(commands::calendar::CalendarArgs),
}

fn load_config(explicit: Option<&PathBuf>) -> Result<N225Config> {
    if let Some(path) = explicit {
        return Ok(N225Config::load(path)?);
    }
    let path = std::env::var_os("N225_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    Ok(N225Config::load_or_default(Some(&path))?)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("n225=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.output);
    let config = load_config(cli.config.as_ref())?;

    match &cli.command {
        Commands::Compositions(args) => commands::compositions::run(args, &config, &format)?,
        Commands::Codes => commands::codes::run(&config, &format)?,
        Commands::Price(args) => commands::price::run(args, &config, &format)?,
        Commands::Diff(args) => commands::diff::run(args, &config, &format)?,
        Commands::BuildLog(args) => commands::build_log::run(args, &config, &format)?,
        Commands::Calendar(args) => commands::calendar::run(args, &format)?,
    }

    Ok(())
}
