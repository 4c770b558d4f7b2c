//! The `calendar` subcommand: trading-day status and neighbours of a date.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use n225_lib::TradingCalendar;
use serde::Serialize;

use crate::output::{build_calendar_rows, print_rows, OutputFormat};

#[derive(Args)]
pub struct CalendarArgs {
    /// Date to inspect (YYYY-MM-DD)
    #[arg(long)]
    pub date: NaiveDate,

    /// Also show the Nth trading day after the date
    #[arg(long)]
    pub next: Option<u32>,

    /// Also show the Nth trading day before the date
    #[arg(long)]
    pub previous: Option<u32>,
}

#[derive(Serialize)]
struct CalendarInfo {
    date: NaiveDate,
    trading: bool,
    holiday: Option<String>,
    next: Option<NaiveDate>,
    previous: Option<NaiveDate>,
    lending_days: Option<u32>,
}

pub fn run(args: &CalendarArgs, format: &OutputFormat) -> Result<()> {
    let calendar = TradingCalendar::jpx()?;
    let next = args.next.map(|n| calendar.next_trading_date(args.date, n));
    let previous = args.previous.map(|n| calendar.previous_trading_date(args.date, n));

    let info = CalendarInfo {
        date: args.date,
        trading: calendar.is_trading_day(args.date),
        holiday: calendar.holiday_name(args.date).map(str::to_string),
        next,
        previous,
        lending_days: calendar.lending_days(args.date).ok(),
    };

    let dates: Vec<NaiveDate> = previous
        .into_iter()
        .chain(std::iter::once(args.date))
        .chain(next)
        .collect();
    if let Some(days) = info.lending_days {
        eprintln!("Lending days for a trade on {}: {}", args.date, days);
    }
    print_rows(build_calendar_rows(&calendar, &dates), &info, format)
}
