use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use n225_lib::extract::UnparsedDocument;
use n225_lib::{ChangeEvent, MembershipDiff, MembershipSnapshot, TradingCalendar};
use serde::Serialize;
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Self {
        match value {
            "json" => OutputFormat::Json,
            "csv" => OutputFormat::Csv,
            _ => OutputFormat::Table,
        }
    }
}

#[derive(Tabled, Serialize)]
pub struct MemberRow {
    #[tabled(rename = "Code")]
    #[serde(rename = "Code")]
    code: String,
    #[tabled(rename = "Factor")]
    #[serde(rename = "Factor")]
    factor: String,
}

#[derive(Tabled, Serialize)]
pub struct CodeRow {
    #[tabled(rename = "Code")]
    #[serde(rename = "Code")]
    code: String,
}

#[derive(Tabled, Serialize)]
pub struct EventRow {
    #[tabled(rename = "Date")]
    #[serde(rename = "Date")]
    date: String,
    #[tabled(rename = "Removed")]
    #[serde(rename = "Removed")]
    removed: String,
    #[tabled(rename = "Added")]
    #[serde(rename = "Added")]
    added: String,
    #[tabled(rename = "Factor")]
    #[serde(rename = "Factor")]
    factor: String,
    #[tabled(rename = "Divisor")]
    #[serde(rename = "Divisor")]
    divisor: String,
}

#[derive(Tabled, Serialize)]
pub struct DiffRow {
    #[tabled(rename = "Change")]
    #[serde(rename = "Change")]
    change: String,
    #[tabled(rename = "Code")]
    #[serde(rename = "Code")]
    code: String,
    #[tabled(rename = "Detail")]
    #[serde(rename = "Detail")]
    detail: String,
}

#[derive(Tabled, Serialize)]
pub struct ValueRow {
    #[tabled(rename = "Date")]
    #[serde(rename = "Date")]
    date: String,
    #[tabled(rename = "Members")]
    #[serde(rename = "Members")]
    members: usize,
    #[tabled(rename = "Divisor")]
    #[serde(rename = "Divisor")]
    divisor: String,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Tabled, Serialize)]
pub struct UnparsedRow {
    #[tabled(rename = "Filename")]
    #[serde(rename = "Filename")]
    filename: String,
    #[tabled(rename = "Reason")]
    #[serde(rename = "Reason")]
    reason: String,
}

#[derive(Tabled, Serialize)]
pub struct CalendarRow {
    #[tabled(rename = "Date")]
    #[serde(rename = "Date")]
    date: String,
    #[tabled(rename = "Weekday")]
    #[serde(rename = "Weekday")]
    weekday: String,
    #[tabled(rename = "Trading")]
    #[serde(rename = "Trading")]
    trading: String,
    #[tabled(rename = "Holiday")]
    #[serde(rename = "Holiday")]
    holiday: String,
}

// -- Row builders --

pub fn build_member_rows(snapshot: &MembershipSnapshot) -> Vec<MemberRow> {
    snapshot
        .members
        .iter()
        .map(|(code, factor)| MemberRow {
            code: code.clone(),
            factor: factor.clone(),
        })
        .collect()
}

pub fn build_code_rows<'a>(codes: impl IntoIterator<Item = &'a String>) -> Vec<CodeRow> {
    codes
        .into_iter()
        .map(|code| CodeRow { code: code.clone() })
        .collect()
}

pub fn build_event_rows(events: &[ChangeEvent]) -> Vec<EventRow> {
    events
        .iter()
        .map(|e| EventRow {
            date: e.effective_date.to_string(),
            removed: e.removed_code.clone().unwrap_or_default(),
            added: e.added_code.clone().unwrap_or_default(),
            factor: e.adjustment_factor.clone().unwrap_or_default(),
            divisor: e.divisor.map(format_divisor).unwrap_or_default(),
        })
        .collect()
}

pub fn build_diff_rows(diff: &MembershipDiff) -> Vec<DiffRow> {
    let removed = diff.removed.iter().map(|code| DiffRow {
        change: "removed".to_string(),
        code: code.clone(),
        detail: String::new(),
    });
    let added = diff.added.iter().map(|code| DiffRow {
        change: "added".to_string(),
        code: code.clone(),
        detail: String::new(),
    });
    let refactored = diff.refactored.iter().map(|c| DiffRow {
        change: "factor".to_string(),
        code: c.code.clone(),
        detail: format!("{} -> {}", c.before, c.after),
    });
    removed.chain(added).chain(refactored).collect()
}

pub fn build_value_rows(snapshot: &MembershipSnapshot, value: f64) -> Vec<ValueRow> {
    vec![ValueRow {
        date: snapshot.as_of.to_string(),
        members: snapshot.len(),
        divisor: format_divisor(snapshot.divisor),
        value: format!("{:.2}", value),
    }]
}

pub fn build_unparsed_rows(unparsed: &[UnparsedDocument]) -> Vec<UnparsedRow> {
    unparsed
        .iter()
        .map(|u| UnparsedRow {
            filename: u.filename.clone(),
            reason: u.reason.clone(),
        })
        .collect()
}

pub fn build_calendar_rows(calendar: &TradingCalendar, dates: &[NaiveDate]) -> Vec<CalendarRow> {
    dates
        .iter()
        .map(|&date| CalendarRow {
            date: date.to_string(),
            weekday: format!("{:?}", date.weekday()),
            trading: if calendar.is_trading_day(date) { "yes" } else { "no" }.to_string(),
            holiday: calendar.holiday_name(date).unwrap_or_default().to_string(),
        })
        .collect()
}

// -- Output --

pub fn print_table<T: Tabled>(rows: Vec<T>) {
    println!("{}", Table::new(rows));
}

pub fn print_csv<T: Serialize>(rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Table or CSV for `rows`; JSON for `data`.
pub fn print_rows<T, D>(rows: Vec<T>, data: &D, format: &OutputFormat) -> Result<()>
where
    T: Tabled + Serialize,
    D: Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => print_table(rows),
        OutputFormat::Json => print_json(data),
        OutputFormat::Csv => print_csv(&rows)?,
    }
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

fn format_divisor(divisor: f64) -> String {
    format!("{:.3}", divisor)
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
