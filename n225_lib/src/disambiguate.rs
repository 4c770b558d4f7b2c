//! Resolves month/day fragments from announcement text into effective dates.
//!
//! Announcements give the effective day without a year ("10月1日"). The year
//! comes from the publication date, rolling into the next year when the
//! naive candidate would precede publication, and the result is snapped to
//! the next trading day.

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::calendar::TradingCalendar;
use crate::extract::ExtractError;

/// Map full-width ASCII (U+FF01-U+FF5E) and the ideographic space to half-width.
pub fn normalize_width(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '\u{3000}' => ' ',
            _ => c,
        })
        .collect()
}

/// Resolve `(month, day)` against `doc_date`.
pub fn resolve_month_day(
    doc_date: NaiveDate,
    month: u32,
    day: u32,
    calendar: &TradingCalendar,
) -> Result<NaiveDate, ExtractError> {
    let invalid = || ExtractError::InvalidDate { month, day };

    let mut candidate = NaiveDate::from_ymd_opt(doc_date.year(), month, day).ok_or_else(invalid)?;
    if candidate < doc_date {
        candidate =
            NaiveDate::from_ymd_opt(doc_date.year() + 1, month, day).ok_or_else(invalid)?;
    }
    Ok(calendar.snap_forward(candidate))
}

/// Resolve a month/day written as digit strings, possibly full-width.
pub fn resolve_month_day_str(
    doc_date: NaiveDate,
    month: &str,
    day: &str,
    calendar: &TradingCalendar,
) -> Result<NaiveDate, ExtractError> {
    let month = parse_number(month)?;
    let day = parse_number(day)?;
    resolve_month_day(doc_date, month, day, calendar)
}

fn parse_number(raw: &str) -> Result<u32, ExtractError> {
    let normalized = normalize_width(raw);
    normalized
        .trim()
        .parse()
        .map_err(|_| ExtractError::Parse(format!("not a number: '{}'", raw)))
}

/// Find the effective date announced in `text`.
///
/// A month/day following an effective-date keyword wins. Otherwise the first
/// month/day that is not the publication day itself is used.
pub fn find_effective_date(
    text: &str,
    doc_date: NaiveDate,
    calendar: &TradingCalendar,
) -> Result<Option<NaiveDate>, ExtractError> {
    let normalized = normalize_width(text);

    let anchored = Regex::new(
        r"(?:実施日|変更日|入れ替え日|入替日|適用日)\s*:?\s*(?:\d{4}\s*年\s*)?(\d{1,2})\s*月\s*(\d{1,2})\s*日",
    )
    .map_err(|e| ExtractError::Parse(format!("regex compile error: {}", e)))?;
    if let Some(cap) = anchored.captures(&normalized) {
        return resolve_month_day_str(doc_date, &cap[1], &cap[2], calendar).map(Some);
    }

    let any = Regex::new(r"(\d{1,2})\s*月\s*(\d{1,2})\s*日")
        .map_err(|e| ExtractError::Parse(format!("regex compile error: {}", e)))?;
    for cap in any.captures_iter(&normalized) {
        let month = parse_number(&cap[1])?;
        let day = parse_number(&cap[2])?;
        if month == doc_date.month() && day == doc_date.day() {
            continue;
        }
        return resolve_month_day(doc_date, month, day, calendar).map(Some);
    }
    Ok(None)
}
