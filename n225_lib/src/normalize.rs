//! Turns an extraction report into the dated event log.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::extract::{normalize_code, DivisorNotice, ExtractionReport};
use crate::factor::{FactorError, FactorExpr};
use crate::types::{ChangeEvent, EventLog};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("event effective {date} precedes the first known divisor")]
    LeadingDivisorGap { date: NaiveDate },
    #[error("invalid constituent code '{code}' in {filename}")]
    InvalidCode { code: String, filename: String },
    #[error("invalid adjustment factor for {code} in {filename}: {source}")]
    InvalidFactor {
        code: String,
        filename: String,
        #[source]
        source: FactorError,
    },
    #[error("no effective date for {code} in {filename}")]
    MissingEffectiveDate { code: String, filename: String },
}

/// Build the event log from extracted changes and divisor notices.
///
/// Batches arrive in descending filename order and are reversed so that
/// same-day events keep ascending publication order after the stable sort.
/// Each divisor notice is attached to every event on its effective date; a
/// later notice for the same date replaces an earlier one. The divisor is then
/// forward-filled, and an event before the first divisor is an error.
pub fn build_event_log(report: &ExtractionReport) -> Result<EventLog, NormalizeError> {
    let mut events = Vec::new();
    for batch in report.changes.iter().rev() {
        for row in &batch.changes.rows {
            let invalid_code = |code: &str| NormalizeError::InvalidCode {
                code: code.to_string(),
                filename: batch.filename.clone(),
            };
            let removed = normalize_code(&row.removed_code).ok_or_else(|| invalid_code(&row.removed_code))?;
            let added = normalize_code(&row.added_code).ok_or_else(|| invalid_code(&row.added_code))?;
            let factor = FactorExpr::parse(&row.adjustment_factor).map_err(|source| {
                NormalizeError::InvalidFactor {
                    code: added.clone(),
                    filename: batch.filename.clone(),
                    source,
                }
            })?;
            let effective_date = batch.changes.effective_date_for(row).ok_or_else(|| {
                NormalizeError::MissingEffectiveDate {
                    code: added.clone(),
                    filename: batch.filename.clone(),
                }
            })?;

            events.push(ChangeEvent {
                effective_date,
                removed_code: Some(removed),
                added_code: Some(added),
                adjustment_factor: Some(factor.to_string()),
                divisor: None,
            });
        }
    }
    events.sort_by_key(|e| e.effective_date);

    attach_divisors(&mut events, &report.divisors);
    forward_fill(&mut events)?;

    tracing::info!(
        "Normalized {} events from {} documents",
        events.len(),
        report.changes.len()
    );
    Ok(EventLog::new(events))
}

fn attach_divisors(events: &mut [ChangeEvent], notices: &[DivisorNotice]) {
    let mut ordered: Vec<&DivisorNotice> = notices.iter().collect();
    ordered.sort_by(|a, b| a.published.cmp(&b.published).then(a.filename.cmp(&b.filename)));

    let mut by_date: BTreeMap<NaiveDate, &DivisorNotice> = BTreeMap::new();
    for notice in ordered {
        if let Some(previous) = by_date.insert(notice.effective_date, notice) {
            tracing::debug!(
                "Divisor notice {} for {} superseded by {}",
                previous.filename,
                notice.effective_date,
                notice.filename
            );
        }
    }

    for (date, notice) in &by_date {
        let mut attached = 0;
        for event in events.iter_mut().filter(|e| e.effective_date == *date) {
            event.divisor = Some(notice.divisor);
            attached += 1;
        }
        if attached == 0 {
            tracing::debug!(
                "Divisor {} effective {} ({}) matches no change event, dropped",
                notice.divisor,
                date,
                notice.filename
            );
        } else {
            tracing::debug!("Divisor {} attached to {} events on {}", notice.divisor, attached, date);
        }
    }
}

fn forward_fill(events: &mut [ChangeEvent]) -> Result<(), NormalizeError> {
    let mut current: Option<f64> = None;
    for event in events.iter_mut() {
        match (event.divisor, current) {
            (Some(divisor), _) => current = Some(divisor),
            (None, Some(divisor)) => event.divisor = Some(divisor),
            (None, None) => {
                return Err(NormalizeError::LeadingDivisorGap {
                    date: event.effective_date,
                })
            }
        }
    }
    Ok(())
}
