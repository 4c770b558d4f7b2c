//! Load-and-query and offline rebuild entry points over the configured files.

use crate::calendar::TradingCalendar;
use crate::config::N225Config;
use crate::error::N225Error;
use crate::extract::{process_documents, ExtractionReport};
use crate::normalize::build_event_log;
use crate::replay::{IndexComposition, ReplayError};
use crate::store;
use crate::types::BaselineSnapshot;

/// Read the baseline and check it has the configured constituent count.
pub fn load_baseline(config: &N225Config) -> Result<BaselineSnapshot, N225Error> {
    let baseline = store::read_baseline(&config.baseline_path)?;
    if baseline.members.len() != config.constituent_count {
        return Err(ReplayError::BaselineSize {
            expected: config.constituent_count,
            actual: baseline.members.len(),
        }
        .into());
    }
    Ok(baseline)
}

/// Baseline plus persisted event log, ready for queries.
pub fn load_composition(config: &N225Config) -> Result<IndexComposition, N225Error> {
    let baseline = load_baseline(config)?;
    let events = store::read_event_log(&config.event_log_path)?;
    tracing::debug!(
        "Loaded baseline from {} and {} events",
        baseline.effective_from,
        events.len()
    );
    Ok(IndexComposition::new(baseline, events))
}

/// Outcome of a rebuild: the extraction report and the verified composition.
#[derive(Debug)]
pub struct Rebuild {
    pub report: ExtractionReport,
    pub composition: IndexComposition,
}

/// Re-extract every document, normalize, verify against the baseline and
/// write the event log. Nothing is written unless the new log replays cleanly.
pub fn rebuild_event_log(
    config: &N225Config,
    calendar: &TradingCalendar,
) -> Result<Rebuild, N225Error> {
    let baseline = load_baseline(config)?;
    let loaded = store::load_documents(&config.documents_dir)?;

    let mut report = process_documents(loaded.documents, calendar, config.cutover_date);
    report.unparsed.extend(loaded.rejected);

    let events = build_event_log(&report)?;
    let composition = IndexComposition::new(baseline, events);
    composition.verify()?;

    store::write_event_log(&config.event_log_path, composition.events())?;
    tracing::info!(
        "Rebuilt event log: {} events, {} unparsed documents",
        composition.events().len(),
        report.unparsed.len()
    );
    Ok(Rebuild {
        report,
        composition,
    })
}
