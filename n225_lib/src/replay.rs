//! Point-in-time membership by replaying the event log over the baseline.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use thiserror::Error;

use crate::index_value::{compute_index_value, IndexValueError};
use crate::types::{BaselineSnapshot, ChangeEvent, EventLog, MembershipSnapshot};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayError {
    #[error("date {requested} is not supported: history starts at {supported_from}")]
    UnsupportedDate {
        requested: NaiveDate,
        supported_from: NaiveDate,
    },
    #[error("inconsistent event log on {date}: {reason}")]
    InconsistentEventLog { date: NaiveDate, reason: String },
    #[error("corrupt event log: {actual} members as of {as_of}, expected {expected}")]
    CorruptEventLog {
        expected: usize,
        actual: usize,
        as_of: NaiveDate,
    },
    #[error("baseline has {actual} members, expected {expected}")]
    BaselineSize { expected: usize, actual: usize },
}

/// Baseline plus event log, answering point-in-time queries.
///
/// The fixed constituent count is the baseline's member count.
#[derive(Debug, Clone)]
pub struct IndexComposition {
    baseline: BaselineSnapshot,
    events: EventLog,
}

impl IndexComposition {
    pub fn new(baseline: BaselineSnapshot, events: EventLog) -> Self {
        Self { baseline, events }
    }

    pub fn baseline(&self) -> &BaselineSnapshot {
        &self.baseline
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn constituent_count(&self) -> usize {
        self.baseline.members.len()
    }

    /// Membership and divisor in effect on `date`.
    pub fn get_compositions(&self, date: NaiveDate) -> Result<MembershipSnapshot, ReplayError> {
        if date < self.baseline.effective_from {
            return Err(ReplayError::UnsupportedDate {
                requested: date,
                supported_from: self.baseline.effective_from,
            });
        }

        let mut snapshot = MembershipSnapshot {
            as_of: date,
            divisor: self.baseline.divisor,
            members: self.baseline.members.clone(),
        };
        for event in self.events.up_to(date) {
            apply(&mut snapshot, event)?;
        }
        self.check_count(&snapshot, date)?;
        Ok(snapshot)
    }

    /// Every code that was ever a member, regardless of date.
    pub fn get_all_stock_codes(&self) -> BTreeSet<String> {
        self.baseline
            .members
            .keys()
            .cloned()
            .chain(self.events.iter().filter_map(|e| e.added_code.clone()))
            .collect()
    }

    pub fn calculate_index_price(
        &self,
        date: NaiveDate,
        prices: &HashMap<String, f64>,
    ) -> Result<f64, IndexValueError> {
        let snapshot = self.get_compositions(date)?;
        compute_index_value(&snapshot, prices)
    }

    /// Events taking effect in `(after, until]`.
    pub fn changes_between(&self, after: NaiveDate, until: NaiveDate) -> &[ChangeEvent] {
        self.events.between(after, until)
    }

    /// Replay the whole log, checking the member count after every effective date.
    pub fn verify(&self) -> Result<(), ReplayError> {
        let mut snapshot = MembershipSnapshot {
            as_of: self.baseline.effective_from,
            divisor: self.baseline.divisor,
            members: self.baseline.members.clone(),
        };
        let events = self.events.events();
        for (i, event) in events.iter().enumerate() {
            apply(&mut snapshot, event)?;
            let last_of_day = events
                .get(i + 1)
                .map_or(true, |next| next.effective_date != event.effective_date);
            if last_of_day {
                self.check_count(&snapshot, event.effective_date)?;
            }
        }
        tracing::debug!("Verified {} events against the baseline", events.len());
        Ok(())
    }

    fn check_count(&self, snapshot: &MembershipSnapshot, as_of: NaiveDate) -> Result<(), ReplayError> {
        let expected = self.constituent_count();
        if snapshot.members.len() != expected {
            return Err(ReplayError::CorruptEventLog {
                expected,
                actual: snapshot.members.len(),
                as_of,
            });
        }
        Ok(())
    }
}

fn apply(snapshot: &mut MembershipSnapshot, event: &ChangeEvent) -> Result<(), ReplayError> {
    let date = event.effective_date;
    if let Some(code) = &event.removed_code {
        if snapshot.members.remove(code).is_none() {
            return Err(ReplayError::InconsistentEventLog {
                date,
                reason: format!("remove of {} which is not a member", code),
            });
        }
    }
    if let Some(code) = &event.added_code {
        let factor = event.adjustment_factor.clone().ok_or_else(|| ReplayError::InconsistentEventLog {
            date,
            reason: format!("add of {} without an adjustment factor", code),
        })?;
        if snapshot.members.insert(code.clone(), factor).is_some() {
            return Err(ReplayError::InconsistentEventLog {
                date,
                reason: format!("add of {} which is already a member", code),
            });
        }
    }
    if let Some(divisor) = event.divisor {
        snapshot.divisor = divisor;
    }
    Ok(())
}

/// A composition shared between concurrent readers and one rebuilding writer.
///
/// Readers clone the current `Arc` and keep querying it even after a swap.
#[derive(Debug)]
pub struct SharedComposition {
    current: RwLock<Arc<IndexComposition>>,
}

impl SharedComposition {
    pub fn new(composition: IndexComposition) -> Self {
        Self {
            current: RwLock::new(Arc::new(composition)),
        }
    }

    pub fn current(&self) -> Arc<IndexComposition> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install a rebuilt composition, returning the one it replaces.
    pub fn replace(&self, composition: IndexComposition) -> Arc<IndexComposition> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(composition))
    }
}
