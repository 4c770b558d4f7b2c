//! Core data types shared by the normalizer, the replay engine and storage.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A dated membership change, one row of the durable event log.
///
/// A factor revision uses the same code as both `removed_code` and
/// `added_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub effective_date: NaiveDate,
    pub removed_code: Option<String>,
    pub added_code: Option<String>,
    pub adjustment_factor: Option<String>,
    pub divisor: Option<f64>,
}

/// The ordered, append-only change history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog {
    events: Vec<ChangeEvent>,
}

impl EventLog {
    /// Build a log, stable-sorting by effective date so ties keep input order.
    pub fn new(mut events: Vec<ChangeEvent>) -> Self {
        events.sort_by_key(|e| e.effective_date);
        Self { events }
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeEvent> {
        self.events.iter()
    }

    /// Events in effect on or before `date`.
    pub fn up_to(&self, date: NaiveDate) -> &[ChangeEvent] {
        let end = self.events.partition_point(|e| e.effective_date <= date);
        &self.events[..end]
    }

    /// Events in the half-open window `(after, until]`.
    pub fn between(&self, after: NaiveDate, until: NaiveDate) -> &[ChangeEvent] {
        let start = self.events.partition_point(|e| e.effective_date <= after);
        let end = self.events.partition_point(|e| e.effective_date <= until);
        &self.events[start..end.max(start)]
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a ChangeEvent;
    type IntoIter = std::slice::Iter<'a, ChangeEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// The earliest fully known membership.
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineSnapshot {
    pub effective_from: NaiveDate,
    pub divisor: f64,
    /// Constituent code to adjustment-factor expression.
    pub members: BTreeMap<String, String>,
}

/// Point-in-time membership produced by replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MembershipSnapshot {
    pub as_of: NaiveDate,
    pub divisor: f64,
    pub members: BTreeMap<String, String>,
}

impl MembershipSnapshot {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.members.contains_key(code)
    }

    /// Compare against a later snapshot.
    pub fn diff(&self, later: &MembershipSnapshot) -> MembershipDiff {
        let removed = self
            .members
            .keys()
            .filter(|code| !later.members.contains_key(*code))
            .cloned()
            .collect();
        let added = later
            .members
            .keys()
            .filter(|code| !self.members.contains_key(*code))
            .cloned()
            .collect();
        let refactored = self
            .members
            .iter()
            .filter_map(|(code, before)| {
                let after = later.members.get(code)?;
                (after != before).then(|| FactorChange {
                    code: code.clone(),
                    before: before.clone(),
                    after: after.clone(),
                })
            })
            .collect();

        MembershipDiff {
            from: self.as_of,
            to: later.as_of,
            removed,
            added,
            refactored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorChange {
    pub code: String,
    pub before: String,
    pub after: String,
}

/// Membership differences between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MembershipDiff {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub removed: Vec<String>,
    pub added: Vec<String>,
    pub refactored: Vec<FactorChange>,
}

impl MembershipDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.refactored.is_empty()
    }
}
