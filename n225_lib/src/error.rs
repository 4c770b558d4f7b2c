//! Error type for the pipeline layer.

use std::fmt;

use crate::calendar::CalendarError;
use crate::config::ConfigError;
use crate::index_value::IndexValueError;
use crate::normalize::NormalizeError;
use crate::replay::ReplayError;
use crate::store::StoreError;

/// Errors produced by the load and rebuild pipeline, wrapping the
/// per-component errors.
#[derive(Debug)]
pub enum N225Error {
    /// The holiday rule set could not be loaded.
    Calendar(CalendarError),
    /// The config file could not be read or was invalid.
    Config(ConfigError),
    /// A data file could not be read or written.
    Store(StoreError),
    /// Extracted changes could not be turned into an event log.
    Normalize(NormalizeError),
    /// The event log does not replay cleanly over the baseline.
    Replay(ReplayError),
    /// The index value could not be computed.
    IndexValue(IndexValueError),
}

impl fmt::Display for N225Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Calendar(e) => write!(f, "Calendar error: {}", e),
            Self::Config(e) => write!(f, "Config error: {}", e),
            Self::Store(e) => write!(f, "Storage error: {}", e),
            Self::Normalize(e) => write!(f, "Normalization error: {}", e),
            Self::Replay(e) => write!(f, "Replay error: {}", e),
            Self::IndexValue(e) => write!(f, "Index value error: {}", e),
        }
    }
}

impl std::error::Error for N225Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Calendar(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::Normalize(e) => Some(e),
            Self::Replay(e) => Some(e),
            Self::IndexValue(e) => Some(e),
        }
    }
}

impl From<CalendarError> for N225Error {
    fn from(e: CalendarError) -> Self {
        Self::Calendar(e)
    }
}

impl From<ConfigError> for N225Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StoreError> for N225Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<NormalizeError> for N225Error {
    fn from(e: NormalizeError) -> Self {
        Self::Normalize(e)
    }
}

impl From<ReplayError> for N225Error {
    fn from(e: ReplayError) -> Self {
        Self::Replay(e)
    }
}

impl From<IndexValueError> for N225Error {
    fn from(e: IndexValueError) -> Self {
        Self::IndexValue(e)
    }
}
