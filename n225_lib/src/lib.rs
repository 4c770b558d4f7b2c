//! Point-in-time Nikkei 225 membership reconstruction.
//!
//! Announcement documents are classified and extracted into dated change
//! events, normalized into a durable event log, and replayed over a baseline
//! snapshot to answer "what was the index membership and divisor on date D".

pub mod calendar;
pub mod config;
pub mod disambiguate;
pub mod document;
pub mod error;
pub mod extract;
pub mod factor;
pub mod index_value;
pub mod normalize;
pub mod pipeline;
pub mod replay;
pub mod store;
pub mod types;

pub use calendar::{CalendarError, HolidayRule, TradingCalendar};
pub use config::{ConfigError, N225Config};
pub use document::{Document, DocumentTable};
pub use error::N225Error;
pub use extract::{
    classify, extract, process_documents, Classification, DocumentOutcome, ExtractError,
    ExtractionReport, Template,
};
pub use factor::{evaluate_factor, FactorExpr};
pub use index_value::{compute_index_value, IndexValueError, PAR_VALUE};
pub use normalize::{build_event_log, NormalizeError};
pub use replay::{IndexComposition, ReplayError, SharedComposition};
pub use types::{
    BaselineSnapshot, ChangeEvent, EventLog, FactorChange, MembershipDiff, MembershipSnapshot,
};
