//! CLI subcommand implementations.

pub mod build_log;
pub mod calendar;
pub mod codes;
pub mod compositions;
pub mod diff;
pub mod price;
