//! Holiday rules for the trading calendar.
//!
//! Rules are plain data, parsed from YAML and composed into an immutable set
//! at construction time. The exchange's own set follows the same compile-time
//! `include_str!` pattern as the other seed files.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::japan::public_holiday_name;
use super::CalendarError;

/// A named predicate over calendar dates.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HolidayRule {
    /// Japanese national public holidays, substitute and citizens' holidays included.
    JapanesePublic { name: String },
    /// A single historic closure.
    SingleDate { name: String, date: NaiveDate },
    /// The same day range every year, e.g. Jan 1-3.
    AnnualRange {
        name: String,
        month: u32,
        first_day: u32,
        last_day: u32,
    },
    /// Every occurrence of a weekday.
    Weekday { name: String, weekday: Weekday },
}

impl HolidayRule {
    pub fn name(&self) -> &str {
        match self {
            Self::JapanesePublic { name }
            | Self::SingleDate { name, .. }
            | Self::AnnualRange { name, .. }
            | Self::Weekday { name, .. } => name,
        }
    }

    /// Returns the holiday name when the rule matches `date`.
    ///
    /// The public-holiday rule reports the specific holiday (e.g. "春分の日")
    /// rather than the rule's own name.
    pub fn holiday_name(&self, date: NaiveDate) -> Option<&str> {
        match self {
            Self::JapanesePublic { .. } => public_holiday_name(date),
            Self::SingleDate { name, date: closed } => (date == *closed).then_some(name.as_str()),
            Self::AnnualRange {
                name,
                month,
                first_day,
                last_day,
            } => (date.month() == *month && (*first_day..=*last_day).contains(&date.day()))
                .then_some(name.as_str()),
            Self::Weekday { name, weekday } => (date.weekday() == *weekday).then_some(name.as_str()),
        }
    }

    pub fn matches(&self, date: NaiveDate) -> bool {
        self.holiday_name(date).is_some()
    }

    fn validate(&self) -> Result<(), CalendarError> {
        if self.name().trim().is_empty() {
            return Err(CalendarError::InvalidRule("rule name is empty".to_string()));
        }
        if let Self::AnnualRange {
            name,
            month,
            first_day,
            last_day,
        } = self
        {
            if !(1..=12).contains(month) {
                return Err(CalendarError::InvalidRule(format!(
                    "rule '{}' has month {} outside 1-12",
                    name, month
                )));
            }
            if *first_day == 0 || first_day > last_day || *last_day > 31 {
                return Err(CalendarError::InvalidRule(format!(
                    "rule '{}' has invalid day range {}-{}",
                    name, first_day, last_day
                )));
            }
        }
        Ok(())
    }
}

/// Top-level structure for a holiday rule YAML file.
#[derive(Deserialize, Debug)]
struct HolidayRuleFile {
    rules: Vec<HolidayRule>,
}

/// Parse and validate holiday rules from YAML content.
pub fn parse_holiday_rules(yaml_content: &str) -> Result<Vec<HolidayRule>, CalendarError> {
    let file: HolidayRuleFile = serde_yml::from_str(yaml_content)?;
    validate_rules(&file.rules)?;
    Ok(file.rules)
}

/// Load the exchange holiday rules from the embedded YAML file.
pub fn load_exchange_rules() -> Result<Vec<HolidayRule>, CalendarError> {
    let yaml_content = include_str!("../../../seed_data/exchange_holidays.yml");
    parse_holiday_rules(yaml_content)
}

pub(crate) fn validate_rules(rules: &[HolidayRule]) -> Result<(), CalendarError> {
    for rule in rules {
        rule.validate()?;
    }

    // Ranges spanning a whole month between them leave no trading day to walk to.
    let mut covered = [[false; 32]; 13];
    for rule in rules {
        if let HolidayRule::AnnualRange {
            month,
            first_day,
            last_day,
            ..
        } = rule
        {
            for day in *first_day..=*last_day {
                covered[*month as usize][day as usize] = true;
            }
        }
    }
    if covered.iter().any(|days| days.iter().filter(|c| **c).count() >= 28) {
        return Err(CalendarError::NoTradingDays);
    }

    let closed_weekdays: Vec<Weekday> = rules
        .iter()
        .filter_map(|r| match r {
            HolidayRule::Weekday { weekday, .. } => Some(*weekday),
            _ => None,
        })
        .collect();
    let open_weekday = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ]
    .iter()
    .any(|w| !closed_weekdays.contains(w));
    if !open_weekday {
        return Err(CalendarError::NoTradingDays);
    }
    Ok(())
}
