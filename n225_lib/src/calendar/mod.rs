//! Trading calendar for the Tokyo Stock Exchange.
//!
//! A date is a trading day when it is a weekday and no holiday rule matches.
//! The rule set is fixed at construction; there is no shared registry.

pub mod japan;
pub mod rules;

use chrono::{Datelike, NaiveDate, Weekday};
use thiserror::Error;

pub use rules::{load_exchange_rules, parse_holiday_rules, HolidayRule};

/// Upper bound on consecutive closed days scanned by [`TradingCalendar::lending_days`].
const LENDING_WINDOW_DAYS: u32 = 30;

/// Error types for calendar construction and calendar-derived counts.
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Failed to parse holiday rule YAML: {0}")]
    YamlParse(#[from] serde_yml::Error),
    #[error("Invalid holiday rule: {0}")]
    InvalidRule(String),
    #[error("Holiday rules leave no trading days")]
    NoTradingDays,
    #[error("No trading day within 30 days after settlement for {0}")]
    LendingWindowExceeded(NaiveDate),
}

/// Immutable trading calendar built from an explicit holiday rule set.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    rules: Vec<HolidayRule>,
}

impl TradingCalendar {
    /// Builds a calendar from `rules`, rejecting sets whose ranges close a whole
    /// month between them or that close every weekday.
    pub fn new(rules: Vec<HolidayRule>) -> Result<Self, CalendarError> {
        rules::validate_rules(&rules)?;
        Ok(Self { rules })
    }

    /// The exchange calendar: public holidays plus the embedded custom closures.
    pub fn jpx() -> Result<Self, CalendarError> {
        Self::new(load_exchange_rules()?)
    }

    pub fn rules(&self) -> &[HolidayRule] {
        &self.rules
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.rules.iter().any(|rule| rule.matches(date))
    }

    /// Name of the first rule matching `date`.
    pub fn holiday_name(&self, date: NaiveDate) -> Option<&str> {
        self.rules.iter().find_map(|rule| rule.holiday_name(date))
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.is_holiday(date)
    }

    /// The date on which the `n`th trading day after `date` is reached.
    ///
    /// Never returns `date` itself; `n == 0` is treated as 1.
    pub fn next_trading_date(&self, date: NaiveDate, n: u32) -> NaiveDate {
        self.walk(date, n, NaiveDate::succ_opt)
    }

    /// The date on which the `n`th trading day before `date` is reached.
    pub fn previous_trading_date(&self, date: NaiveDate, n: u32) -> NaiveDate {
        self.walk(date, n, NaiveDate::pred_opt)
    }

    /// `date` itself when it trades, otherwise the next trading day.
    pub fn snap_forward(&self, date: NaiveDate) -> NaiveDate {
        if self.is_trading_day(date) {
            date
        } else {
            self.next_trading_date(date, 1)
        }
    }

    fn walk(&self, date: NaiveDate, n: u32, step: fn(&NaiveDate) -> Option<NaiveDate>) -> NaiveDate {
        let target = n.max(1);
        let mut current = date;
        let mut count = 0;
        while count < target {
            // Saturate at the edge of the representable range.
            current = match step(&current) {
                Some(next) => next,
                None => return current,
            };
            if self.is_trading_day(current) {
                count += 1;
            }
        }
        current
    }

    /// Stock-lending day count (品貸日数) for a trade on `date`.
    ///
    /// Settlement is the second trading day after `date`; the count is one plus
    /// the number of closed days between settlement and the next trading day.
    pub fn lending_days(&self, date: NaiveDate) -> Result<u32, CalendarError> {
        let settlement = self.next_trading_date(date, 2);
        let mut days = 1;
        let mut return_date = settlement;
        for _ in 0..LENDING_WINDOW_DAYS {
            return_date = return_date
                .succ_opt()
                .ok_or(CalendarError::LendingWindowExceeded(date))?;
            if self.is_trading_day(return_date) {
                return Ok(days);
            }
            days += 1;
        }
        Err(CalendarError::LendingWindowExceeded(date))
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn jpx() -> TradingCalendar {
        TradingCalendar::jpx().unwrap()
    }

    #[test]
    fn test_weekends_are_closed() {
        let cal = jpx();
        let mut date = d(2021, 1, 4);
        while date < d(2021, 12, 31) {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                assert!(!cal.is_trading_day(date), "{} should be closed", date);
            }
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_custom_closures() {
        let cal = jpx();
        assert!(!cal.is_trading_day(d(2020, 10, 1)));
        assert_eq!(cal.holiday_name(d(2020, 10, 1)), Some("障害発生"));
        assert!(!cal.is_trading_day(d(2021, 1, 2)));
        assert!(!cal.is_trading_day(d(2022, 1, 3)));
        assert_eq!(cal.holiday_name(d(2022, 1, 3)), Some("正月三が日"));
        assert!(!cal.is_trading_day(d(2021, 12, 31)));
        assert!(cal.is_trading_day(d(2021, 12, 30)));
        assert!(cal.is_trading_day(d(2020, 10, 2)));
    }

    #[test]
    fn test_public_holiday_closed() {
        let cal = jpx();
        assert!(!cal.is_trading_day(d(2021, 7, 22)));
        assert!(!cal.is_trading_day(d(2021, 7, 23)));
        assert!(cal.is_trading_day(d(2021, 7, 21)));
    }

    #[test]
    fn test_next_trading_date_skips_closures() {
        let cal = jpx();
        // Wed 2020-09-30 -> Thu 10-01 outage -> Fri 10-02
        assert_eq!(cal.next_trading_date(d(2020, 9, 30), 1), d(2020, 10, 2));
        // Thu 2021-12-30 -> 12-31 and 1-1..1-3 closed -> Tue 1-4
        assert_eq!(cal.next_trading_date(d(2021, 12, 30), 1), d(2022, 1, 4));
        assert_eq!(cal.next_trading_date(d(2021, 7, 21), 1), d(2021, 7, 26));
        assert_eq!(cal.next_trading_date(d(2021, 7, 12), 2), d(2021, 7, 14));
    }

    #[test]
    fn test_next_trading_date_zero_treated_as_one() {
        let cal = jpx();
        assert_eq!(cal.next_trading_date(d(2021, 7, 12), 0), d(2021, 7, 13));
    }

    #[test]
    fn test_previous_trading_date() {
        let cal = jpx();
        assert_eq!(cal.previous_trading_date(d(2022, 1, 4), 1), d(2021, 12, 30));
        assert_eq!(cal.previous_trading_date(d(2020, 10, 2), 1), d(2020, 9, 30));
        assert_eq!(cal.previous_trading_date(d(2021, 7, 14), 2), d(2021, 7, 12));
    }

    #[test]
    fn test_next_is_trading_and_strictly_later() {
        let cal = jpx();
        let mut date = d(2019, 12, 1);
        while date < d(2022, 2, 1) {
            let next = cal.next_trading_date(date, 1);
            assert!(next > date);
            assert!(cal.is_trading_day(next));
            assert!(cal.previous_trading_date(next, 1) <= date);
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_snap_forward() {
        let cal = jpx();
        assert_eq!(cal.snap_forward(d(2021, 7, 12)), d(2021, 7, 12));
        assert_eq!(cal.snap_forward(d(2021, 7, 10)), d(2021, 7, 12));
    }

    #[test]
    fn test_lending_days() {
        let cal = jpx();
        // Mon 2021-07-12: settles Wed 7-14, Thu 7-15 trades.
        assert_eq!(cal.lending_days(d(2021, 7, 12)).unwrap(), 1);
        // Wed 2021-07-14: settles Fri 7-16, weekend follows.
        assert_eq!(cal.lending_days(d(2021, 7, 14)).unwrap(), 3);
        // Mon 2021-07-19: settles Wed 7-21, then 7-22 .. 7-25 closed.
        assert_eq!(cal.lending_days(d(2021, 7, 19)).unwrap(), 5);
    }

    #[test]
    fn test_weekday_rule_closes_day() {
        let cal = TradingCalendar::new(vec![HolidayRule::Weekday {
            name: "closed mondays".to_string(),
            weekday: Weekday::Mon,
        }])
        .unwrap();
        assert!(!cal.is_trading_day(d(2021, 7, 12)));
        assert_eq!(cal.next_trading_date(d(2021, 7, 9), 1), d(2021, 7, 13));
    }

    #[test]
    fn test_month_closed_by_split_ranges_rejected() {
        let rules = (1..=12)
            .flat_map(|month| {
                [(1, 15), (16, 31)].map(|(first_day, last_day)| HolidayRule::AnnualRange {
                    name: "half month".to_string(),
                    month,
                    first_day,
                    last_day,
                })
            })
            .collect();
        assert!(matches!(
            TradingCalendar::new(rules).unwrap_err(),
            CalendarError::NoTradingDays
        ));
    }
}
