//! Japanese national public holidays (国民の祝日).
//!
//! Rules follow the Act on National Holidays as amended over time: fixed-date
//! holidays, the Happy Monday system (2000/2003), equinox days computed from
//! the standard approximation, substitute holidays, citizens' holidays, and the
//! one-off imperial and Olympic adjustments.

use chrono::{Datelike, NaiveDate, Weekday};

/// Returns the holiday name if `date` is a public holiday, including
/// substitute holidays and citizens' holidays.
pub fn public_holiday_name(date: NaiveDate) -> Option<&'static str> {
    if let Some(name) = national_holiday_name(date) {
        return Some(name);
    }
    if is_substitute_holiday(date) {
        return Some("振替休日");
    }
    if is_citizens_holiday(date) {
        return Some("国民の休日");
    }
    None
}

/// Holidays named directly by the Act, without substitute or sandwiched days.
fn national_holiday_name(date: NaiveDate) -> Option<&'static str> {
    let year = date.year();
    if year < 1949 {
        return None;
    }
    let day = date.day();

    match date.month() {
        1 => {
            if day == 1 {
                Some("元日")
            } else if (year >= 2000 && is_nth_monday(date, 2)) || (year < 2000 && day == 15) {
                Some("成人の日")
            } else {
                None
            }
        }
        2 => match day {
            11 if year >= 1967 => Some("建国記念の日"),
            23 if year >= 2020 => Some("天皇誕生日"),
            24 if year == 1989 => Some("昭和天皇の大喪の礼"),
            _ => None,
        },
        3 => {
            if spring_equinox_day(year) == Some(day) {
                Some("春分の日")
            } else {
                None
            }
        }
        4 => match day {
            29 if year <= 1988 => Some("天皇誕生日"),
            29 if year <= 2006 => Some("みどりの日"),
            29 => Some("昭和の日"),
            10 if year == 1959 => Some("皇太子明仁親王の結婚の儀"),
            _ => None,
        },
        5 => match day {
            1 if year == 2019 => Some("天皇の即位の日"),
            3 => Some("憲法記念日"),
            4 if year >= 2007 => Some("みどりの日"),
            5 => Some("こどもの日"),
            _ => None,
        },
        6 => {
            if year == 1993 && day == 9 {
                Some("皇太子徳仁親王の結婚の儀")
            } else {
                None
            }
        }
        7 => {
            if is_marine_day(date) {
                Some("海の日")
            } else if (year == 2020 && day == 24) || (year == 2021 && day == 23) {
                Some("スポーツの日")
            } else {
                None
            }
        }
        8 => {
            let mountain_day = match year {
                2020 => 10,
                2021 => 8,
                _ => 11,
            };
            if year >= 2016 && day == mountain_day {
                Some("山の日")
            } else {
                None
            }
        }
        9 => {
            if (year >= 2003 && is_nth_monday(date, 3))
                || ((1966..=2002).contains(&year) && day == 15)
            {
                Some("敬老の日")
            } else if autumn_equinox_day(year) == Some(day) {
                Some("秋分の日")
            } else {
                None
            }
        }
        10 => {
            if (1966..=1999).contains(&year) && day == 10 {
                Some("体育の日")
            } else if (2000..=2019).contains(&year) && is_nth_monday(date, 2) {
                Some("体育の日")
            } else if year >= 2022 && is_nth_monday(date, 2) {
                Some("スポーツの日")
            } else if year == 2019 && day == 22 {
                Some("即位礼正殿の儀")
            } else {
                None
            }
        }
        11 => match day {
            3 => Some("文化の日"),
            23 => Some("勤労感謝の日"),
            12 if year == 1990 => Some("即位礼正殿の儀"),
            _ => None,
        },
        12 => {
            if day == 23 && (1989..=2018).contains(&year) {
                Some("天皇誕生日")
            } else {
                None
            }
        }
        _ => None,
    }
}

fn is_marine_day(date: NaiveDate) -> bool {
    match date.year() {
        1996..=2002 => date.day() == 20,
        2020 => date.day() == 23,
        2021 => date.day() == 22,
        y if y >= 2003 => is_nth_monday(date, 3),
        _ => false,
    }
}

fn is_nth_monday(date: NaiveDate, n: u32) -> bool {
    date.weekday() == Weekday::Mon && (date.day() - 1) / 7 + 1 == n
}

/// A Sunday holiday moves to the next non-holiday day. Before 2007 only the
/// Monday directly after qualified.
fn is_substitute_holiday(date: NaiveDate) -> bool {
    let Some(start) = NaiveDate::from_ymd_opt(1973, 4, 12) else {
        return false;
    };
    if date < start || national_holiday_name(date).is_some() {
        return false;
    }

    let mut prev = date;
    loop {
        prev = match prev.pred_opt() {
            Some(p) => p,
            None => return false,
        };
        if national_holiday_name(prev).is_none() {
            return false;
        }
        if prev.weekday() == Weekday::Sun {
            return true;
        }
        if date.year() < 2007 {
            return false;
        }
    }
}

/// A day sandwiched between two national holidays becomes a holiday (from 1985).
fn is_citizens_holiday(date: NaiveDate) -> bool {
    if date.year() < 1986 || date.weekday() == Weekday::Sun {
        return false;
    }
    if national_holiday_name(date).is_some() {
        return false;
    }
    match (date.pred_opt(), date.succ_opt()) {
        (Some(prev), Some(next)) => {
            national_holiday_name(prev).is_some() && national_holiday_name(next).is_some()
        }
        _ => false,
    }
}

fn spring_equinox_day(year: i32) -> Option<u32> {
    match year {
        1900..=1979 => Some(equinox(20.8357, year, (year - 1983) / 4)),
        1980..=2099 => Some(equinox(20.8431, year, (year - 1980) / 4)),
        2100..=2150 => Some(equinox(21.8510, year, (year - 1980) / 4)),
        _ => None,
    }
}

fn autumn_equinox_day(year: i32) -> Option<u32> {
    match year {
        1900..=1979 => Some(equinox(23.2588, year, (year - 1983) / 4)),
        1980..=2099 => Some(equinox(23.2488, year, (year - 1980) / 4)),
        2100..=2150 => Some(equinox(24.2488, year, (year - 1980) / 4)),
        _ => None,
    }
}

fn equinox(base: f64, year: i32, leap_correction: i32) -> u32 {
    (base + 0.242194 * f64::from(year - 1980) - f64::from(leap_correction)).floor() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_fixed_holidays() {
        assert_eq!(public_holiday_name(d(2021, 1, 1)), Some("元日"));
        assert_eq!(public_holiday_name(d(2021, 2, 11)), Some("建国記念の日"));
        assert_eq!(public_holiday_name(d(2021, 5, 3)), Some("憲法記念日"));
        assert_eq!(public_holiday_name(d(2021, 11, 3)), Some("文化の日"));
        assert_eq!(public_holiday_name(d(2021, 11, 23)), Some("勤労感謝の日"));
    }

    #[test]
    fn test_happy_monday() {
        assert_eq!(public_holiday_name(d(2021, 1, 11)), Some("成人の日"));
        assert_eq!(public_holiday_name(d(2019, 7, 15)), Some("海の日"));
        assert_eq!(public_holiday_name(d(2021, 9, 20)), Some("敬老の日"));
        assert_eq!(public_holiday_name(d(2022, 10, 10)), Some("スポーツの日"));
        assert_eq!(public_holiday_name(d(2018, 10, 8)), Some("体育の日"));
    }

    #[test]
    fn test_equinoxes() {
        assert_eq!(public_holiday_name(d(2020, 3, 20)), Some("春分の日"));
        assert_eq!(public_holiday_name(d(2021, 3, 20)), Some("春分の日"));
        assert_eq!(public_holiday_name(d(2012, 9, 22)), Some("秋分の日"));
        assert_eq!(public_holiday_name(d(2021, 9, 23)), Some("秋分の日"));
    }

    #[test]
    fn test_emperor_birthday_moves() {
        assert_eq!(public_holiday_name(d(2018, 12, 24)), Some("振替休日"));
        assert_eq!(public_holiday_name(d(2019, 12, 23)), None);
        assert_eq!(public_holiday_name(d(2020, 2, 24)), Some("振替休日"));
        assert_eq!(public_holiday_name(d(2021, 2, 23)), Some("天皇誕生日"));
    }

    #[test]
    fn test_olympic_moves() {
        assert_eq!(public_holiday_name(d(2020, 7, 23)), Some("海の日"));
        assert_eq!(public_holiday_name(d(2020, 7, 24)), Some("スポーツの日"));
        assert_eq!(public_holiday_name(d(2020, 8, 10)), Some("山の日"));
        assert_eq!(public_holiday_name(d(2021, 7, 22)), Some("海の日"));
        assert_eq!(public_holiday_name(d(2021, 7, 23)), Some("スポーツの日"));
        assert_eq!(public_holiday_name(d(2021, 8, 9)), Some("振替休日"));
        assert_eq!(public_holiday_name(d(2020, 10, 12)), None);
        assert_eq!(public_holiday_name(d(2021, 10, 11)), None);
    }

    #[test]
    fn test_golden_week_2019() {
        assert_eq!(public_holiday_name(d(2019, 4, 30)), Some("国民の休日"));
        assert_eq!(public_holiday_name(d(2019, 5, 1)), Some("天皇の即位の日"));
        assert_eq!(public_holiday_name(d(2019, 5, 2)), Some("国民の休日"));
        assert_eq!(public_holiday_name(d(2019, 5, 6)), Some("振替休日"));
    }

    #[test]
    fn test_substitute_after_golden_week_run() {
        // 2020-05-03 is a Sunday; the substitute lands after 5/4 and 5/5.
        assert_eq!(public_holiday_name(d(2020, 5, 6)), Some("振替休日"));
    }

    #[test]
    fn test_silver_week_citizens_holiday() {
        assert_eq!(public_holiday_name(d(2015, 9, 22)), Some("国民の休日"));
        assert_eq!(public_holiday_name(d(2026, 9, 22)), Some("国民の休日"));
    }

    #[test]
    fn test_ordinary_day() {
        assert_eq!(public_holiday_name(d(2021, 7, 12)), None);
        assert_eq!(public_holiday_name(d(2020, 10, 1)), None);
    }
}
