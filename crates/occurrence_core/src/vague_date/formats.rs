//! Format gazette for vague date fragments.
//!
//! Each family is tried in order; the first matching pattern that also
//! yields a real calendar date wins.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static ISO_SINGLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{1,2}(?:-\d{1,2})?$").expect("valid iso date regex"));
static ISO_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{1,2}(?:-\d{1,2})?)\s*(?:/|-|(?i:to))\s*(\d{4}-\d{1,2}(?:-\d{1,2})?)$")
        .expect("valid iso range regex")
});
static RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S.*?)\s*-\s*(\S.*)$").expect("valid range regex"));
static OPEN_START_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-\s*(\d{4})$").expect("valid open start regex"));

static DAY_NUMERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[/.](\d{1,2})[/.](\d{4}|\d{2})$").expect("valid numeric day regex")
});
static DAY_ISO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("valid iso day regex"));
static DAY_NAMED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]+)\.?,?\s+(\d{4})$")
        .expect("valid named day regex")
});
static MONTH_NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/.](\d{4})$").expect("valid numeric month regex"));
static MONTH_ISO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").expect("valid iso month regex"));
static MONTH_NAMED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([a-z]+)\.?,?\s+(\d{4})$").expect("valid named month regex")
});
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})$").expect("valid year regex"));

static PARTIAL_DAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})$").expect("valid partial day regex"));
static PARTIAL_DAY_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/.](\d{1,2})$").expect("valid partial day regex"));
static PARTIAL_DAY_NAMED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]+)\.?$").expect("valid partial day regex")
});
static PARTIAL_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})$").expect("valid partial month regex"));
static PARTIAL_MONTH_NAMED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([a-z]+)\.?$").expect("valid partial month regex"));

const MONTH_NAMES: [(&str, u32); 24] = [
    ("jan", 1),
    ("january", 1),
    ("feb", 2),
    ("february", 2),
    ("mar", 3),
    ("march", 3),
    ("apr", 4),
    ("april", 4),
    ("may", 5),
    ("jun", 6),
    ("june", 6),
    ("jul", 7),
    ("july", 7),
    ("aug", 8),
    ("august", 8),
    ("sep", 9),
    ("sept", 9),
    ("september", 9),
    ("oct", 10),
    ("october", 10),
    ("nov", 11),
    ("november", 11),
    ("dec", 12),
    ("december", 12),
];

/// How the whole input is split into fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Shape<'a> {
    Single(&'a str),
    Range { start: &'a str, end: &'a str },
    OpenStart { end: &'a str },
}

/// Matches the input against the range pattern families in order.
pub(crate) fn split(text: &str) -> Shape<'_> {
    if ISO_SINGLE_RE.is_match(text) {
        return Shape::Single(text);
    }
    if let Some(caps) = ISO_RANGE_RE.captures(text) {
        if let (Some(start), Some(end)) = (caps.get(1), caps.get(2)) {
            return Shape::Range {
                start: start.as_str(),
                end: end.as_str(),
            };
        }
    }
    if let Some(caps) = RANGE_RE.captures(text) {
        if let (Some(start), Some(end)) = (caps.get(1), caps.get(2)) {
            return Shape::Range {
                start: start.as_str(),
                end: end.as_str(),
            };
        }
    }
    if let Some(end) = OPEN_START_RE.captures(text).and_then(|caps| caps.get(1)) {
        return Shape::OpenStart { end: end.as_str() };
    }
    Shape::Single(text)
}

pub(crate) fn parse_day(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = DAY_NUMERIC_RE.captures(text) {
        let year = parse_year_digits(&caps[3], today)?;
        return NaiveDate::from_ymd_opt(year, caps[2].parse().ok()?, caps[1].parse().ok()?);
    }
    if let Some(caps) = DAY_ISO_RE.captures(text) {
        return NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
    }
    if let Some(caps) = DAY_NAMED_RE.captures(text) {
        return NaiveDate::from_ymd_opt(
            caps[3].parse().ok()?,
            month_from_name(&caps[2])?,
            caps[1].parse().ok()?,
        );
    }
    None
}

/// Returns `(year, month)`.
pub(crate) fn parse_month(text: &str) -> Option<(i32, u32)> {
    let (year, month) = if let Some(caps) = MONTH_NUMERIC_RE.captures(text) {
        (caps[2].parse().ok()?, caps[1].parse().ok()?)
    } else if let Some(caps) = MONTH_ISO_RE.captures(text) {
        (caps[1].parse().ok()?, caps[2].parse().ok()?)
    } else if let Some(caps) = MONTH_NAMED_RE.captures(text) {
        (caps[2].parse().ok()?, month_from_name(&caps[1])?)
    } else {
        return None;
    };
    (1..=12).contains(&month).then_some((year, month))
}

pub(crate) fn parse_year(text: &str) -> Option<i32> {
    YEAR_RE.captures(text)?[1].parse().ok()
}

/// Start fragment of a day-precision range; missing parts come from `end`.
pub(crate) fn parse_partial_day(
    text: &str,
    end: NaiveDate,
    today: NaiveDate,
) -> Option<NaiveDate> {
    if let Some(date) = parse_day(text, today) {
        return Some(date);
    }
    if let Some(caps) = PARTIAL_DAY_RE.captures(text) {
        return NaiveDate::from_ymd_opt(end.year(), end.month(), caps[1].parse().ok()?);
    }
    if let Some(caps) = PARTIAL_DAY_MONTH_RE.captures(text) {
        return NaiveDate::from_ymd_opt(
            end.year(),
            caps[2].parse().ok()?,
            caps[1].parse().ok()?,
        );
    }
    if let Some(caps) = PARTIAL_DAY_NAMED_RE.captures(text) {
        return NaiveDate::from_ymd_opt(
            end.year(),
            month_from_name(&caps[2])?,
            caps[1].parse().ok()?,
        );
    }
    None
}

/// Start fragment of a month-precision range; the year comes from `end`.
pub(crate) fn parse_partial_month(text: &str, end_year: i32) -> Option<(i32, u32)> {
    if let Some(month) = parse_month(text) {
        return Some(month);
    }
    let month = if let Some(caps) = PARTIAL_MONTH_RE.captures(text) {
        caps[1].parse().ok()?
    } else if let Some(caps) = PARTIAL_MONTH_NAMED_RE.captures(text) {
        month_from_name(&caps[1])?
    } else {
        return None;
    };
    (1..=12).contains(&month).then_some((end_year, month))
}

fn month_from_name(name: &str) -> Option<u32> {
    let lowered = name.to_ascii_lowercase();
    MONTH_NAMES
        .iter()
        .find(|(candidate, _)| *candidate == lowered)
        .map(|(_, month)| *month)
}

/// Two-digit years resolve to the latest year not after `today`.
fn parse_year_digits(digits: &str, today: NaiveDate) -> Option<i32> {
    let value: i32 = digits.parse().ok()?;
    if digits.len() == 4 {
        return Some(value);
    }
    let current = today.year();
    let mut year = current - current.rem_euclid(100) + value;
    if year > current {
        year -= 100;
    }
    Some(year)
}

#[cfg(test)]
mod tests {
    use super::{parse_day, parse_month, parse_year_digits, split, Shape};
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).expect("valid date")
    }

    #[test]
    fn iso_dates_are_not_split_on_hyphens() {
        assert_eq!(split("2024-03-02"), Shape::Single("2024-03-02"));
        assert_eq!(split("2024-03"), Shape::Single("2024-03"));
        assert_eq!(
            split("2024-03-01-2024-03-05"),
            Shape::Range {
                start: "2024-03-01",
                end: "2024-03-05"
            }
        );
        assert_eq!(
            split("2024-01 - 2024-05"),
            Shape::Range {
                start: "2024-01",
                end: "2024-05"
            }
        );
    }

    #[test]
    fn generic_and_open_ranges() {
        assert_eq!(
            split("20-2/3/24"),
            Shape::Range {
                start: "20",
                end: "2/3/24"
            }
        );
        assert_eq!(
            split("1 Jan 2020 - 5 Jan 2020"),
            Shape::Range {
                start: "1 Jan 2020",
                end: "5 Jan 2020"
            }
        );
        assert_eq!(split("- 1990"), Shape::OpenStart { end: "1990" });
        assert_eq!(split("-1990"), Shape::OpenStart { end: "1990" });
    }

    #[test]
    fn two_digit_years_never_land_in_the_future() {
        assert_eq!(parse_year_digits("24", today()), Some(2024));
        assert_eq!(parse_year_digits("26", today()), Some(2026));
        assert_eq!(parse_year_digits("27", today()), Some(1927));
        assert_eq!(parse_year_digits("1975", today()), Some(1975));
    }

    #[test]
    fn day_and_month_forms() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 3).expect("valid date");
        let forms = [
            "3/1/2020",
            "03/01/2020",
            "3.1.2020",
            "2020-01-03",
            "3 Jan 2020",
            "3rd January 2020",
        ];
        for text in forms {
            assert_eq!(parse_day(text, today()), Some(expected), "{text}");
        }
        assert_eq!(parse_day("31/02/2020", today()), None);
        assert_eq!(parse_month("01/2020"), Some((2020, 1)));
        assert_eq!(parse_month("Sept 2020"), Some((2020, 9)));
        assert_eq!(parse_month("2020-13"), None);
    }
}
