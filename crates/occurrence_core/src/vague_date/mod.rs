//! Vague date parsing.
//!
//! # Responsibility
//! - Turn free-text observation dates into a typed date or date range with
//!   the precision the text implies.
//! - Render the canonical output string for a parsed value.
//!
//! # Invariants
//! - `start <= end` whenever both are set.
//! - `end` is never after the reference "today" passed to the parser.
//! - Coarse precisions always carry concrete month/year boundaries.

use chrono::{Datelike, Local, NaiveDate};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod formats;

use formats::{
    parse_day, parse_month, parse_partial_day, parse_partial_month, parse_year, split, Shape,
};

pub type VagueDateResult<T> = Result<T, VagueDateError>;

/// Precision inferred from the date text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePrecision {
    Day,
    DayRange,
    Month,
    MonthRange,
    Year,
    YearRange,
    /// `- yyyy`: any time up to the end of the year.
    OpenStartYear,
}

impl DatePrecision {
    pub fn is_range(self) -> bool {
        matches!(
            self,
            Self::DayRange | Self::MonthRange | Self::YearRange | Self::OpenStartYear
        )
    }
}

/// Date parse and validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VagueDateError {
    Empty,
    Unrecognised(String),
    InvalidRange(String),
    FutureDate(String),
}

impl Display for VagueDateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("A date is required."),
            Self::Unrecognised(text) => write!(f, "Unrecognised date format: {text}."),
            Self::InvalidRange(text) => {
                write!(f, "Invalid date range: {text} starts after it ends.")
            }
            Self::FutureDate(text) => write!(f, "Future dates are not allowed: {text}."),
        }
    }
}

impl Error for VagueDateError {}

/// A date whose precision may be coarser than a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VagueDate {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    precision: DatePrecision,
}

/// Parsed end (or only) fragment; its kind fixes the overall precision.
enum Fragment {
    Day(NaiveDate),
    Month(i32, u32),
    Year(i32),
}

impl VagueDate {
    /// Parses `text` against the local calendar date.
    pub fn parse(text: &str) -> VagueDateResult<Self> {
        Self::parse_at(text, Local::now().date_naive())
    }

    /// Parses `text`, treating `today` as the latest acceptable date.
    pub fn parse_at(text: &str, today: NaiveDate) -> VagueDateResult<Self> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Err(VagueDateError::Empty);
        }
        let unrecognised = || VagueDateError::Unrecognised(normalized.clone());

        match split(&normalized) {
            Shape::Single(fragment) => {
                let (start, end, precision) =
                    match parse_fragment(fragment, today).ok_or_else(unrecognised)? {
                        Fragment::Day(date) => (date, date, DatePrecision::Day),
                        Fragment::Month(year, month) => (
                            first_of_month(year, month).ok_or_else(unrecognised)?,
                            last_of_month(year, month).ok_or_else(unrecognised)?,
                            DatePrecision::Month,
                        ),
                        Fragment::Year(year) => (
                            first_of_year(year).ok_or_else(unrecognised)?,
                            last_of_year(year).ok_or_else(unrecognised)?,
                            DatePrecision::Year,
                        ),
                    };
                finish(&normalized, Some(start), start, end, precision, today)
            }
            Shape::Range { start, end } => {
                let end_fragment = parse_fragment(end, today).ok_or_else(unrecognised)?;
                let (start, end_start, end, precision) = match end_fragment {
                    Fragment::Day(end) => {
                        let start = parse_partial_day(start, end, today).ok_or_else(unrecognised)?;
                        (start, end, end, DatePrecision::DayRange)
                    }
                    Fragment::Month(year, month) => {
                        let (start_year, start_month) =
                            parse_partial_month(start, year).ok_or_else(unrecognised)?;
                        (
                            first_of_month(start_year, start_month).ok_or_else(unrecognised)?,
                            first_of_month(year, month).ok_or_else(unrecognised)?,
                            last_of_month(year, month).ok_or_else(unrecognised)?,
                            DatePrecision::MonthRange,
                        )
                    }
                    Fragment::Year(year) => {
                        let start_year = parse_year(start).ok_or_else(unrecognised)?;
                        (
                            first_of_year(start_year).ok_or_else(unrecognised)?,
                            first_of_year(year).ok_or_else(unrecognised)?,
                            last_of_year(year).ok_or_else(unrecognised)?,
                            DatePrecision::YearRange,
                        )
                    }
                };
                finish(&normalized, Some(start), end_start, end, precision, today)
            }
            Shape::OpenStart { end } => {
                let year = parse_year(end).ok_or_else(unrecognised)?;
                finish(
                    &normalized,
                    None,
                    first_of_year(year).ok_or_else(unrecognised)?,
                    last_of_year(year).ok_or_else(unrecognised)?,
                    DatePrecision::OpenStartYear,
                    today,
                )
            }
        }
    }

    /// First day covered; `None` for an open start.
    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    /// Last day covered.
    pub fn end(&self) -> Option<NaiveDate> {
        self.end
    }

    pub fn precision(&self) -> DatePrecision {
        self.precision
    }

    pub fn is_range(&self) -> bool {
        self.precision.is_range()
    }
}

/// Validates ordering and clamps a coarse end boundary to `today`.
///
/// `end_start` is the first day of the end fragment as written; a fragment
/// that has not begun by `today` is a future date.
fn finish(
    text: &str,
    start: Option<NaiveDate>,
    end_start: NaiveDate,
    end: NaiveDate,
    precision: DatePrecision,
    today: NaiveDate,
) -> VagueDateResult<VagueDate> {
    if start.is_some_and(|start| start > end) {
        return Err(VagueDateError::InvalidRange(text.to_string()));
    }
    if end_start > today {
        return Err(VagueDateError::FutureDate(text.to_string()));
    }
    Ok(VagueDate {
        start,
        end: Some(end.min(today)),
        precision,
    })
}

fn parse_fragment(text: &str, today: NaiveDate) -> Option<Fragment> {
    if let Some(date) = parse_day(text, today) {
        return Some(Fragment::Day(date));
    }
    if let Some((year, month)) = parse_month(text) {
        return Some(Fragment::Month(year, month));
    }
    parse_year(text).map(Fragment::Year)
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn last_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn first_of_year(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 1, 1)
}

fn last_of_year(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31)
}

fn write_day(f: &mut Formatter<'_>, date: NaiveDate) -> std::fmt::Result {
    write!(f, "{:02}/{:02}/{:04}", date.day(), date.month(), date.year())
}

fn write_month(f: &mut Formatter<'_>, date: NaiveDate) -> std::fmt::Result {
    write!(f, "{:02}/{:04}", date.month(), date.year())
}

impl Display for VagueDate {
    /// `dd/mm/yyyy`, `mm/yyyy` or `yyyy`, joined by ` - ` for ranges.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (Some(end), start) = (self.end, self.start) else {
            return Ok(());
        };
        let start = start.unwrap_or(end);
        match self.precision {
            DatePrecision::Day => write_day(f, start),
            DatePrecision::DayRange => {
                write_day(f, start)?;
                f.write_str(" - ")?;
                write_day(f, end)
            }
            DatePrecision::Month => write_month(f, start),
            DatePrecision::MonthRange => {
                write_month(f, start)?;
                f.write_str(" - ")?;
                write_month(f, end)
            }
            DatePrecision::Year => write!(f, "{:04}", start.year()),
            DatePrecision::YearRange => write!(f, "{:04} - {:04}", start.year(), end.year()),
            DatePrecision::OpenStartYear => write!(f, "- {:04}", end.year()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{last_of_month, DatePrecision, VagueDate, VagueDateError};
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn today() -> NaiveDate {
        date(2026, 10, 14)
    }

    #[test]
    fn month_ends_handle_leap_years() {
        assert_eq!(last_of_month(2024, 2), Some(date(2024, 2, 29)));
        assert_eq!(last_of_month(2023, 2), Some(date(2023, 2, 28)));
        assert_eq!(last_of_month(2023, 12), Some(date(2023, 12, 31)));
    }

    #[test]
    fn current_year_is_clamped_not_rejected() {
        let parsed = VagueDate::parse_at("2026", today()).expect("current year should parse");
        assert_eq!(parsed.start(), Some(date(2026, 1, 1)));
        assert_eq!(parsed.end(), Some(today()));
        assert_eq!(parsed.to_string(), "2026");
    }

    #[test]
    fn whitespace_is_collapsed() {
        let parsed = VagueDate::parse_at("  3   Jan   2020 ", today()).expect("should parse");
        assert_eq!(parsed.precision(), DatePrecision::Day);
        assert_eq!(parsed.to_string(), "03/01/2020");
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(VagueDate::parse_at("   ", today()), Err(VagueDateError::Empty));
    }
}
