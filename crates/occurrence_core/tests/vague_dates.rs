use chrono::NaiveDate;
use occurrence_core::{DatePrecision, VagueDate, VagueDateError};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn today() -> NaiveDate {
    date(2026, 10, 14)
}

fn parse(text: &str) -> VagueDate {
    VagueDate::parse_at(text, today()).unwrap()
}

#[test]
fn single_dates_keep_their_precision() {
    let day = parse("7/6/1975");
    assert_eq!(day.precision(), DatePrecision::Day);
    assert_eq!(day.start(), Some(date(1975, 6, 7)));
    assert_eq!(day.end(), Some(date(1975, 6, 7)));
    assert_eq!(day.to_string(), "07/06/1975");

    let month = parse("Feb 2024");
    assert_eq!(month.precision(), DatePrecision::Month);
    assert_eq!(month.start(), Some(date(2024, 2, 1)));
    assert_eq!(month.end(), Some(date(2024, 2, 29)));
    assert_eq!(month.to_string(), "02/2024");

    let year = parse("1990");
    assert_eq!(year.precision(), DatePrecision::Year);
    assert_eq!(year.end(), Some(date(1990, 12, 31)));
}

#[test]
fn partial_starts_borrow_from_the_end() {
    let days = parse("1-5/3/2020");
    assert_eq!(days.precision(), DatePrecision::DayRange);
    assert_eq!(days.start(), Some(date(2020, 3, 1)));
    assert_eq!(days.end(), Some(date(2020, 3, 5)));
    assert_eq!(days.to_string(), "01/03/2020 - 05/03/2020");

    let months = parse("Jan - Mar 2020");
    assert_eq!(months.precision(), DatePrecision::MonthRange);
    assert_eq!(months.start(), Some(date(2020, 1, 1)));
    assert_eq!(months.end(), Some(date(2020, 3, 31)));

    let years = parse("1990-1995");
    assert_eq!(years.precision(), DatePrecision::YearRange);
    assert_eq!(years.to_string(), "1990 - 1995");
}

#[test]
fn open_start_covers_everything_up_to_the_year_end() {
    let open = parse("- 1990");
    assert_eq!(open.precision(), DatePrecision::OpenStartYear);
    assert_eq!(open.start(), None);
    assert_eq!(open.end(), Some(date(1990, 12, 31)));
    assert_eq!(open.to_string(), "- 1990");
}

#[test]
fn start_after_end_is_an_invalid_range() {
    assert_eq!(
        VagueDate::parse_at("20-2/3/24", today()),
        Err(VagueDateError::InvalidRange("20-2/3/24".to_string()))
    );
    assert!(matches!(
        VagueDate::parse_at("1995-1990", today()),
        Err(VagueDateError::InvalidRange(_))
    ));
}

#[test]
fn future_dates_are_rejected_and_current_periods_clamped() {
    assert!(matches!(
        VagueDate::parse_at("15/10/2026", today()),
        Err(VagueDateError::FutureDate(_))
    ));
    assert!(matches!(
        VagueDate::parse_at("Nov 2026", today()),
        Err(VagueDateError::FutureDate(_))
    ));

    let this_month = parse("Oct 2026");
    assert_eq!(this_month.end(), Some(today()));
    assert_eq!(parse("14/10/2026").end(), Some(today()));
}

#[test]
fn unrecognised_text_reports_the_input() {
    let err = VagueDate::parse_at("sometime in spring", today()).unwrap_err();
    assert_eq!(err, VagueDateError::Unrecognised("sometime in spring".to_string()));
    assert_eq!(
        err.to_string(),
        "Unrecognised date format: sometime in spring."
    );
    assert!(VagueDate::parse_at("31/02/2020", today()).is_err());
}
