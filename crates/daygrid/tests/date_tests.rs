//! Tests for the interchange date format and week arithmetic.

use chrono::NaiveDate;
use daygrid::date;
use daygrid::CalendarError;

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

// ---------------------------------------------------------------------------
// Interchange format
// ---------------------------------------------------------------------------

#[test]
fn format_is_unpadded() {
    assert_eq!(date::format(ymd(2024, 3, 5)), "2024-3-5");
    assert_eq!(date::format(ymd(2024, 12, 31)), "2024-12-31");
}

#[test]
fn parse_accepts_padded_and_unpadded() {
    assert_eq!(date::parse("2024-3-5").unwrap(), ymd(2024, 3, 5));
    assert_eq!(date::parse("2024-03-05").unwrap(), ymd(2024, 3, 5));
}

#[test]
fn parse_discards_time_part() {
    assert_eq!(date::parse("2024-3-5T14:30:00").unwrap(), ymd(2024, 3, 5));
}

#[test]
fn parse_rejects_malformed_input() {
    for input in ["", "2024-2-30", "2024-2", "2024-2-3-4", "yesterday", "2024-13-1"] {
        let err = date::parse(input).unwrap_err();
        assert_eq!(err, CalendarError::InvalidDate(input.to_string()), "input {:?}", input);
    }
}

#[test]
fn format_then_parse_is_identity() {
    let day = ymd(1999, 1, 9);
    assert_eq!(date::parse(&date::format(day)).unwrap(), day);
}

// ---------------------------------------------------------------------------
// Week padding
// ---------------------------------------------------------------------------

#[test]
fn week_padding_around_a_thursday() {
    // 2024-02-15 is a Thursday.
    assert_eq!(date::preceding_sunday(ymd(2024, 2, 15)), ymd(2024, 2, 11));
    assert_eq!(date::following_saturday(ymd(2024, 2, 15)), ymd(2024, 2, 17));
}

#[test]
fn week_padding_is_identity_on_boundaries() {
    assert_eq!(date::preceding_sunday(ymd(2024, 2, 11)), ymd(2024, 2, 11));
    assert_eq!(date::following_saturday(ymd(2024, 2, 17)), ymd(2024, 2, 17));
}

#[test]
fn week_padding_crosses_month_boundaries() {
    assert_eq!(date::preceding_sunday(ymd(2024, 2, 1)), ymd(2024, 1, 28));
    assert_eq!(date::following_saturday(ymd(2024, 2, 29)), ymd(2024, 3, 2));
}

// ---------------------------------------------------------------------------
// Month arithmetic
// ---------------------------------------------------------------------------

#[test]
fn month_lengths() {
    assert_eq!(date::days_in_month(2024, 2), 29);
    assert_eq!(date::days_in_month(2023, 2), 28);
    assert_eq!(date::days_in_month(1900, 2), 28);
    assert_eq!(date::days_in_month(2000, 2), 29);
    assert_eq!(date::days_in_month(2024, 4), 30);
    assert_eq!(date::days_in_month(2024, 12), 31);
}

#[test]
fn first_and_last_of_month() {
    assert_eq!(date::first_of_month(ymd(2024, 2, 15)), ymd(2024, 2, 1));
    assert_eq!(date::last_of_month(ymd(2024, 2, 15)), ymd(2024, 2, 29));
}

#[test]
fn shift_months_lands_on_day_one() {
    assert_eq!(date::shift_months(ymd(2024, 12, 15), 1), ymd(2025, 1, 1));
    assert_eq!(date::shift_months(ymd(2024, 1, 31), -1), ymd(2023, 12, 1));
    assert_eq!(date::shift_months(ymd(2024, 3, 31), -13), ymd(2023, 2, 1));
    assert_eq!(date::shift_months(ymd(2024, 5, 20), 0), ymd(2024, 5, 1));
}

#[test]
fn days_is_inclusive() {
    let days: Vec<NaiveDate> = date::days(ymd(2024, 2, 28), ymd(2024, 3, 1)).collect();
    assert_eq!(days, vec![ymd(2024, 2, 28), ymd(2024, 2, 29), ymd(2024, 3, 1)]);
}

#[test]
fn days_is_empty_for_reversed_bounds() {
    assert_eq!(date::days(ymd(2024, 3, 1), ymd(2024, 2, 28)).count(), 0);
}
