//! Tests for period navigation and the Sunday-aligned visible range.

use chrono::{Datelike, NaiveDate, Weekday};
use daygrid::{CalendarError, DateRange, Period, RangeResolver};

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn span(start: NaiveDate, last: NaiveDate) -> DateRange {
    DateRange { start, last }
}

// ---------------------------------------------------------------------------
// Period parsing
// ---------------------------------------------------------------------------

#[test]
fn period_parses_month_and_day_counts() {
    assert_eq!("month".parse::<Period>().unwrap(), Period::Month);
    assert_eq!("7".parse::<Period>().unwrap(), Period::Days(7));
    assert_eq!(" 14 ".parse::<Period>().unwrap(), Period::Days(14));
}

#[test]
fn period_rejects_zero_and_garbage() {
    assert_eq!(
        "0".parse::<Period>().unwrap_err(),
        CalendarError::InvalidPeriod("0".to_string())
    );
    assert!("week".parse::<Period>().is_err());
    assert!("-7".parse::<Period>().is_err());
}

#[test]
fn period_display_matches_parse_input() {
    assert_eq!(Period::Month.to_string(), "month");
    assert_eq!(Period::Days(10).to_string(), "10");
}

// ---------------------------------------------------------------------------
// set_range
// ---------------------------------------------------------------------------

#[test]
fn month_view_of_february_2024() {
    let resolver = RangeResolver::new(Period::Month, ymd(2024, 2, 15));

    assert_eq!(resolver.range(), span(ymd(2024, 2, 1), ymd(2024, 2, 29)));
    assert_eq!(
        resolver.visible_range(),
        span(ymd(2024, 1, 28), ymd(2024, 3, 2))
    );
}

#[test]
fn fourteen_days_snap_to_sunday() {
    // 2024-02-14 is a Wednesday.
    let resolver = RangeResolver::new(Period::Days(14), ymd(2024, 2, 14));

    assert_eq!(resolver.range(), span(ymd(2024, 2, 11), ymd(2024, 2, 24)));
    assert_eq!(resolver.visible_range(), resolver.range());
}

#[test]
fn other_day_counts_start_on_reference() {
    let resolver = RangeResolver::new(Period::Days(10), ymd(2024, 2, 14));

    assert_eq!(resolver.range(), span(ymd(2024, 2, 14), ymd(2024, 2, 23)));
    assert_eq!(
        resolver.visible_range(),
        span(ymd(2024, 2, 11), ymd(2024, 2, 24))
    );
}

#[test]
fn explicit_last_is_used_when_not_before_start() {
    let mut resolver = RangeResolver::new(Period::Month, ymd(2024, 2, 15));
    resolver.set_range(ymd(2024, 2, 15), Some(ymd(2024, 3, 10)));
    assert_eq!(resolver.range(), span(ymd(2024, 2, 1), ymd(2024, 3, 10)));
}

#[test]
fn explicit_last_before_start_is_ignored() {
    let mut resolver = RangeResolver::new(Period::Month, ymd(2024, 2, 15));
    resolver.set_range(ymd(2024, 2, 15), Some(ymd(2024, 1, 1)));
    assert_eq!(resolver.range(), span(ymd(2024, 2, 1), ymd(2024, 2, 29)));
}

#[test]
fn set_period_keeps_range_until_next_set_range() {
    let mut resolver = RangeResolver::new(Period::Month, ymd(2024, 2, 15));
    resolver.set_period("7").unwrap();

    assert_eq!(resolver.period(), Period::Days(7));
    assert_eq!(resolver.range(), span(ymd(2024, 2, 1), ymd(2024, 2, 29)));
}

#[test]
fn set_period_rejects_invalid_input() {
    let mut resolver = RangeResolver::new(Period::Month, ymd(2024, 2, 15));
    assert!(resolver.set_period("fortnight").is_err());
    assert_eq!(resolver.period(), Period::Month);
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[test]
fn next_and_previous_months() {
    let mut resolver = RangeResolver::new(Period::Month, ymd(2024, 2, 15));

    resolver.next();
    assert_eq!(resolver.range(), span(ymd(2024, 3, 1), ymd(2024, 3, 31)));

    resolver.previous();
    resolver.previous();
    assert_eq!(resolver.range(), span(ymd(2024, 1, 1), ymd(2024, 1, 31)));

    resolver.previous();
    assert_eq!(resolver.range(), span(ymd(2023, 12, 1), ymd(2023, 12, 31)));
}

#[test]
fn next_and_previous_weeks() {
    let mut resolver = RangeResolver::new(Period::Days(7), ymd(2024, 2, 14));
    assert_eq!(resolver.range(), span(ymd(2024, 2, 11), ymd(2024, 2, 17)));

    resolver.previous();
    assert_eq!(resolver.range(), span(ymd(2024, 2, 4), ymd(2024, 2, 10)));

    resolver.next();
    resolver.next();
    assert_eq!(resolver.range(), span(ymd(2024, 2, 18), ymd(2024, 2, 24)));
}

#[test]
fn to_today_uses_most_recent_sunday() {
    let mut resolver = RangeResolver::new(Period::Month, ymd(2020, 6, 1));

    // Friday 2024-03-01: the most recent Sunday is 2024-02-25.
    resolver.to_today(ymd(2024, 3, 1));
    assert_eq!(resolver.start(), ymd(2024, 2, 1));

    resolver.to_today(ymd(2024, 3, 5));
    assert_eq!(resolver.start(), ymd(2024, 3, 1));
}

// ---------------------------------------------------------------------------
// Bookmarks
// ---------------------------------------------------------------------------

#[test]
fn href_encodes_period_and_start() {
    let resolver = RangeResolver::new(Period::Month, ymd(2024, 2, 15));
    assert_eq!(resolver.href(), "month/2024-2-1");

    let resolver = RangeResolver::new(Period::Days(14), ymd(2024, 2, 14));
    assert_eq!(resolver.href(), "14/2024-2-11");
}

#[test]
fn set_href_restores_view() {
    let mut resolver = RangeResolver::new(Period::Month, ymd(2024, 2, 15));
    resolver.set_href("14/2024-2-14", ymd(2030, 1, 1)).unwrap();

    assert_eq!(resolver.period(), Period::Days(14));
    assert_eq!(resolver.range(), span(ymd(2024, 2, 11), ymd(2024, 2, 24)));
}

#[test]
fn set_href_round_trips() {
    let original = RangeResolver::new(Period::Days(10), ymd(2024, 7, 3));
    let mut restored = RangeResolver::new(Period::Month, ymd(2000, 1, 1));
    restored.set_href(&original.href(), ymd(2030, 1, 1)).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn set_href_without_date_goes_to_today() {
    let mut resolver = RangeResolver::new(Period::Days(7), ymd(2020, 1, 1));
    resolver.set_href("month", ymd(2024, 3, 5)).unwrap();
    assert_eq!(resolver.range(), span(ymd(2024, 3, 1), ymd(2024, 3, 31)));
}

#[test]
fn malformed_href_leaves_resolver_unchanged() {
    let mut resolver = RangeResolver::new(Period::Month, ymd(2024, 2, 15));
    let before = resolver.clone();

    assert!(matches!(
        resolver.set_href("fortnight/2024-1-1", ymd(2024, 3, 5)),
        Err(CalendarError::InvalidPeriod(_))
    ));
    assert!(matches!(
        resolver.set_href("7/2024-13-1", ymd(2024, 3, 5)),
        Err(CalendarError::InvalidDate(_))
    ));
    assert_eq!(resolver, before);
}

// ---------------------------------------------------------------------------
// Grid helpers
// ---------------------------------------------------------------------------

#[test]
fn filler_days_lie_outside_the_logical_range() {
    let resolver = RangeResolver::new(Period::Month, ymd(2024, 2, 15));
    assert!(resolver.is_filler(ymd(2024, 1, 28)));
    assert!(resolver.is_filler(ymd(2024, 3, 2)));
    assert!(!resolver.is_filler(ymd(2024, 2, 1)));
    assert!(!resolver.is_filler(ymd(2024, 2, 29)));
}

#[test]
fn weeks_cover_visible_range() {
    let resolver = RangeResolver::new(Period::Month, ymd(2024, 2, 15));
    let weeks: Vec<[NaiveDate; 7]> = resolver.weeks().collect();

    assert_eq!(weeks.len(), 5);
    assert_eq!(weeks[0][0], ymd(2024, 1, 28));
    assert_eq!(weeks[4][6], ymd(2024, 3, 2));
    assert!(weeks.iter().all(|week| week[0].weekday() == Weekday::Sun));
}

#[test]
fn heading_names_month_and_year() {
    let resolver = RangeResolver::new(Period::Month, ymd(2024, 2, 15));
    assert_eq!(resolver.heading(), "February 2024");
}

#[test]
fn date_range_helpers() {
    let range = span(ymd(2024, 2, 27), ymd(2024, 3, 2));
    assert_eq!(range.num_days(), 5);
    assert_eq!(range.days().count(), 5);
    assert!(range.contains(ymd(2024, 2, 29)));
    assert!(!range.contains(ymd(2024, 3, 3)));
}
