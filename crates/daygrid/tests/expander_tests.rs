//! Tests for rendering recurrence rules as RRULE text and expanding them.

use chrono::{NaiveDate, Weekday};
use daygrid::expander::{expand, to_rrule};
use daygrid::{DateRange, FreqType, RecurrenceRule, Termination, WeekdaySet};

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn window(start: NaiveDate, last: NaiveDate) -> DateRange {
    DateRange { start, last }
}

fn daily() -> RecurrenceRule {
    RecurrenceRule {
        freq_type: FreqType::Daily,
        ..RecurrenceRule::default()
    }
}

fn weekly(days: &[Weekday]) -> RecurrenceRule {
    RecurrenceRule {
        freq_type: FreqType::Weekly,
        freq_target: Some(days.iter().copied().collect()),
        ..RecurrenceRule::default()
    }
}

fn monthly(target: WeekdaySet, count: i32) -> RecurrenceRule {
    RecurrenceRule {
        freq_type: FreqType::Monthly,
        freq_target: Some(target),
        freq_count: Some(count),
        ..RecurrenceRule::default()
    }
}

// ---------------------------------------------------------------------------
// RRULE rendering
// ---------------------------------------------------------------------------

#[test]
fn one_time_has_no_rrule() {
    assert_eq!(to_rrule(&RecurrenceRule::default()), None);
}

#[test]
fn daily_with_interval() {
    let rule = RecurrenceRule {
        freq_interval: 2,
        ..daily()
    };
    assert_eq!(to_rrule(&rule).unwrap(), "FREQ=DAILY;INTERVAL=2");
}

#[test]
fn weekly_lists_weekdays_monday_first() {
    let rule = RecurrenceRule {
        termination: Termination::Times(10),
        ..weekly(&[Weekday::Fri, Weekday::Mon])
    };
    assert_eq!(
        to_rrule(&rule).unwrap(),
        "FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,FR;COUNT=10"
    );
}

#[test]
fn monthly_ordinal_weekday() {
    let rule = RecurrenceRule {
        termination: Termination::Until(ymd(2024, 12, 31)),
        ..monthly(WeekdaySet::single(Weekday::Tue), -2)
    };
    assert_eq!(
        to_rrule(&rule).unwrap(),
        "FREQ=MONTHLY;INTERVAL=1;BYDAY=-2TU;UNTIL=20241231T235959Z"
    );
}

#[test]
fn monthly_third_weekday_uses_position_three() {
    let rule = monthly(WeekdaySet::single(Weekday::Wed), 4);
    assert_eq!(to_rrule(&rule).unwrap(), "FREQ=MONTHLY;INTERVAL=1;BYDAY=3WE");
}

#[test]
fn monthly_day_of_month() {
    let rule = monthly(WeekdaySet::EMPTY, 15);
    assert_eq!(to_rrule(&rule).unwrap(), "FREQ=MONTHLY;INTERVAL=1;BYMONTHDAY=15");
}

#[test]
fn annual_rule() {
    let rule = RecurrenceRule {
        freq_type: FreqType::Annually,
        freq_target: Some(WeekdaySet::EMPTY),
        ..RecurrenceRule::default()
    };
    assert_eq!(to_rrule(&rule).unwrap(), "FREQ=YEARLY;INTERVAL=1");
}

// ---------------------------------------------------------------------------
// Expansion
// ---------------------------------------------------------------------------

#[test]
fn one_time_expands_to_its_own_date() {
    let rule = RecurrenceRule::default();
    let feb = window(ymd(2024, 2, 1), ymd(2024, 2, 29));

    assert_eq!(expand(&rule, ymd(2024, 2, 10), feb).unwrap(), vec![ymd(2024, 2, 10)]);
    assert!(expand(&rule, ymd(2024, 3, 10), feb).unwrap().is_empty());
}

#[test]
fn daily_crosses_leap_day() {
    let dates = expand(&daily(), ymd(2024, 2, 27), window(ymd(2024, 2, 25), ymd(2024, 3, 2))).unwrap();
    assert_eq!(
        dates,
        vec![
            ymd(2024, 2, 27),
            ymd(2024, 2, 28),
            ymd(2024, 2, 29),
            ymd(2024, 3, 1),
            ymd(2024, 3, 2),
        ]
    );
}

#[test]
fn weekly_monday_and_friday_in_february() {
    // 2024-02-05 is a Monday.
    let rule = weekly(&[Weekday::Mon, Weekday::Fri]);
    let dates = expand(&rule, ymd(2024, 2, 5), window(ymd(2024, 2, 1), ymd(2024, 2, 29))).unwrap();
    assert_eq!(
        dates,
        vec![
            ymd(2024, 2, 5),
            ymd(2024, 2, 9),
            ymd(2024, 2, 12),
            ymd(2024, 2, 16),
            ymd(2024, 2, 19),
            ymd(2024, 2, 23),
            ymd(2024, 2, 26),
        ]
    );
}

#[test]
fn fortnightly_mondays() {
    let rule = RecurrenceRule {
        freq_interval: 2,
        ..weekly(&[Weekday::Mon])
    };
    let dates = expand(&rule, ymd(2024, 2, 5), window(ymd(2024, 2, 1), ymd(2024, 2, 29))).unwrap();
    assert_eq!(dates, vec![ymd(2024, 2, 5), ymd(2024, 2, 19)]);
}

#[test]
fn second_to_last_tuesday_of_march() {
    let rule = monthly(WeekdaySet::single(Weekday::Tue), -2);
    let dates = expand(&rule, ymd(2024, 1, 1), window(ymd(2024, 3, 1), ymd(2024, 3, 31))).unwrap();
    assert_eq!(dates, vec![ymd(2024, 3, 19)]);
}

#[test]
fn day_31_skips_short_months() {
    let rule = monthly(WeekdaySet::EMPTY, 31);
    let dates = expand(&rule, ymd(2024, 1, 31), window(ymd(2024, 1, 1), ymd(2024, 4, 30))).unwrap();
    assert_eq!(dates, vec![ymd(2024, 1, 31), ymd(2024, 3, 31)]);
}

#[test]
fn annual_repeats_on_anchor_day() {
    let rule = RecurrenceRule {
        freq_type: FreqType::Annually,
        freq_target: Some(WeekdaySet::EMPTY),
        ..RecurrenceRule::default()
    };
    let dates = expand(&rule, ymd(2023, 7, 4), window(ymd(2024, 1, 1), ymd(2025, 12, 31))).unwrap();
    assert_eq!(dates, vec![ymd(2024, 7, 4), ymd(2025, 7, 4)]);
}

#[test]
fn occurrence_count_limits_series() {
    let rule = RecurrenceRule {
        termination: Termination::Times(3),
        ..daily()
    };
    let dates = expand(&rule, ymd(2024, 2, 1), window(ymd(2024, 2, 1), ymd(2024, 2, 29))).unwrap();
    assert_eq!(dates, vec![ymd(2024, 2, 1), ymd(2024, 2, 2), ymd(2024, 2, 3)]);
}

#[test]
fn until_date_is_inclusive() {
    let rule = RecurrenceRule {
        termination: Termination::Until(ymd(2024, 2, 3)),
        ..daily()
    };
    let dates = expand(&rule, ymd(2024, 2, 1), window(ymd(2024, 2, 1), ymd(2024, 2, 29))).unwrap();
    assert_eq!(dates, vec![ymd(2024, 2, 1), ymd(2024, 2, 2), ymd(2024, 2, 3)]);
}

#[test]
fn series_ending_before_its_start_has_no_occurrences() {
    let rule = RecurrenceRule {
        termination: Termination::Until(ymd(2024, 1, 1)),
        ..daily()
    };
    let dates = expand(&rule, ymd(2024, 2, 1), window(ymd(2024, 1, 28), ymd(2024, 3, 2))).unwrap();
    assert!(dates.is_empty());
}

#[test]
fn window_before_series_is_empty() {
    let dates = expand(&daily(), ymd(2024, 3, 1), window(ymd(2024, 2, 1), ymd(2024, 2, 29))).unwrap();
    assert!(dates.is_empty());
}

#[test]
fn reversed_window_is_empty() {
    let dates = expand(&daily(), ymd(2024, 2, 1), window(ymd(2024, 2, 10), ymd(2024, 2, 9))).unwrap();
    assert!(dates.is_empty());
}
