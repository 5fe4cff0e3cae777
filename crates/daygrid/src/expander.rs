//! Recurrence expansion -- turns a [`RecurrenceRule`] into concrete dates.
//!
//! Rules are rendered as RFC 5545 RRULE text and expanded with the `rrule`
//! crate. Everything is evaluated at midnight UTC since events are day-granular.

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use rrule::RRuleSet;

use crate::error::{CalendarError, Result};
use crate::range::DateRange;
use crate::recurrence::{FreqType, Ordinal, RecurrenceRule, Termination};

/// Upper bound on instances produced by a single expansion.
pub const MAX_INSTANCES: u16 = 500;

fn byday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Render a rule as an RRULE body, e.g. `FREQ=MONTHLY;INTERVAL=1;BYDAY=-2TU`.
///
/// Returns `None` for ONE_TIME rules, which do not repeat.
pub fn to_rrule(rule: &RecurrenceRule) -> Option<String> {
    let freq = match rule.freq_type {
        FreqType::OneTime => return None,
        FreqType::Daily => "DAILY",
        FreqType::Weekly => "WEEKLY",
        FreqType::Monthly => "MONTHLY",
        FreqType::Annually => "YEARLY",
    };

    let mut parts = vec![
        format!("FREQ={}", freq),
        format!("INTERVAL={}", rule.freq_interval.max(1)),
    ];

    match (rule.freq_type, rule.freq_target, rule.freq_count) {
        (FreqType::Weekly, Some(set), _) if !set.is_empty() => {
            let days: Vec<&str> = set.iter().map(byday_code).collect();
            parts.push(format!("BYDAY={}", days.join(",")));
        }
        (FreqType::Monthly, Some(set), Some(count)) if !set.is_empty() => {
            if let (Some(weekday), Some(ordinal)) = (set.iter().next(), Ordinal::from_code(count)) {
                parts.push(format!("BYDAY={}{}", ordinal.position(), byday_code(weekday)));
            }
        }
        (FreqType::Monthly, _, Some(day)) => {
            parts.push(format!("BYMONTHDAY={}", day));
        }
        _ => {}
    }

    match rule.termination {
        Termination::Forever => {}
        Termination::Until(last) => parts.push(format!("UNTIL={}T235959Z", last.format("%Y%m%d"))),
        Termination::Times(count) => parts.push(format!("COUNT={}", count)),
    }

    Some(parts.join(";"))
}

fn at_utc(day: NaiveDate, time: NaiveTime) -> chrono::DateTime<rrule::Tz> {
    Utc.from_utc_datetime(&day.and_time(time))
        .with_timezone(&rrule::Tz::UTC)
}

/// Expand a rule anchored at `dtstart` into the occurrence dates inside
/// `window`, in ascending order.
///
/// A ONE_TIME rule yields `dtstart` alone when it falls in the window. A rule
/// that ends before `dtstart` has no occurrences.
///
/// # Errors
/// Returns `CalendarError::InvalidRule` if the `rrule` crate rejects the
/// rendered rule.
pub fn expand(rule: &RecurrenceRule, dtstart: NaiveDate, window: DateRange) -> Result<Vec<NaiveDate>> {
    if window.last < window.start {
        return Ok(Vec::new());
    }
    if matches!(rule.termination, Termination::Until(until) if until < dtstart) {
        return Ok(Vec::new());
    }
    let Some(body) = to_rrule(rule) else {
        return Ok(if window.contains(dtstart) {
            vec![dtstart]
        } else {
            Vec::new()
        });
    };

    let rrule_text = format!("DTSTART:{}T000000Z\nRRULE:{}", dtstart.format("%Y%m%d"), body);
    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| CalendarError::InvalidRule(format!("{}", e)))?;

    // Bounds sit one second outside the window; exact days are filtered below.
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    let instances = rrule_set
        .after(at_utc(window.start - Duration::days(1), end_of_day))
        .before(at_utc(window.last + Duration::days(1), NaiveTime::MIN))
        .all(MAX_INSTANCES);

    let mut dates: Vec<NaiveDate> = instances
        .dates
        .into_iter()
        .map(|dt| dt.date_naive())
        .filter(|day| window.contains(*day))
        .collect();
    dates.dedup();
    Ok(dates)
}
