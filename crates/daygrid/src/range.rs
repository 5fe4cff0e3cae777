//! Navigation ranges and the week-aligned grid around them.
//!
//! The resolver keeps the logical range (`start`..=`last`) the user asked to
//! see. The visible range is derived from it on every call by padding out to
//! whole Sunday-to-Saturday weeks; days in the padding are grid filler.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};

use crate::date;
use crate::error::{CalendarError, Result};

/// Length of one navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Period {
    /// A calendar month.
    #[default]
    Month,
    /// A fixed number of days (at least 1). Multiples of 7 snap to Sundays.
    Days(u32),
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Month => f.write_str("month"),
            Period::Days(days) => write!(f, "{}", days),
        }
    }
}

impl FromStr for Period {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s == "month" {
            return Ok(Period::Month);
        }
        match s.parse::<u32>() {
            Ok(days) if days > 0 => Ok(Period::Days(days)),
            _ => Err(CalendarError::InvalidPeriod(s.to_string())),
        }
    }
}

/// An inclusive span of days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub last: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.last
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        date::days(self.start, self.last)
    }

    pub fn num_days(&self) -> i64 {
        (self.last - self.start).num_days() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeResolver {
    period: Period,
    start: NaiveDate,
    last: NaiveDate,
}

impl RangeResolver {
    /// A resolver showing the period around `reference`.
    pub fn new(period: Period, reference: NaiveDate) -> Self {
        let mut resolver = RangeResolver {
            period,
            start: reference,
            last: reference,
        };
        resolver.set_range(reference, None);
        resolver
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn last(&self) -> NaiveDate {
        self.last
    }

    /// The logical range used for caching and filler detection.
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start,
            last: self.last,
        }
    }

    /// Store a new period: `"month"` or a positive day count.
    ///
    /// The range itself is not recomputed until the next `set_range`.
    ///
    /// # Errors
    /// Returns `CalendarError::InvalidPeriod` for anything else.
    pub fn set_period(&mut self, period: &str) -> Result<()> {
        self.period = period.parse()?;
        Ok(())
    }

    /// Resolve the logical range around `reference`.
    ///
    /// `start` becomes the first of the month for [`Period::Month`], the Sunday
    /// on or before `reference` for multiples of 7 days, and `reference` itself
    /// otherwise. `explicit_last` is used verbatim when it is not before
    /// `start`; otherwise `last` is the end of the month or `start + days - 1`.
    pub fn set_range(&mut self, reference: NaiveDate, explicit_last: Option<NaiveDate>) {
        self.start = match self.period {
            Period::Month => date::first_of_month(reference),
            Period::Days(days) if days % 7 == 0 => date::preceding_sunday(reference),
            Period::Days(_) => reference,
        };

        self.last = match (explicit_last, self.period) {
            (Some(last), _) if last >= self.start => last,
            (_, Period::Month) => date::last_of_month(self.start),
            (_, Period::Days(days)) => self.start + Duration::days(i64::from(days) - 1),
        };
    }

    /// The logical range padded to whole weeks, Sunday through Saturday.
    pub fn visible_range(&self) -> DateRange {
        DateRange {
            start: date::preceding_sunday(self.start),
            last: date::following_saturday(self.last),
        }
    }

    pub fn previous(&mut self) {
        let reference = match self.period {
            Period::Month => date::shift_months(self.start, -1),
            Period::Days(days) => self.start - Duration::days(i64::from(days)),
        };
        self.set_range(reference, None);
    }

    pub fn next(&mut self) {
        let reference = match self.period {
            Period::Month => date::shift_months(self.start, 1),
            Period::Days(days) => self.start + Duration::days(i64::from(days)),
        };
        self.set_range(reference, None);
    }

    /// Jump to the period containing the most recent Sunday on or before `today`.
    pub fn to_today(&mut self, today: NaiveDate) {
        self.set_range(date::preceding_sunday(today), None);
    }

    /// Bookmark for the current view, e.g. `month/2024-2-1` or `14/2024-3-3`.
    pub fn href(&self) -> String {
        format!("{}/{}", self.period, date::format(self.start))
    }

    /// Restore a view from [`href`](Self::href) output. Without a date part the
    /// view jumps to `today`.
    ///
    /// # Errors
    /// Returns `CalendarError::InvalidPeriod` or `CalendarError::InvalidDate`
    /// for a malformed bookmark; the resolver is left unchanged in that case.
    pub fn set_href(&mut self, href: &str, today: NaiveDate) -> Result<()> {
        let mut parts = href.splitn(2, '/');
        let period: Period = parts.next().unwrap_or_default().parse()?;
        let reference = parts
            .next()
            .filter(|raw| !raw.trim().is_empty())
            .map(date::parse)
            .transpose()?;

        self.period = period;
        match reference {
            Some(reference) => self.set_range(reference, None),
            None => self.to_today(today),
        }
        Ok(())
    }

    /// Grid days outside the logical range.
    pub fn is_filler(&self, day: NaiveDate) -> bool {
        !self.range().contains(day)
    }

    /// Rows of the visible grid, each starting on a Sunday.
    pub fn weeks(&self) -> impl Iterator<Item = [NaiveDate; 7]> {
        let visible = self.visible_range();
        visible
            .days()
            .step_by(7)
            .map(|sunday| std::array::from_fn(|i| sunday + Duration::days(i as i64)))
    }

    /// Month name and year of `start`, e.g. "February 2024".
    pub fn heading(&self) -> String {
        self.start.format("%B %Y").to_string()
    }
}
