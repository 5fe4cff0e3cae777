//! Recurrence rules -- the compact encoding stored on event records, and the
//! codec between that encoding and the recurrence editor's selection state.
//!
//! A rule is stored as a handful of flat fields:
//!
//! | field           | meaning                                                        |
//! |-----------------|----------------------------------------------------------------|
//! | `freq_type`     | ONE_TIME, DAILY, WEEKLY, MONTHLY or ANNUALLY                   |
//! | `freq_interval` | every N days/weeks/months/years                                |
//! | `freq_target`   | weekday bitmask (Monday=bit0 .. Sunday=bit6); see below        |
//! | `freq_count`    | MONTHLY only: day of month, or ordinal selector ±1/±2/±4/±8    |
//! | `until_date`    | last day of the series                                         |
//! | `until_count`   | number of occurrences                                          |
//!
//! WEEKLY targets may carry several weekday bits. MONTHLY targets are either 0
//! ("fixed day of month", `freq_count` is the day) or a single weekday bit
//! (`freq_count` picks the 1st..4th or last..4th-last such weekday). ANNUALLY
//! targets are always 0: the series repeats on the anchor's month and day.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::date;
use crate::error::{CalendarError, Result};

/// Recurrence frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FreqType {
    #[default]
    OneTime,
    Daily,
    Weekly,
    Monthly,
    Annually,
}

impl FreqType {
    pub const ALL: [FreqType; 5] = [
        FreqType::OneTime,
        FreqType::Daily,
        FreqType::Weekly,
        FreqType::Monthly,
        FreqType::Annually,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FreqType::OneTime => "ONE_TIME",
            FreqType::Daily => "DAILY",
            FreqType::Weekly => "WEEKLY",
            FreqType::Monthly => "MONTHLY",
            FreqType::Annually => "ANNUALLY",
        }
    }

    /// Human-readable label, e.g. "One Time".
    pub fn label(self) -> &'static str {
        match self {
            FreqType::OneTime => "One Time",
            FreqType::Daily => "Daily",
            FreqType::Weekly => "Weekly",
            FreqType::Monthly => "Monthly",
            FreqType::Annually => "Annually",
        }
    }
}

impl fmt::Display for FreqType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FreqType {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self> {
        FreqType::ALL
            .into_iter()
            .find(|freq| freq.as_str() == s)
            .ok_or_else(|| CalendarError::UnknownFreqType(s.to_string()))
    }
}

const MONDAY_FIRST: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Set of weekdays packed into the `freq_target` bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);
    const MASK: u8 = 0b0111_1111;

    /// The bit for a weekday: Monday=1, Tuesday=2, ... Saturday=32, Sunday=64.
    pub fn bit(weekday: Weekday) -> u8 {
        1 << weekday.num_days_from_monday()
    }

    pub fn single(weekday: Weekday) -> Self {
        WeekdaySet(Self::bit(weekday))
    }

    /// Rejects bits above Sunday's.
    pub fn from_bits(bits: u8) -> Option<Self> {
        (bits & !Self::MASK == 0).then_some(WeekdaySet(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, weekday: Weekday) -> bool {
        self.0 & Self::bit(weekday) != 0
    }

    pub fn insert(&mut self, weekday: Weekday) {
        self.0 |= Self::bit(weekday);
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Members in Monday-first order.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        MONDAY_FIRST
            .into_iter()
            .filter(move |weekday| self.contains(*weekday))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = WeekdaySet::EMPTY;
        for weekday in iter {
            set.insert(weekday);
        }
        set
    }
}

/// Which matching weekday of the month a MONTHLY rule lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ordinal {
    First,
    Second,
    Third,
    Fourth,
    Last,
    SecondLast,
    ThirdLast,
    FourthLast,
}

impl Ordinal {
    /// The stored `freq_count` value.
    pub fn code(self) -> i32 {
        match self {
            Ordinal::First => 1,
            Ordinal::Second => 2,
            Ordinal::Third => 4,
            Ordinal::Fourth => 8,
            Ordinal::Last => -1,
            Ordinal::SecondLast => -2,
            Ordinal::ThirdLast => -4,
            Ordinal::FourthLast => -8,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Ordinal::First),
            2 => Some(Ordinal::Second),
            4 => Some(Ordinal::Third),
            8 => Some(Ordinal::Fourth),
            -1 => Some(Ordinal::Last),
            -2 => Some(Ordinal::SecondLast),
            -4 => Some(Ordinal::ThirdLast),
            -8 => Some(Ordinal::FourthLast),
            _ => None,
        }
    }

    /// Position counted from the start (1..=4) or the end (-1..=-4) of the month.
    pub fn position(self) -> i32 {
        let code = self.code();
        code.signum() * (code.unsigned_abs().trailing_zeros() as i32 + 1)
    }
}

/// How a series ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum Termination {
    #[default]
    Forever,
    /// Last day on which an occurrence may fall.
    Until(#[serde(with = "crate::date::iso")] NaiveDate),
    /// Total number of occurrences.
    Times(u32),
}

/// A validated recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecurrenceRule {
    pub freq_type: FreqType,
    pub freq_interval: u32,
    pub freq_target: Option<WeekdaySet>,
    pub freq_count: Option<i32>,
    pub termination: Termination,
}

impl Default for RecurrenceRule {
    fn default() -> Self {
        RecurrenceRule {
            freq_type: FreqType::OneTime,
            freq_interval: 1,
            freq_target: None,
            freq_count: None,
            termination: Termination::Forever,
        }
    }
}

/// The flat recurrence fields of a stored event record.
///
/// Values are kept loose here (string frequency, wide integers) so that
/// whatever a backend hands over can be validated by
/// [`RecurrenceRule::from_fields`] instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq_target: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq_count: Option<i64>,
    #[serde(
        default,
        with = "crate::date::iso_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub until_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until_count: Option<u32>,
}

impl RecurrenceRule {
    pub fn is_recurring(&self) -> bool {
        self.freq_type != FreqType::OneTime
    }

    pub fn until_date(&self) -> Option<NaiveDate> {
        match self.termination {
            Termination::Until(date) => Some(date),
            _ => None,
        }
    }

    pub fn until_count(&self) -> Option<u32> {
        match self.termination {
            Termination::Times(count) => Some(count),
            _ => None,
        }
    }

    /// Validate stored record fields into a rule.
    ///
    /// A missing `freq_type` means ONE_TIME. When both `until_date` and
    /// `until_count` are present, `until_date` wins.
    ///
    /// # Errors
    /// Returns `CalendarError::UnknownFreqType` for an unrecognized frequency and
    /// `CalendarError::InvalidRule` for field values that do not fit it.
    pub fn from_fields(fields: &RuleFields) -> Result<Self> {
        let freq_type = match fields.freq_type.as_deref() {
            None => FreqType::OneTime,
            Some(raw) => raw.parse()?,
        };
        if freq_type == FreqType::OneTime {
            return Ok(RecurrenceRule::default());
        }

        let freq_interval = fields.freq_interval.unwrap_or(1);
        if freq_interval == 0 {
            return Err(CalendarError::InvalidRule(
                "freq_interval must be at least 1".to_string(),
            ));
        }

        let target = fields.freq_target.map(target_from_field).transpose()?;
        let (freq_target, freq_count) = match freq_type {
            FreqType::Weekly => match target {
                Some(set) if set.is_empty() => {
                    return Err(CalendarError::InvalidRule(
                        "weekly rule selects no weekdays".to_string(),
                    ));
                }
                other => (other, None),
            },
            FreqType::Monthly => {
                let set = target.unwrap_or(WeekdaySet::EMPTY);
                let count = monthly_count(set, fields.freq_count)?;
                (Some(set), Some(count))
            }
            FreqType::Annually => match target {
                Some(set) if !set.is_empty() => {
                    return Err(CalendarError::InvalidRule(
                        "annual rules do not support a fixed target day".to_string(),
                    ));
                }
                _ => (Some(WeekdaySet::EMPTY), None),
            },
            FreqType::Daily | FreqType::OneTime => (None, None),
        };

        let termination = match (fields.until_date, fields.until_count) {
            (Some(date), _) => Termination::Until(date),
            (None, Some(0)) => {
                return Err(CalendarError::InvalidRule(
                    "until_count must be at least 1".to_string(),
                ));
            }
            (None, Some(count)) => Termination::Times(count),
            (None, None) => Termination::Forever,
        };

        Ok(RecurrenceRule {
            freq_type,
            freq_interval,
            freq_target,
            freq_count,
            termination,
        })
    }

    /// The flat record fields for this rule.
    pub fn to_fields(&self) -> RuleFields {
        RuleFields {
            freq_type: Some(self.freq_type.as_str().to_string()),
            freq_interval: self.is_recurring().then_some(self.freq_interval),
            freq_target: self.freq_target.map(|set| i64::from(set.bits())),
            freq_count: self.freq_count.map(i64::from),
            until_date: self.until_date(),
            until_count: self.until_count(),
        }
    }
}

fn target_from_field(raw: i64) -> Result<WeekdaySet> {
    u8::try_from(raw)
        .ok()
        .and_then(WeekdaySet::from_bits)
        .ok_or_else(|| CalendarError::InvalidRule(format!("freq_target out of range: {}", raw)))
}

fn monthly_count(target: WeekdaySet, raw: Option<i64>) -> Result<i32> {
    let raw = raw.ok_or_else(|| {
        CalendarError::InvalidRule("monthly rule is missing freq_count".to_string())
    })?;
    let count = i32::try_from(raw)
        .map_err(|_| CalendarError::InvalidRule(format!("freq_count out of range: {}", raw)))?;

    match target.len() {
        0 if (1..=31).contains(&count) => Ok(count),
        0 => Err(CalendarError::InvalidRule(format!(
            "day of month out of range: {}",
            count
        ))),
        1 => Ordinal::from_code(count)
            .map(Ordinal::code)
            .ok_or_else(|| CalendarError::InvalidRule(format!("invalid ordinal: {}", count))),
        _ => Err(CalendarError::InvalidRule(
            "monthly rule may target only one weekday".to_string(),
        )),
    }
}

/// Monthly choice in the recurrence editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonthlySelection {
    /// Same day number every month.
    DayOfMonth { day: u32 },
    /// The n-th (or n-th from last) given weekday of the month.
    Weekday { ordinal: Ordinal, weekday: Weekday },
}

/// Full state of the recurrence editor.
///
/// The editor keeps a value for every section even while only one frequency is
/// selected; [`encode`] reads just the sections the chosen frequency uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceSelection {
    pub freq_type: FreqType,
    pub interval: u32,
    pub weekdays: WeekdaySet,
    pub monthly: MonthlySelection,
    pub termination: Termination,
}

impl RecurrenceSelection {
    /// Editor defaults for a new event on `anchor`.
    pub fn for_anchor(anchor: NaiveDate) -> Self {
        decode(&RecurrenceRule::default(), anchor)
    }
}

/// Encode editor state into a rule.
///
/// `reference` is the event's date; a fixed day of month is clamped to the
/// length of its month.
///
/// # Errors
/// Returns `CalendarError::InvalidSelection` for a zero interval, a weekly rule
/// with no weekday checked, a zero occurrence count or an end date before
/// `reference`.
pub fn encode(selection: &RecurrenceSelection, reference: NaiveDate) -> Result<RecurrenceRule> {
    if selection.freq_type == FreqType::OneTime {
        return Ok(RecurrenceRule::default());
    }
    if selection.interval == 0 {
        return Err(CalendarError::InvalidSelection(
            "interval must be at least 1".to_string(),
        ));
    }

    let (freq_target, freq_count) = match selection.freq_type {
        FreqType::Weekly => {
            if selection.weekdays.is_empty() {
                return Err(CalendarError::InvalidSelection(
                    "select at least one weekday".to_string(),
                ));
            }
            (Some(selection.weekdays), None)
        }
        FreqType::Monthly => match selection.monthly {
            MonthlySelection::DayOfMonth { day } => {
                let max = date::days_in_month(reference.year(), reference.month());
                (Some(WeekdaySet::EMPTY), Some(day.clamp(1, max) as i32))
            }
            MonthlySelection::Weekday { ordinal, weekday } => {
                (Some(WeekdaySet::single(weekday)), Some(ordinal.code()))
            }
        },
        FreqType::Annually => (Some(WeekdaySet::EMPTY), None),
        FreqType::Daily | FreqType::OneTime => (None, None),
    };

    match selection.termination {
        Termination::Times(0) => {
            return Err(CalendarError::InvalidSelection(
                "occurrence count must be at least 1".to_string(),
            ));
        }
        Termination::Until(until) if until < reference => {
            return Err(CalendarError::InvalidSelection(format!(
                "end date {} is before the event date {}",
                date::format(until),
                date::format(reference)
            )));
        }
        _ => {}
    }

    Ok(RecurrenceRule {
        freq_type: selection.freq_type,
        freq_interval: selection.interval,
        freq_target,
        freq_count,
        termination: selection.termination,
    })
}

/// Decode a rule into editor state.
///
/// Sections the rule does not use are filled from `anchor`: its weekday for the
/// weekly checkboxes and its day number for the monthly day field. A weekly
/// rule without a stored target also defaults to the anchor's weekday.
pub fn decode(rule: &RecurrenceRule, anchor: NaiveDate) -> RecurrenceSelection {
    let weekdays = match (rule.freq_type, rule.freq_target) {
        (FreqType::Weekly, Some(set)) if !set.is_empty() => set,
        _ => WeekdaySet::single(anchor.weekday()),
    };

    let anchor_day = MonthlySelection::DayOfMonth { day: anchor.day() };
    let monthly = match (rule.freq_type, rule.freq_target, rule.freq_count) {
        (FreqType::Monthly, Some(set), Some(count)) if !set.is_empty() => {
            match (set.iter().next(), Ordinal::from_code(count)) {
                (Some(weekday), Some(ordinal)) => MonthlySelection::Weekday { ordinal, weekday },
                _ => anchor_day,
            }
        }
        (FreqType::Monthly, _, Some(count)) if count > 0 => MonthlySelection::DayOfMonth {
            day: count as u32,
        },
        _ => anchor_day,
    };

    RecurrenceSelection {
        freq_type: rule.freq_type,
        interval: rule.freq_interval.max(1),
        weekdays,
        monthly,
        termination: rule.termination,
    }
}
