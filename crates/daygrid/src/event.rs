//! Calendar events and per-day cache buckets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CalendarError;
use crate::recurrence::{RecurrenceRule, RuleFields};

/// Identifier assigned by the storage backend.
pub type EventId = String;

/// A single calendar entry, possibly the anchor of a recurring series.
///
/// Serializes to the flat record layout exchanged with backends (see
/// [`EventRecord`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EventRecord", into = "EventRecord")]
pub struct CalendarEvent {
    /// `None` for a draft that has not been persisted yet.
    pub id: Option<EventId>,
    pub date: NaiveDate,
    /// Free-form time-of-day label shown before the name, e.g. "14:30".
    pub time: Option<String>,
    pub name: String,
    /// Marks an instance that was edited independently of its series.
    pub is_exception: bool,
    pub rule: RecurrenceRule,
}

impl CalendarEvent {
    /// A one-time draft without an identifier.
    pub fn draft(date: NaiveDate, name: impl Into<String>) -> Self {
        CalendarEvent {
            id: None,
            date,
            time: None,
            name: name.into(),
            is_exception: false,
            rule: RecurrenceRule::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<EventId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_rule(mut self, rule: RecurrenceRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn is_draft(&self) -> bool {
        self.id.is_none()
    }
}

/// Flat wire form of a [`CalendarEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EventId>,
    #[serde(with = "crate::date::iso")]
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_exception: bool,
    #[serde(flatten)]
    pub rule: RuleFields,
}

impl TryFrom<EventRecord> for CalendarEvent {
    type Error = CalendarError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        Ok(CalendarEvent {
            rule: RecurrenceRule::from_fields(&record.rule)?,
            id: record.id,
            date: record.date,
            time: record.time,
            name: record.name,
            is_exception: record.is_exception,
        })
    }
}

impl From<CalendarEvent> for EventRecord {
    fn from(event: CalendarEvent) -> Self {
        EventRecord {
            rule: event.rule.to_fields(),
            id: event.id,
            date: event.date,
            time: event.time,
            name: event.name,
            is_exception: event.is_exception,
        }
    }
}

/// Cache entry for one calendar day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayBucket {
    pub(crate) events: Vec<EventId>,
    pub footnote: Option<String>,
    /// Other per-day data supplied by the backend.
    pub extra: Map<String, Value>,
}

impl DayBucket {
    /// Identifiers of the day's events, in insertion order.
    pub fn events(&self) -> &[EventId] {
        &self.events
    }
}

/// Per-day data merged into a [`DayBucket`] by `EventCache::cache_day_data`.
///
/// Fields left empty keep whatever the bucket already holds. Any JSON keys
/// other than `footnote` are collected into `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footnote: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DayPatch {
    pub fn footnote(text: impl Into<String>) -> Self {
        DayPatch {
            footnote: Some(text.into()),
            extra: Map::new(),
        }
    }
}
