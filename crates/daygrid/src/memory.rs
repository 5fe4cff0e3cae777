//! In-memory [`Backend`] holding series definitions and expanding them on load.
//!
//! Recurring events are stored once and expanded into per-day instances when a
//! range is loaded. Instance identifiers have the form `<series id>@<date>`.
//! Editing or deleting a single instance records an exclusion date on the
//! series; an edited instance is stored as a separate exception event.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::cache::{LoadRequest, RangePayload};
use crate::controller::Backend;
use crate::date;
use crate::error::{CalendarError, Result};
use crate::event::{CalendarEvent, DayPatch, EventId};
use crate::expander;
use crate::range::DateRange;
use crate::recurrence::{RecurrenceRule, Termination};

#[derive(Debug, Clone)]
struct Series {
    event: CalendarEvent,
    excluded: BTreeSet<NaiveDate>,
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    series: Vec<Series>,
    days: Vec<(NaiveDate, DayPatch)>,
    next_id: u64,
    deferred: bool,
    requests: Vec<LoadRequest>,
    pending: Vec<LoadRequest>,
}

/// Identifier of one instance of a recurring series.
pub fn instance_id(series_id: &str, day: NaiveDate) -> EventId {
    format!("{}@{}", series_id, date::format(day))
}

/// Split an identifier into its series id and, for instances, the instance date.
pub fn parse_instance_id(id: &str) -> (&str, Option<NaiveDate>) {
    match id.rsplit_once('@') {
        Some((series_id, raw)) => match date::parse(raw) {
            Ok(day) => (series_id, Some(day)),
            Err(_) => (id, None),
        },
        None => (id, None),
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer loads later through [`take_pending`](Self::take_pending) instead
    /// of immediately.
    pub fn deferred(mut self) -> Self {
        self.deferred = true;
        self
    }

    /// Store an event, assigning an identifier to drafts.
    pub fn insert(&mut self, mut event: CalendarEvent) -> EventId {
        let id = match event.id.clone() {
            Some(id) => id,
            None => self.allocate_id(),
        };
        event.id = Some(id.clone());
        self.series.push(Series {
            event,
            excluded: BTreeSet::new(),
        });
        id
    }

    pub fn set_day(&mut self, day: NaiveDate, patch: DayPatch) {
        self.days.push((day, patch));
    }

    /// Stored event or series definition by identifier.
    pub fn get(&self, id: &str) -> Option<&CalendarEvent> {
        self.find(id).map(|idx| &self.series[idx].event)
    }

    /// Every stored event and series definition, in insertion order.
    pub fn events(&self) -> impl Iterator<Item = &CalendarEvent> {
        self.series.iter().map(|series| &series.event)
    }

    /// Every load request received so far.
    pub fn requests(&self) -> &[LoadRequest] {
        &self.requests
    }

    /// Deferred requests not yet answered.
    pub fn take_pending(&mut self) -> Vec<LoadRequest> {
        std::mem::take(&mut self.pending)
    }

    /// Events and day data for `[start, last]`, with series expanded.
    ///
    /// # Errors
    /// Returns `CalendarError::InvalidRule` if a stored series cannot be
    /// expanded.
    pub fn payload_for(&self, start: NaiveDate, last: NaiveDate) -> Result<RangePayload> {
        let window = DateRange { start, last };
        let mut events = Vec::new();

        for series in &self.series {
            let event = &series.event;
            if !event.rule.is_recurring() {
                if window.contains(event.date) {
                    events.push(event.clone());
                }
                continue;
            }

            let series_id = event.id.as_deref().unwrap_or_default();
            for day in expander::expand(&event.rule, event.date, window)? {
                if series.excluded.contains(&day) {
                    continue;
                }
                events.push(CalendarEvent {
                    id: Some(instance_id(series_id, day)),
                    date: day,
                    ..event.clone()
                });
            }
        }

        let days = self
            .days
            .iter()
            .filter(|(day, _)| window.contains(*day))
            .cloned()
            .collect();
        Ok(RangePayload { events, days })
    }

    fn allocate_id(&mut self) -> EventId {
        loop {
            self.next_id += 1;
            let id = self.next_id.to_string();
            if self.find(&id).is_none() {
                return id;
            }
        }
    }

    fn find(&self, id: &str) -> Option<usize> {
        self.series
            .iter()
            .position(|series| series.event.id.as_deref() == Some(id))
    }

    fn find_required(&self, id: &str) -> Result<usize> {
        self.find(id)
            .ok_or_else(|| CalendarError::Backend(format!("unknown event: {}", id)))
    }

    fn event_id(event: &CalendarEvent) -> Result<&str> {
        event.id.as_deref().ok_or(CalendarError::MissingEventId)
    }
}

impl Backend for MemoryBackend {
    fn load_range(&mut self, request: &LoadRequest) -> Result<Option<RangePayload>> {
        self.requests.push(*request);
        if self.deferred {
            self.pending.push(*request);
            return Ok(None);
        }
        self.payload_for(request.start, request.last).map(Some)
    }

    fn add_event(&mut self, event: &CalendarEvent) -> Result<EventId> {
        let id = self.insert(CalendarEvent {
            id: None,
            ..event.clone()
        });
        debug!(id = %id, "memory backend: event added");
        Ok(id)
    }

    fn save_event(&mut self, event: &CalendarEvent) -> Result<()> {
        let (series_id, instance) = parse_instance_id(Self::event_id(event)?);
        let idx = self.find_required(series_id)?;
        let stored = &mut self.series[idx].event;
        // Editing the series from one of its instances keeps the original anchor.
        let anchor = if instance.is_some() { stored.date } else { event.date };
        *stored = CalendarEvent {
            id: stored.id.clone(),
            date: anchor,
            ..event.clone()
        };
        Ok(())
    }

    fn delete_event(&mut self, event: &CalendarEvent) -> Result<()> {
        let (series_id, _) = parse_instance_id(Self::event_id(event)?);
        let idx = self.find_required(series_id)?;
        self.series.remove(idx);
        Ok(())
    }

    fn split_event(&mut self, split_point: NaiveDate, event: &CalendarEvent) -> Result<()> {
        let (series_id, _) = parse_instance_id(Self::event_id(event)?);
        let idx = self.find_required(series_id)?;
        if split_point <= self.series[idx].event.date {
            return self.save_event(&CalendarEvent {
                id: Some(series_id.to_string()),
                date: split_point,
                ..event.clone()
            });
        }

        self.series[idx].event.rule.termination =
            Termination::Until(split_point - Duration::days(1));
        self.insert(CalendarEvent {
            id: None,
            date: split_point,
            ..event.clone()
        });
        Ok(())
    }

    fn save_single(&mut self, event: &CalendarEvent) -> Result<EventId> {
        let (series_id, instance) = parse_instance_id(Self::event_id(event)?);
        let idx = self.find_required(series_id)?;
        match instance {
            Some(day) => {
                self.series[idx].excluded.insert(day);
                let id = self.insert(CalendarEvent {
                    id: None,
                    is_exception: true,
                    rule: RecurrenceRule::default(),
                    ..event.clone()
                });
                debug!(series = %series_id, id = %id, "memory backend: exception stored");
                Ok(id)
            }
            None => {
                self.series[idx].event = event.clone();
                Ok(series_id.to_string())
            }
        }
    }

    fn delete_single(&mut self, event: &CalendarEvent) -> Result<()> {
        let (series_id, instance) = parse_instance_id(Self::event_id(event)?);
        let idx = self.find_required(series_id)?;
        match instance {
            Some(day) => {
                self.series[idx].excluded.insert(day);
            }
            None => {
                self.series.remove(idx);
            }
        }
        Ok(())
    }
}
