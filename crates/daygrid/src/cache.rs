//! Two-level event cache: events by identifier, and identifiers by day.
//!
//! The id store owns every [`CalendarEvent`]; day buckets hold identifiers
//! only. After every operation the following holds:
//!
//! - every identifier in a bucket exists in the id store,
//! - every stored identifier appears in exactly one bucket,
//! - that bucket's date is the date recorded for the identifier.
//!
//! Range requests are all-or-nothing: one missing day sends the whole range to
//! the loader. Outstanding loads are tracked so that overlapping requests never
//! fire two independent loads for the same days.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use tracing::{debug, trace, warn};

use crate::date;
use crate::error::{CalendarError, Result};
use crate::event::{CalendarEvent, DayBucket, DayPatch, EventId};

/// Handle for one outstanding range load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(u64);

impl fmt::Display for LoadTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A range the loader must fetch, then hand back via
/// [`EventCache::complete_load`] with the same ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub start: NaiveDate,
    pub last: NaiveDate,
}

/// Data returned by a loader for one [`LoadRequest`].
///
/// Days in the requested range that the payload does not mention are cached as
/// empty, so the range reads as present afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangePayload {
    pub events: Vec<CalendarEvent>,
    pub days: Vec<(NaiveDate, DayPatch)>,
}

/// Outcome of [`EventCache::get_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFetch {
    /// Every day was cached; the callback already ran.
    Ready,
    /// Nothing covers the range yet; the caller must dispatch this load.
    Load(LoadRequest),
    /// An outstanding load already covers the range; the callback runs when it
    /// completes.
    Coalesced(LoadTicket),
    /// An outstanding load overlaps the range; the request is re-evaluated
    /// after that load finishes.
    Queued(LoadTicket),
}

type Waiter = Box<dyn FnOnce(&EventCache)>;

struct InFlight {
    ticket: LoadTicket,
    start: NaiveDate,
    last: NaiveDate,
    waiters: Vec<Waiter>,
}

struct Parked {
    blocked_on: LoadTicket,
    start: NaiveDate,
    last: NaiveDate,
    on_ready: Waiter,
}

#[derive(Default)]
pub struct EventCache {
    events: HashMap<EventId, CalendarEvent>,
    event_dates: HashMap<EventId, NaiveDate>,
    days: HashMap<NaiveDate, DayBucket>,
    in_flight: Vec<InFlight>,
    parked: Vec<Parked>,
    next_ticket: u64,
}

impl fmt::Debug for EventCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCache")
            .field("events", &self.events.len())
            .field("days", &self.days.len())
            .field("in_flight", &self.in_flight.len())
            .field("parked", &self.parked.len())
            .finish()
    }
}

impl EventCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an event.
    ///
    /// Any earlier placement of the same identifier is removed first, so an
    /// event whose date changed moves to its new bucket and an unchanged event
    /// is never listed twice.
    ///
    /// # Errors
    /// Returns `CalendarError::MissingEventId` for drafts.
    pub fn cache_event(&mut self, event: CalendarEvent) -> Result<EventId> {
        let id = event.id.clone().ok_or(CalendarError::MissingEventId)?;
        self.invalidate_event(&id);

        let day = event.date;
        trace!(id = %id, date = %date::format(day), "caching event");
        self.events.insert(id.clone(), event);
        self.event_dates.insert(id.clone(), day);
        self.days.entry(day).or_default().events.push(id.clone());
        Ok(id)
    }

    /// Merge per-day data into the bucket for `day`, creating it if needed.
    pub fn cache_day_data(&mut self, day: NaiveDate, patch: DayPatch) {
        let bucket = self.days.entry(day).or_default();
        if patch.footnote.is_some() {
            bucket.footnote = patch.footnote;
        }
        bucket.extra.extend(patch.extra);
    }

    /// Remove an event from all indices and return it.
    ///
    /// Unknown identifiers are a no-op.
    pub fn invalidate_event(&mut self, id: &str) -> Option<CalendarEvent> {
        let day = self.event_dates.remove(id)?;
        let event = self.events.remove(id);

        if let Some(bucket) = self.days.get_mut(&day) {
            if let Some(pos) = bucket.events.iter().position(|e| e == id) {
                bucket.events.remove(pos);
            }
        }
        event
    }

    /// Drop every cached event and day.
    ///
    /// Outstanding loads stay registered; their payloads are still applied.
    pub fn invalidate_all(&mut self) {
        debug!(
            events = self.events.len(),
            days = self.days.len(),
            "invalidating event cache"
        );
        self.events.clear();
        self.event_dates.clear();
        self.days.clear();
    }

    pub fn get_event(&self, id: &str) -> Option<&CalendarEvent> {
        self.events.get(id)
    }

    pub fn get_day_data(&self, day: NaiveDate) -> Option<&DayBucket> {
        self.days.get(&day)
    }

    /// Cached events on `day`, in bucket order.
    pub fn events_on(&self, day: NaiveDate) -> impl Iterator<Item = &CalendarEvent> + '_ {
        self.days
            .get(&day)
            .into_iter()
            .flat_map(|bucket| bucket.events.iter())
            .filter_map(move |id| self.events.get(id))
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.days.contains_key(&day)
    }

    /// True when every day in `[start, last]` has a bucket.
    pub fn contains_range(&self, start: NaiveDate, last: NaiveDate) -> bool {
        date::days(start, last).all(|day| self.days.contains_key(&day))
    }

    /// Number of cached events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Outstanding range loads.
    pub fn pending_loads(&self) -> Vec<LoadRequest> {
        self.in_flight
            .iter()
            .map(|load| LoadRequest {
                ticket: load.ticket,
                start: load.start,
                last: load.last,
            })
            .collect()
    }

    /// Check the id/day consistency invariant.
    pub fn is_consistent(&self) -> bool {
        let mut appearances: HashMap<&EventId, usize> = HashMap::new();
        for (day, bucket) in &self.days {
            for id in &bucket.events {
                if !self.events.contains_key(id) || self.event_dates.get(id) != Some(day) {
                    return false;
                }
                *appearances.entry(id).or_default() += 1;
            }
        }

        self.events.len() == self.event_dates.len()
            && self.events.iter().all(|(id, event)| {
                self.event_dates.get(id) == Some(&event.date) && appearances.get(id) == Some(&1)
            })
    }

    /// Make `[start, last]` available, then run `on_ready`.
    ///
    /// On a hit `on_ready` runs before this returns. On a miss the whole range
    /// is requested, even if only one day is absent; see [`RangeFetch`] for how
    /// overlapping outstanding loads are handled.
    pub fn get_range<F>(&mut self, start: NaiveDate, last: NaiveDate, on_ready: F) -> RangeFetch
    where
        F: FnOnce(&EventCache) + 'static,
    {
        self.request(start, last, Box::new(on_ready))
    }

    fn request(&mut self, start: NaiveDate, last: NaiveDate, on_ready: Waiter) -> RangeFetch {
        if self.contains_range(start, last) {
            on_ready(&*self);
            return RangeFetch::Ready;
        }

        if let Some(load) = self
            .in_flight
            .iter_mut()
            .find(|load| load.start <= start && last <= load.last)
        {
            debug!(ticket = %load.ticket, "range already loading; coalescing");
            load.waiters.push(on_ready);
            return RangeFetch::Coalesced(load.ticket);
        }

        if let Some(blocker) = self
            .in_flight
            .iter()
            .find(|load| load.start <= last && start <= load.last)
            .map(|load| load.ticket)
        {
            debug!(ticket = %blocker, "range overlaps an outstanding load; queueing");
            self.parked.push(Parked {
                blocked_on: blocker,
                start,
                last,
                on_ready,
            });
            return RangeFetch::Queued(blocker);
        }

        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        debug!(
            ticket = %ticket,
            start = %date::format(start),
            last = %date::format(last),
            "range not cached; loading"
        );
        self.in_flight.push(InFlight {
            ticket,
            start,
            last,
            waiters: vec![on_ready],
        });
        RangeFetch::Load(LoadRequest {
            ticket,
            start,
            last,
        })
    }

    /// Apply a loader's payload and resume everything waiting on it.
    ///
    /// Returns follow-up loads needed by requests that were queued behind this
    /// one and are still not covered.
    ///
    /// # Errors
    /// Returns `CalendarError::UnknownLoad` if the ticket is not outstanding.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        payload: RangePayload,
    ) -> Result<Vec<LoadRequest>> {
        let load = self.take_in_flight(ticket)?;

        let event_count = payload.events.len();
        for event in payload.events {
            if event.is_draft() {
                warn!(ticket = %ticket, name = %event.name, "loader returned an event without id");
                continue;
            }
            self.cache_event(event)?;
        }
        for (day, patch) in payload.days {
            self.cache_day_data(day, patch);
        }
        for day in date::days(load.start, load.last) {
            self.days.entry(day).or_default();
        }
        debug!(ticket = %ticket, events = event_count, "range load complete");

        for waiter in load.waiters {
            waiter(&*self);
        }
        Ok(self.release_parked(ticket))
    }

    /// Give up on an outstanding load. Its waiters are dropped; requests queued
    /// behind it are re-evaluated and may produce new loads.
    ///
    /// # Errors
    /// Returns `CalendarError::UnknownLoad` if the ticket is not outstanding.
    pub fn abort_load(&mut self, ticket: LoadTicket) -> Result<Vec<LoadRequest>> {
        let load = self.take_in_flight(ticket)?;
        warn!(
            ticket = %ticket,
            dropped_waiters = load.waiters.len(),
            "range load aborted"
        );
        Ok(self.release_parked(ticket))
    }

    fn take_in_flight(&mut self, ticket: LoadTicket) -> Result<InFlight> {
        let pos = self
            .in_flight
            .iter()
            .position(|load| load.ticket == ticket)
            .ok_or(CalendarError::UnknownLoad(ticket))?;
        Ok(self.in_flight.remove(pos))
    }

    fn release_parked(&mut self, ticket: LoadTicket) -> Vec<LoadRequest> {
        let (released, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.parked)
            .into_iter()
            .partition(|parked| parked.blocked_on == ticket);
        self.parked = kept;

        released
            .into_iter()
            .filter_map(
                |parked| match self.request(parked.start, parked.last, parked.on_ready) {
                    RangeFetch::Load(request) => Some(request),
                    _ => None,
                },
            )
            .collect()
    }
}
