//! Calendar controller -- navigation, cache-backed refresh and persistence.
//!
//! Each controller owns its own [`EventCache`] and [`RangeResolver`]; nothing is
//! shared between calendar instances. Storage and transport are reached only
//! through the [`Backend`] trait.

use chrono::NaiveDate;
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::cache::{EventCache, LoadRequest, LoadTicket, RangeFetch, RangePayload};
use crate::date;
use crate::error::Result;
use crate::event::{CalendarEvent, EventId};
use crate::range::{DateRange, RangeResolver};
use crate::recurrence::RecurrenceRule;
use crate::settings::{today_in, CalendarSettings};

/// Storage collaborator. One method per operation the calendar delegates.
pub trait Backend {
    /// Fetch every event and day record in `[request.start, request.last]`.
    ///
    /// Return `Ok(Some(_))` when the data is available immediately. Return
    /// `Ok(None)` to answer later through
    /// [`CalendarController::complete_load`] with `request.ticket`.
    fn load_range(&mut self, request: &LoadRequest) -> Result<Option<RangePayload>>;

    /// Persist a new event and return its identifier.
    fn add_event(&mut self, event: &CalendarEvent) -> Result<EventId>;

    /// Update a whole series.
    fn save_event(&mut self, event: &CalendarEvent) -> Result<()>;

    /// Delete a whole series.
    fn delete_event(&mut self, event: &CalendarEvent) -> Result<()>;

    /// End the series before `split_point` and continue it from there with
    /// `event`'s fields.
    fn split_event(&mut self, split_point: NaiveDate, event: &CalendarEvent) -> Result<()>;

    /// Update one event, or one instance of a series, and return the id the
    /// edit is stored under.
    ///
    /// An instance edited on its own may be detached from its series and
    /// stored as a one-time exception under a new id.
    fn save_single(&mut self, event: &CalendarEvent) -> Result<EventId>;

    /// Delete one event, or one instance of a series.
    fn delete_single(&mut self, event: &CalendarEvent) -> Result<()>;
}

/// One cell of the rendered grid.
#[derive(Debug, Clone, PartialEq)]
pub struct DayView {
    pub date: NaiveDate,
    /// Padding day outside the requested period.
    pub is_filler: bool,
    pub footnote: Option<String>,
    pub events: Vec<CalendarEvent>,
}

/// Snapshot of the visible grid, handed to the refresh callback.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarView {
    pub heading: String,
    pub range: DateRange,
    pub visible: DateRange,
    pub days: Vec<DayView>,
}

impl CalendarView {
    fn build(cache: &EventCache, heading: String, range: DateRange, visible: DateRange) -> Self {
        let days = visible
            .days()
            .map(|day| DayView {
                date: day,
                is_filler: !range.contains(day),
                footnote: cache
                    .get_day_data(day)
                    .and_then(|bucket| bucket.footnote.clone()),
                events: cache.events_on(day).cloned().collect(),
            })
            .collect();

        CalendarView {
            heading,
            range,
            visible,
            days,
        }
    }

    /// Grid rows, Sunday through Saturday.
    pub fn weeks(&self) -> impl Iterator<Item = &[DayView]> {
        self.days.chunks(7)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayView> {
        self.days.iter().find(|day| day.date == date)
    }
}

pub struct CalendarController<B: Backend> {
    cache: EventCache,
    range: RangeResolver,
    backend: B,
    timezone: Tz,
}

impl<B: Backend> CalendarController<B> {
    /// Build a controller from settings.
    ///
    /// `href` wins over `start`/`last`; with neither, the view opens on the
    /// period around the most recent Sunday.
    ///
    /// # Errors
    /// Returns an error for an invalid period, timezone or href in `settings`.
    pub fn new(settings: &CalendarSettings, backend: B) -> Result<Self> {
        let timezone = settings.timezone()?;
        let today = today_in(timezone);
        let mut range = RangeResolver::new(settings.period()?, date::preceding_sunday(today));

        if let Some(href) = settings.href.as_deref() {
            range.set_href(href, today)?;
        } else if let Some(start) = settings.start {
            range.set_range(start, settings.last);
        }

        debug!(href = %range.href(), timezone = %timezone.name(), "calendar controller created");
        Ok(CalendarController {
            cache: EventCache::new(),
            range,
            backend,
            timezone,
        })
    }

    pub fn cache(&self) -> &EventCache {
        &self.cache
    }

    pub fn range(&self) -> &RangeResolver {
        &self.range
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn today(&self) -> NaiveDate {
        today_in(self.timezone)
    }

    pub fn href(&self) -> String {
        self.range.href()
    }

    /// Switch period, keeping the current start as the reference date.
    ///
    /// # Errors
    /// Returns `CalendarError::InvalidPeriod` for an unparseable period.
    pub fn set_period(&mut self, period: &str) -> Result<DateRange> {
        self.range.set_period(period)?;
        let start = self.range.start();
        self.range.set_range(start, None);
        Ok(self.navigated())
    }

    /// # Errors
    /// Returns an error for a malformed bookmark.
    pub fn set_href(&mut self, href: &str) -> Result<DateRange> {
        let today = self.today();
        self.range.set_href(href, today)?;
        Ok(self.navigated())
    }

    pub fn previous(&mut self) -> DateRange {
        self.range.previous();
        self.navigated()
    }

    pub fn next(&mut self) -> DateRange {
        self.range.next();
        self.navigated()
    }

    pub fn to_today(&mut self) -> DateRange {
        let today = self.today();
        self.range.to_today(today);
        self.navigated()
    }

    fn navigated(&self) -> DateRange {
        debug!(href = %self.range.href(), "navigated");
        self.range.visible_range()
    }

    /// Load the visible grid and pass a snapshot of it to `on_ready`.
    ///
    /// With a synchronous backend `on_ready` has run by the time this returns.
    /// With a deferred backend it runs from [`complete_load`](Self::complete_load).
    ///
    /// # Errors
    /// Returns the backend's error if a load fails; the failed load's callbacks
    /// are dropped.
    pub fn refresh<F>(&mut self, on_ready: F) -> Result<RangeFetch>
    where
        F: FnOnce(CalendarView) + 'static,
    {
        let range = self.range.range();
        let visible = self.range.visible_range();
        let heading = self.range.heading();

        let fetch = self.cache.get_range(visible.start, visible.last, move |cache| {
            on_ready(CalendarView::build(cache, heading, range, visible));
        });
        if let RangeFetch::Load(request) = fetch {
            self.dispatch(vec![request])?;
        }
        Ok(fetch)
    }

    /// Deliver the result of a deferred load.
    ///
    /// # Errors
    /// Returns `CalendarError::UnknownLoad` for a ticket that is not
    /// outstanding, or a backend error from follow-up loads.
    pub fn complete_load(&mut self, ticket: LoadTicket, payload: RangePayload) -> Result<()> {
        let follow_up = self.cache.complete_load(ticket, payload)?;
        self.dispatch(follow_up)
    }

    /// Report that a deferred load failed.
    ///
    /// # Errors
    /// Returns `CalendarError::UnknownLoad` for a ticket that is not
    /// outstanding, or a backend error from follow-up loads.
    pub fn fail_load(&mut self, ticket: LoadTicket) -> Result<()> {
        let follow_up = self.cache.abort_load(ticket)?;
        self.dispatch(follow_up)
    }

    fn dispatch(&mut self, mut requests: Vec<LoadRequest>) -> Result<()> {
        let mut failure = None;
        while let Some(request) = requests.pop() {
            match self.backend.load_range(&request) {
                Ok(Some(payload)) => {
                    requests.extend(self.cache.complete_load(request.ticket, payload)?);
                }
                Ok(None) => {
                    debug!(ticket = %request.ticket, "range load deferred");
                }
                Err(err) => {
                    warn!(ticket = %request.ticket, error = %err, "range load failed");
                    requests.extend(self.cache.abort_load(request.ticket)?);
                    failure.get_or_insert(err);
                }
            }
        }
        failure.map_or(Ok(()), Err)
    }

    /// Save a single event: new drafts are added and existing events updated.
    /// An edited series instance is cached under the id the backend returns.
    ///
    /// # Errors
    /// Propagates backend errors; the cache is untouched in that case.
    pub fn save_single(&mut self, event: CalendarEvent) -> Result<EventId> {
        let (id, stored) = match event.id.clone() {
            None => {
                let id = self.backend.add_event(&event)?;
                let stored = CalendarEvent {
                    id: Some(id.clone()),
                    ..event
                };
                (id, stored)
            }
            Some(previous) => {
                let id = self.backend.save_single(&event)?;
                if id == previous {
                    (id, event)
                } else {
                    // The instance now lives on as a standalone exception.
                    self.cache.invalidate_event(&previous);
                    debug!(instance = %previous, id = %id, "instance detached from series");
                    let stored = CalendarEvent {
                        id: Some(id.clone()),
                        is_exception: true,
                        rule: RecurrenceRule::default(),
                        ..event
                    };
                    (id, stored)
                }
            }
        };
        debug!(id = %id, date = %date::format(stored.date), "event saved");

        if stored.rule.is_recurring() {
            self.cache.invalidate_all();
        } else {
            self.cache.cache_event(stored)?;
        }
        Ok(id)
    }

    /// Move a cached event to another day, as a drop on a grid cell does.
    ///
    /// Returns the id the moved event is stored under, or `None` when the
    /// event is not cached. Moving a series instance detaches it, so the id
    /// can change.
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn move_event(&mut self, id: &str, target: NaiveDate) -> Result<Option<EventId>> {
        let Some(mut event) = self.cache.get_event(id).cloned() else {
            return Ok(None);
        };
        event.date = target;
        let stored = self.save_single(event)?;
        debug!(id = %stored, date = %date::format(target), "event moved");
        Ok(Some(stored))
    }

    /// Delete a single event or series instance. Drafts are simply dropped.
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn delete_single(&mut self, event: &CalendarEvent) -> Result<()> {
        let Some(id) = event.id.as_deref() else {
            return Ok(());
        };
        self.backend.delete_single(event)?;
        debug!(id = %id, "event deleted");
        self.cache.invalidate_event(id);
        Ok(())
    }

    /// Save a whole series. Every cached occurrence may change, so the cache is
    /// dropped afterwards.
    ///
    /// # Errors
    /// Propagates backend errors.
    pub fn save_series(&mut self, event: CalendarEvent) -> Result<EventId> {
        let id = match &event.id {
            Some(id) => {
                self.backend.save_event(&event)?;
                id.clone()
            }
            None => self.backend.add_event(&event)?,
        };
        debug!(id = %id, freq = %event.rule.freq_type, "series saved");
        self.cache.invalidate_all();
        Ok(id)
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn delete_series(&mut self, event: &CalendarEvent) -> Result<()> {
        if event.is_draft() {
            return Ok(());
        }
        self.backend.delete_event(event)?;
        self.cache.invalidate_all();
        Ok(())
    }

    /// # Errors
    /// Propagates backend errors.
    pub fn split_series(&mut self, split_point: NaiveDate, event: &CalendarEvent) -> Result<()> {
        self.backend.split_event(split_point, event)?;
        debug!(split_point = %date::format(split_point), "series split");
        self.cache.invalidate_all();
        Ok(())
    }
}
