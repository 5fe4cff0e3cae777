//! # daygrid
//!
//! Core of a month/week calendar grid: a per-day event cache, range
//! navigation and the recurrence editor's rule codec.
//!
//! The crate is UI-agnostic. A front end drives a [`CalendarController`],
//! renders the [`CalendarView`] snapshots it hands back, and supplies storage
//! through the [`Backend`] trait.
//!
//! ## Modules
//!
//! - [`cache`] -- dual-indexed event cache with coalesced range loads
//! - [`range`] -- period, logical range and the Sunday-aligned visible grid
//! - [`recurrence`] -- recurrence rules and the editor selection codec
//! - [`expander`] -- recurrence rule to concrete dates via `rrule`
//! - [`controller`] -- navigation, refresh and persistence over a [`Backend`]
//! - [`memory`] -- in-memory [`Backend`]
//! - [`event`] -- event records and per-day data
//! - [`date`] -- the `Y-M-D` date format and week arithmetic
//! - [`settings`] -- controller configuration
//! - [`error`] -- error types

pub mod cache;
pub mod controller;
pub mod date;
pub mod error;
pub mod event;
pub mod expander;
pub mod memory;
pub mod range;
pub mod recurrence;
pub mod settings;

pub use cache::{EventCache, LoadRequest, LoadTicket, RangeFetch, RangePayload};
pub use controller::{Backend, CalendarController, CalendarView, DayView};
pub use error::{CalendarError, Result};
pub use event::{CalendarEvent, DayBucket, DayPatch, EventId};
pub use memory::MemoryBackend;
pub use range::{DateRange, Period, RangeResolver};
pub use recurrence::{
    decode, encode, FreqType, MonthlySelection, Ordinal, RecurrenceRule, RecurrenceSelection,
    RuleFields, Termination, WeekdaySet,
};
pub use settings::CalendarSettings;
