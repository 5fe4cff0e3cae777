//! Error types for daygrid operations.
//!
//! Absence is not an error here: unknown ids, unknown days and invalidating an
//! event that was never cached all surface as `None`/no-ops at the call site.

use thiserror::Error;

use crate::cache::LoadTicket;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// A `freq_type` string outside ONE_TIME/DAILY/WEEKLY/MONTHLY/ANNUALLY.
    #[error("Unknown frequency type: {0}")]
    UnknownFreqType(String),

    /// Stored recurrence fields that do not form a valid rule.
    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    /// UI selection state that cannot be encoded into a rule.
    #[error("Invalid recurrence selection: {0}")]
    InvalidSelection(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// Drafts have no identifier and cannot be placed in the cache.
    #[error("Event has no identifier")]
    MissingEventId,

    #[error("Unknown range load: {0}")]
    UnknownLoad(LoadTicket),

    /// Failure reported by a backend collaborator.
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, CalendarError>;
