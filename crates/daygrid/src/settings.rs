//! Calendar configuration.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};
use crate::range::Period;

/// Initial state of a calendar controller.
///
/// Every field has a default, so a partial TOML file or an empty environment
/// deserializes into a usable month view of the current date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// `"month"` or a day count such as `"7"` or `"14"`.
    pub period: String,
    /// Reference date of the first view. Defaults to today.
    #[serde(with = "crate::date::iso_option", skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    /// Explicit end of the first view; ignored when before the resolved start.
    #[serde(with = "crate::date::iso_option", skip_serializing_if = "Option::is_none")]
    pub last: Option<NaiveDate>,
    /// Bookmark such as `month/2024-2-1`. Takes precedence over `start`/`last`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// IANA timezone that decides what "today" is.
    pub timezone: String,
    /// Default log filter for front ends, e.g. `"info"` or `"daygrid=debug"`.
    pub log_level: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        CalendarSettings {
            period: "month".to_string(),
            start: None,
            last: None,
            href: None,
            timezone: "UTC".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl CalendarSettings {
    /// # Errors
    /// Returns `CalendarError::InvalidPeriod` if `period` is not `"month"` or a
    /// positive day count.
    pub fn period(&self) -> Result<Period> {
        self.period.parse()
    }

    /// # Errors
    /// Returns `CalendarError::InvalidTimezone` if `timezone` is not a known
    /// IANA identifier.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| CalendarError::InvalidTimezone(self.timezone.clone()))
    }
}

/// The current date in `timezone`.
pub fn today_in(timezone: Tz) -> NaiveDate {
    Utc::now().with_timezone(&timezone).date_naive()
}
