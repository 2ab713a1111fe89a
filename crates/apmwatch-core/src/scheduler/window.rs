//! Business-hours gate

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};

/// Local hours during which cycles run
///
/// `[start_hour, end_hour)` in `timezone`. `end_hour` may be 24 for end of
/// day, and a window with `start_hour > end_hour` wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitoringWindow {
    start_hour: u32,
    end_hour: u32,
    timezone: Tz,
}

impl MonitoringWindow {
    /// Create a validated window
    pub fn new(start_hour: u32, end_hour: u32, timezone: Tz) -> Result<Self> {
        if start_hour > 23 {
            return Err(Error::config(format!(
                "MONITORING_START_HOUR must be between 0 and 23, got {start_hour}"
            )));
        }
        if end_hour == 0 || end_hour > 24 {
            return Err(Error::config(format!(
                "MONITORING_END_HOUR must be between 1 and 24, got {end_hour}"
            )));
        }
        if start_hour == end_hour {
            return Err(Error::config(
                "MONITORING_START_HOUR and MONITORING_END_HOUR must differ",
            ));
        }

        Ok(Self {
            start_hour,
            end_hour,
            timezone,
        })
    }

    /// First hour inside the window
    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    /// First hour after the window
    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    /// Timezone the hours are expressed in
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// `now` in the window's timezone
    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.timezone)
    }

    /// Shorthand for [`is_within_monitoring_window`]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        is_within_monitoring_window(now, self)
    }
}

/// Whether `now` falls inside `window`
pub fn is_within_monitoring_window(now: DateTime<Utc>, window: &MonitoringWindow) -> bool {
    let hour = window.local_time(now).hour();

    if window.start_hour < window.end_hour {
        hour >= window.start_hour && hour < window.end_hour
    } else {
        hour >= window.start_hour || hour < window.end_hour
    }
}
