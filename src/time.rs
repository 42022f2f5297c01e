//! Scheduling time axis: whole minutes since the schedule epoch.
//!
//! The scheduling core never reasons about wall-clock dates directly; every
//! interval and duration is a [`qtty::Quantity<Minute>`] on a single axis
//! anchored at [`EPOCH`]. [`Clock`] is the only place calendar dates cross
//! into that axis.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use qtty::{Minute, Quantity};

/// Schedule epoch: `2025-08-22T06:00:00`.
pub fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 8, 22)
        .expect("valid calendar date")
        .and_hms_opt(6, 0, 0)
        .expect("valid time of day")
}

/// Converts between wall-clock [`NaiveDateTime`] values and axis minutes.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    epoch: NaiveDateTime,
}

impl Default for Clock {
    fn default() -> Self {
        Self { epoch: epoch() }
    }
}

impl Clock {
    pub fn new(epoch: NaiveDateTime) -> Self {
        Self { epoch }
    }

    pub fn epoch(&self) -> NaiveDateTime {
        self.epoch
    }

    /// Converts a wall-clock instant to axis minutes since the epoch.
    ///
    /// Sub-minute precision is truncated: the core operates at minute
    /// granularity and never schedules below one minute.
    pub fn to_axis(&self, when: NaiveDateTime) -> Quantity<Minute> {
        let minutes = (when - self.epoch).num_minutes();
        Quantity::new(minutes as f64)
    }

    /// Converts axis minutes back to a wall-clock instant.
    pub fn from_axis(&self, minutes: Quantity<Minute>) -> NaiveDateTime {
        self.epoch + Duration::minutes(minutes.value().round() as i64)
    }
}
