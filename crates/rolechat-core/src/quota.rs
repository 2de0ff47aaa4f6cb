//! Daily message quota arithmetic
//!
//! Usage is always derived from persisted messages: the number of messages a
//! user authored in `[start_of_day(now), now)`. Nothing here stores counters.

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};
use serde::Serialize;

/// Midnight of the calendar day containing `at`, in time zone `tz`
///
/// When local midnight does not exist (a DST jump at 00:00), the first valid
/// instant of the day is used instead.
pub fn start_of_day<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let day = at.with_timezone(tz).date_naive();
    let midnight = day.and_time(NaiveTime::MIN);
    (0..=2)
        .find_map(|hours| {
            tz.from_local_datetime(&(midnight + Duration::hours(hours)))
                .earliest()
        })
        .map_or(at, |start| start.with_timezone(&Utc))
}

/// [`start_of_day`] in the server's local time zone
pub fn local_start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    start_of_day(at, &Local)
}

/// A user's standing against their daily limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    /// `None` means unlimited
    pub limit: Option<u32>,
    pub used: u32,
}

impl QuotaStatus {
    pub fn new(limit: Option<u32>, used: u32) -> Self {
        Self { limit, used }
    }

    pub fn unlimited(used: u32) -> Self {
        Self { limit: None, used }
    }

    /// Status reported for users that cannot be resolved: nothing left
    pub fn exhausted() -> Self {
        Self {
            limit: Some(0),
            used: 0,
        }
    }

    /// `None` when unlimited, otherwise `max(0, limit - used)`
    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|limit| limit.saturating_sub(self.used))
    }

    pub fn can_send(&self) -> bool {
        self.limit.map_or(true, |limit| self.used < limit)
    }
}
