//! Injectable wall clock.
//!
//! The daily-post gate, "today's posts" and the streak all depend on what
//! day it is. Services never read system time directly; they ask a
//! [`Clock`], which tests replace with a [`ManualClock`].

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveTime, TimeZone, Utc};

/// Source of the current instant, expressed in the offset that defines the
/// local calendar day.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<FixedOffset>;

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }
}

/// Calendar-day key used by the daily ledger, e.g. `2026-10-18`.
pub fn day_key(now: &DateTime<FixedOffset>) -> String {
    now.date_naive().format("%Y-%m-%d").to_string()
}

/// UTC instant of local midnight for the day containing `now`.
pub fn start_of_day(now: &DateTime<FixedOffset>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    let offset = Duration::seconds(i64::from(now.offset().local_minus_utc()));
    Utc.from_utc_datetime(&(midnight - offset))
}

/// Half-open UTC window `[midnight, midnight + 24h)` for the day of `now`.
pub fn day_window(now: &DateTime<FixedOffset>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_of_day(now);
    (start, start + Duration::days(1))
}

// ---------------------------------------------------------------------------
// System clock
// ---------------------------------------------------------------------------

/// Reads the host clock. Without an explicit offset the host's local time
/// zone decides where days begin.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    pub fn local() -> Self {
        Self { offset: None }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset),
            None => Local::now().fixed_offset(),
        }
    }
}

// ---------------------------------------------------------------------------
// Manual clock
// ---------------------------------------------------------------------------

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Start at `y-m-d h:m` in UTC. Panics on an impossible date.
    pub fn at_utc(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let start = Utc
            .with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .expect("valid calendar date");
        Self::new(start.fixed_offset())
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_key_uses_local_date() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        // 23:30 UTC is already the next day two hours east.
        let now = Utc
            .with_ymd_and_hms(2026, 3, 9, 23, 30, 0)
            .unwrap()
            .with_timezone(&offset);
        assert_eq!(day_key(&now), "2026-03-10");
    }

    #[test]
    fn start_of_day_honours_offset() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = offset.with_ymd_and_hms(2026, 3, 9, 14, 0, 0).unwrap();
        let (start, end) = day_window(&now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 9, 5, 0, 0).unwrap());
        assert_eq!(end - start, Duration::days(1));
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::at_utc(2026, 3, 9, 10, 0);
        clock.advance(Duration::hours(4));
        assert_eq!(clock.now_utc(), Utc.with_ymd_and_hms(2026, 3, 9, 14, 0, 0).unwrap());
        assert_eq!(day_key(&clock.now()), "2026-03-09");
    }
}
