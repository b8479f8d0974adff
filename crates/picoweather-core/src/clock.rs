//! Time sources for the control loop.

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use std::time::Instant;

/// Monotonic ticks for the timers plus the local calendar day for the call cap
pub trait Clock {
    fn now(&self) -> Instant;
    fn today(&self) -> NaiveDate;
}

/// Wall clock shifted by a fixed UTC offset.
///
/// The device has no timezone database, so the day boundary is whatever the
/// configured offset says it is.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    /// Build a clock for `hours` east of UTC.
    ///
    /// Offsets chrono cannot represent fall back to UTC with a warning.
    pub fn new(hours: i32) -> Self {
        let offset = hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                tracing::warn!("Unsupported UTC offset {}h, using UTC", hours);
                Self::utc_offset()
            });
        Self { offset }
    }

    pub fn utc() -> Self {
        Self {
            offset: Self::utc_offset(),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    fn utc_offset() -> FixedOffset {
        Utc.fix()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_from_hours() {
        assert_eq!(SystemClock::new(2).offset().local_minus_utc(), 7200);
        assert_eq!(SystemClock::new(-5).offset().local_minus_utc(), -18000);
        assert_eq!(SystemClock::utc().offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_out_of_range_offset_falls_back_to_utc() {
        assert_eq!(SystemClock::new(30).offset().local_minus_utc(), 0);
        assert_eq!(SystemClock::new(i32::MAX).offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_today_follows_offset() {
        let utc_today = Utc::now().date_naive();
        let east = SystemClock::new(14).today();
        let west = SystemClock::new(-12).today();

        // Each side is at most one day away from UTC
        assert!((east - utc_today).num_days().abs() <= 1);
        assert!((west - utc_today).num_days().abs() <= 1);
        assert!(east >= west);
    }

    #[test]
    fn test_now_is_monotonic() {
        let clock = SystemClock::default();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
