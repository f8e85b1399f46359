//! Wall clock pinned to a fixed UTC offset.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Timelike, Utc};

/// Source of "now" and "today" in the notifier's time zone.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    offset: FixedOffset,
}

impl Clock {
    /// Clock at `hours` east of UTC; out-of-range offsets fall back to UTC.
    pub fn with_offset_hours(hours: i32) -> Self {
        let offset = FixedOffset::east_opt(hours.saturating_mul(3600)).unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    pub fn hour(&self) -> u32 {
        self.now().hour()
    }

    /// Current time as an RFC 3339 string with the local offset.
    pub fn now_iso(&self) -> String {
        self.now().to_rfc3339()
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::with_offset_hours(crate::config::DEFAULT_TZ_OFFSET_HOURS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_applied() {
        let clock = Clock::with_offset_hours(3);
        assert_eq!(clock.offset().local_minus_utc(), 3 * 3600);
        assert!(clock.now_iso().ends_with("+03:00"));
    }

    #[test]
    fn test_invalid_offset_falls_back_to_utc() {
        let clock = Clock::with_offset_hours(99);
        assert_eq!(clock.offset().local_minus_utc(), 0);
    }
}
