//! Business-day clock pinned to UTC-5 regardless of the host timezone.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};

/// Offset of the store's local time from UTC, in seconds (UTC-5, no DST).
pub const STORE_UTC_OFFSET_SECS: i32 = -5 * 3600;

/// Source of "now" for day-boundary decisions.
///
/// `System` reads the wall clock; `Fixed` pins the instant, which the
/// close-check binary and the database scenario tests use.
#[derive(Debug, Clone, Copy)]
pub enum BusinessClock {
    System,
    Fixed(DateTime<Utc>),
}

impl Default for BusinessClock {
    fn default() -> Self {
        BusinessClock::System
    }
}

impl BusinessClock {
    pub fn offset() -> FixedOffset {
        // -18000 is always within FixedOffset's accepted range
        FixedOffset::east_opt(STORE_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
    }

    pub fn now_utc(&self) -> DateTime<Utc> {
        match self {
            BusinessClock::System => Utc::now(),
            BusinessClock::Fixed(instant) => *instant,
        }
    }

    /// Current instant expressed in store time.
    pub fn now_local(&self) -> DateTime<FixedOffset> {
        self.now_utc().with_timezone(&Self::offset())
    }

    /// Calendar date in store time.
    pub fn today(&self) -> NaiveDate {
        self.now_local().date_naive()
    }

    pub fn time_of_day(&self) -> NaiveTime {
        self.now_local().time()
    }

    /// The day preceding `today()`; the one the close gate inspects.
    pub fn yesterday(&self) -> NaiveDate {
        previous_day(self.today())
    }
}

pub fn previous_day(date: NaiveDate) -> NaiveDate {
    date - Duration::days(1)
}

pub fn next_day(date: NaiveDate) -> NaiveDate {
    date + Duration::days(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> BusinessClock {
        BusinessClock::Fixed(Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap())
    }

    #[test]
    fn early_utc_morning_is_previous_store_day() {
        let clock = at(2026, 10, 17, 3, 30);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert_eq!(clock.time_of_day(), NaiveTime::from_hms_opt(22, 30, 0).unwrap());
    }

    #[test]
    fn store_midnight_boundary_is_five_utc() {
        assert_eq!(at(2026, 10, 17, 4, 59).today(), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());
        assert_eq!(at(2026, 10, 17, 5, 0).today(), NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());
    }

    #[test]
    fn yesterday_crosses_month() {
        let clock = at(2026, 11, 1, 15, 0);
        assert_eq!(clock.yesterday(), NaiveDate::from_ymd_opt(2026, 10, 31).unwrap());
    }
}
