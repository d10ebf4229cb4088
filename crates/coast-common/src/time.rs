//! Canonical-timezone day and window arithmetic.
//!
//! All snapshot keys and refresh schedules are anchored to one fixed target
//! timezone, independent of the host clock. The monitored coast runs on
//! Europe/Istanbul time, which has been a fixed +03:00 offset since 2016, so
//! a `FixedOffset` models it exactly.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const SECS_PER_DAY: i64 = 86_400;

/// Computes calendar days and midnight boundaries in one fixed target
/// timezone, expressed back in UTC.
#[derive(Debug, Clone)]
pub struct TimezoneWindow {
    offset: FixedOffset,
    label: String,
}

impl TimezoneWindow {
    pub fn new(offset_hours: i32, label: impl Into<String>) -> Self {
        let offset = FixedOffset::east_opt(offset_hours * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
        Self {
            offset,
            label: label.into(),
        }
    }

    /// The default target timezone for the monitored coastline.
    pub fn istanbul() -> Self {
        Self::new(3, "Europe/Istanbul")
    }

    /// IANA-style label for API responses.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The calendar date in the target timezone at the given UTC instant.
    pub fn local_today(&self, now_utc: DateTime<Utc>) -> NaiveDate {
        now_utc.with_timezone(&self.offset).date_naive()
    }

    /// The next local midnight after `now_utc`, expressed in UTC.
    pub fn next_local_midnight(&self, now_utc: DateTime<Utc>) -> DateTime<Utc> {
        let tomorrow = self.local_today(now_utc) + Duration::days(1);
        let midnight_local = self
            .offset
            .from_local_datetime(&tomorrow.and_time(NaiveTime::MIN))
            .single()
            .expect("fixed offsets have unambiguous local times");
        midnight_local.with_timezone(&Utc)
    }

    /// Snapshot-date / next-refresh info reported alongside cached series.
    pub fn refresh_window(&self, now_utc: DateTime<Utc>) -> RefreshWindow {
        RefreshWindow {
            timezone: self.label.clone(),
            snapshot_date: self.local_today(now_utc),
            next_refresh_at: self.next_local_midnight(now_utc),
        }
    }
}

/// Describes the refresh cadence for API consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshWindow {
    pub timezone: String,
    pub snapshot_date: NaiveDate,
    pub next_refresh_at: DateTime<Utc>,
}

/// Floor `now` to a multiple of `window_days` from the Unix epoch.
///
/// Returns the half-open `[start, end)` interval containing `now`. Boundaries
/// depend only on the epoch and the window length, so they are stable across
/// restarts and identical for any two timestamps in the same bucket.
pub fn aligned_window(now: DateTime<Utc>, window_days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    let window_secs = i64::from(window_days.max(1)) * SECS_PER_DAY;
    let start_secs = now.timestamp().div_euclid(window_secs) * window_secs;
    let start = DateTime::from_timestamp(start_secs, 0).expect("aligned timestamp in range");
    (start, start + Duration::seconds(window_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn local_today_crosses_the_date_line_before_utc() {
        let tz = TimezoneWindow::istanbul();
        // 22:30 UTC is 01:30 the next day in +03:00.
        let now = utc("2024-06-01T22:30:00Z");
        assert_eq!(
            tz.local_today(now),
            NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()
        );
    }

    #[test]
    fn next_local_midnight_is_21_utc() {
        let tz = TimezoneWindow::istanbul();
        let now = utc("2024-06-01T10:00:00Z");
        assert_eq!(tz.next_local_midnight(now), utc("2024-06-01T21:00:00Z"));

        // Just after local midnight the boundary moves a full day out.
        let late = utc("2024-06-01T21:00:01Z");
        assert_eq!(tz.next_local_midnight(late), utc("2024-06-02T21:00:00Z"));
    }

    #[test]
    fn aligned_window_is_deterministic_within_a_bucket() {
        let a = utc("2024-06-01T00:30:00Z");
        let b = utc("2024-06-05T23:59:59Z");
        let (start_a, end_a) = aligned_window(a, 5);
        let (start_b, _) = aligned_window(b, 5);

        // Both fall in the 5-day epoch bucket starting 2024-06-01T00:00Z.
        assert_eq!(start_a, utc("2024-06-01T00:00:00Z"));
        assert_eq!(start_b, start_a);
        assert_eq!(end_a - start_a, Duration::days(5));
        // Boundary start is always a multiple of the window length.
        assert_eq!(start_a.timestamp() % (5 * SECS_PER_DAY), 0);
    }

    #[test]
    fn aligned_window_rotates_past_the_boundary() {
        let (start, end) = aligned_window(utc("2024-06-01T12:00:00Z"), 5);
        let (next_start, _) = aligned_window(end, 5);
        assert_eq!(next_start, end);
        assert!(next_start > start);
    }

    #[test]
    fn refresh_window_reports_the_label() {
        let tz = TimezoneWindow::istanbul();
        let window = tz.refresh_window(utc("2024-06-01T10:00:00Z"));
        assert_eq!(window.timezone, "Europe/Istanbul");
        assert_eq!(window.next_refresh_at, utc("2024-06-01T21:00:00Z"));
    }
}
