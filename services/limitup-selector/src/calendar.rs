//! Trading calendar derived from observed session dates.
//!
//! There is no authoritative holiday feed here. The calendar is the
//! union of every date on which any instrument printed a daily bar,
//! which is exactly the set of sessions the stored history knows
//! about. Weekday arithmetic is a degraded fallback used only when no
//! history exists at all.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct TradingCalendar {
    /// Ascending, deduplicated session dates.
    dates: Vec<NaiveDate>,
}

impl TradingCalendar {
    pub fn from_dates(mut dates: Vec<NaiveDate>) -> Self {
        dates.sort_unstable();
        dates.dedup();
        Self { dates }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    /// Latest session strictly before `date`, if the calendar knows one.
    pub fn previous(&self, date: NaiveDate) -> Option<NaiveDate> {
        let idx = self.dates.partition_point(|d| *d < date);
        idx.checked_sub(1).map(|i| self.dates[i])
    }

    /// Session `n` steps before `date`. `n == 1` is the previous session.
    pub fn previous_n(&self, date: NaiveDate, n: usize) -> Option<NaiveDate> {
        let idx = self.dates.partition_point(|d| *d < date);
        idx.checked_sub(n).map(|i| self.dates[i])
    }

    /// Previous session with a weekday fallback when the calendar is
    /// empty. The fallback cannot see holidays and is logged as
    /// degraded. A populated calendar with no session before `date`
    /// returns `None` instead of guessing.
    pub fn previous_or_weekday(&self, date: NaiveDate) -> Option<NaiveDate> {
        if self.dates.is_empty() {
            warn!(%date, "No session history, falling back to weekday arithmetic");
            return Some(previous_weekday(date));
        }
        self.previous(date)
    }

    /// Up to `count` sessions at or before `end`, ascending. Falls
    /// back to weekdays when the calendar has no sessions at all.
    pub fn recent_sessions(&self, end: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let idx = self.dates.partition_point(|d| *d <= end);
        if idx > 0 {
            let start = idx.saturating_sub(count);
            return self.dates[start..idx].to_vec();
        }
        if !self.dates.is_empty() {
            return Vec::new();
        }

        warn!(%end, "No session history, synthesizing weekday sessions");
        let mut out = Vec::with_capacity(count);
        let mut d = end;
        while matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            d -= Duration::days(1);
        }
        while out.len() < count {
            out.push(d);
            d = previous_weekday(d);
        }
        out.reverse();
        out
    }
}

/// Closest weekday strictly before `date`.
fn previous_weekday(date: NaiveDate) -> NaiveDate {
    let mut d = date - Duration::days(1);
    while matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
        d -= Duration::days(1);
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn calendar() -> TradingCalendar {
        TradingCalendar::from_dates(vec![
            d("2026-01-06"),
            d("2026-01-07"),
            d("2026-01-08"),
            d("2026-01-09"),
            d("2026-01-12"),
        ])
    }

    #[test]
    fn test_previous_skips_weekend_gap() {
        let cal = calendar();
        assert_eq!(cal.previous(d("2026-01-12")), Some(d("2026-01-09")));
        // A non-session date between sessions still resolves
        assert_eq!(cal.previous(d("2026-01-10")), Some(d("2026-01-09")));
        assert_eq!(cal.previous(d("2026-01-06")), None);
    }

    #[test]
    fn test_previous_n() {
        let cal = calendar();
        assert_eq!(cal.previous_n(d("2026-01-12"), 1), Some(d("2026-01-09")));
        assert_eq!(cal.previous_n(d("2026-01-12"), 2), Some(d("2026-01-08")));
        assert_eq!(cal.previous_n(d("2026-01-12"), 5), None);
    }

    #[test]
    fn test_weekday_fallback_only_when_empty() {
        let empty = TradingCalendar::default();
        // Monday falls back to Friday
        assert_eq!(empty.previous_or_weekday(d("2026-01-12")), Some(d("2026-01-09")));
        // A populated calendar takes precedence over weekday math
        assert_eq!(
            calendar().previous_or_weekday(d("2026-01-12")),
            Some(d("2026-01-09"))
        );
        // A populated calendar does not guess before its first session
        assert_eq!(calendar().previous_or_weekday(d("2026-01-06")), None);
    }

    #[test]
    fn test_recent_sessions() {
        let cal = calendar();
        assert_eq!(
            cal.recent_sessions(d("2026-01-12"), 3),
            vec![d("2026-01-08"), d("2026-01-09"), d("2026-01-12")]
        );
        // More than exist: everything
        assert_eq!(cal.recent_sessions(d("2026-01-12"), 10).len(), 5);
        // End before the first session: nothing, no weekday synthesis
        assert!(cal.recent_sessions(d("2026-01-01"), 3).is_empty());

        // Empty calendar synthesizes weekdays, skipping the weekend
        let empty = TradingCalendar::default();
        assert_eq!(
            empty.recent_sessions(d("2026-01-12"), 2),
            vec![d("2026-01-09"), d("2026-01-12")]
        );
    }

    #[test]
    fn test_dedup_and_ordering() {
        let cal = TradingCalendar::from_dates(vec![
            d("2026-01-08"),
            d("2026-01-06"),
            d("2026-01-08"),
        ]);
        assert_eq!(cal.len(), 2);
        assert!(cal.contains(d("2026-01-06")));
    }
}
