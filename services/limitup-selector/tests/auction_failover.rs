//! Integration tests for tiered auction quote resolution.
//!
//! Verifies tier ordering, that a higher tier short-circuits the lower
//! ones, bounded retries on the live tier and the per-(symbol, date)
//! single-flight cache.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, TimeZone};

use limitup_selector::data::auction::{
    AuctionResolver, MinuteBarSource, RetryPolicy, TickSource,
};
use limitup_selector::data::history::{BarSource, HistoryStore};
use limitup_selector::data::{AuctionTier, DailyBar};
use limitup_selector::error::DataError;

// ============================================================================
// Mock Sources
// ============================================================================

struct MockTick {
    calls: AtomicU32,
    fail_first: u32,
    response: Result<(f64, f64), ()>,
}

impl MockTick {
    fn ok(price: f64, volume: f64) -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_first: 0,
            response: Ok((price, volume)),
        }
    }

    fn failing() -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_first: u32::MAX,
            response: Err(()),
        }
    }
}

#[async_trait]
impl TickSource for MockTick {
    async fn auction_tick(&self, _symbol: &str) -> Result<(f64, f64), DataError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            return Err(DataError::Quote("connection reset".into()));
        }
        self.response
            .map_err(|_| DataError::Quote("connection reset".into()))
    }
}

struct MockMinutes {
    calls: AtomicU32,
    bar: Option<(f64, f64)>,
}

#[async_trait]
impl MinuteBarSource for MockMinutes {
    async fn first_session_minute(
        &self,
        _symbol: &str,
        _date: NaiveDate,
    ) -> Result<Option<(f64, f64)>, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bar)
    }
}

struct MockBars {
    calls: AtomicU32,
    bars: Vec<DailyBar>,
}

#[async_trait]
impl BarSource for MockBars {
    async fn daily_bars(&self, _symbol: &str, _limit: usize) -> Result<Vec<DailyBar>, DataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bars.clone())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn day_bar(date: &str, open: f64) -> DailyBar {
    DailyBar {
        date: d(date),
        open,
        high: open + 0.3,
        low: open - 0.3,
        close: open + 0.1,
        volume: 1_000_000.0,
        amount: open * 1_000_000.0,
        pct_change: None,
    }
}

fn during_auction(date: NaiveDate) -> DateTime<Local> {
    Local
        .from_local_datetime(&date.and_hms_opt(9, 27, 0).unwrap())
        .unwrap()
}

fn after_open(date: NaiveDate) -> DateTime<Local> {
    Local
        .from_local_datetime(&date.and_hms_opt(10, 0, 0).unwrap())
        .unwrap()
}

fn retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff: Duration::from_millis(1),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn tier1_success_short_circuits_lower_tiers() {
    let tick = Arc::new(MockTick::ok(10.45, 30_000.0));
    let minutes = Arc::new(MockMinutes {
        calls: AtomicU32::new(0),
        bar: Some((10.40, 300.0)),
    });
    let bars = Arc::new(MockBars {
        calls: AtomicU32::new(0),
        bars: vec![day_bar("2026-01-12", 10.40)],
    });
    let resolver = AuctionResolver::new(
        Some(tick.clone()),
        minutes.clone(),
        Arc::new(HistoryStore::new(bars.clone())),
        retry(),
    );

    let date = d("2026-01-12");
    let quote = resolver
        .resolve_at("600000", date, during_auction(date))
        .await
        .unwrap();

    assert_eq!(quote.tier, AuctionTier::LiveTick);
    assert_eq!(tick.calls.load(Ordering::SeqCst), 1);
    assert_eq!(minutes.calls.load(Ordering::SeqCst), 0);
    assert_eq!(bars.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exhausted_tier1_falls_to_minute_bars() {
    let tick = Arc::new(MockTick::failing());
    let minutes = Arc::new(MockMinutes {
        calls: AtomicU32::new(0),
        bar: Some((10.40, 300.0)),
    });
    let resolver = AuctionResolver::new(
        Some(tick.clone()),
        minutes.clone(),
        Arc::new(HistoryStore::new(Arc::new(MockBars {
            calls: AtomicU32::new(0),
            bars: vec![],
        }))),
        retry(),
    );

    let date = d("2026-01-12");
    let quote = resolver
        .resolve_at("600000", date, during_auction(date))
        .await
        .unwrap();

    // Bounded retries on the live tier, then the minute tier answers
    assert_eq!(tick.calls.load(Ordering::SeqCst), 3);
    assert_eq!(quote.tier, AuctionTier::MinuteBar);
    assert_eq!(quote.price, 10.40);
    assert_eq!(quote.volume, 30_000.0);
}

#[tokio::test]
async fn live_tier_skipped_outside_auction_window() {
    let tick = Arc::new(MockTick::ok(10.45, 30_000.0));
    let minutes = Arc::new(MockMinutes {
        calls: AtomicU32::new(0),
        bar: Some((10.40, 300.0)),
    });
    let resolver = AuctionResolver::new(
        Some(tick.clone()),
        minutes,
        Arc::new(HistoryStore::new(Arc::new(MockBars {
            calls: AtomicU32::new(0),
            bars: vec![],
        }))),
        retry(),
    );

    let date = d("2026-01-12");
    let quote = resolver
        .resolve_at("600000", date, after_open(date))
        .await
        .unwrap();

    assert_eq!(tick.calls.load(Ordering::SeqCst), 0);
    assert_eq!(quote.tier, AuctionTier::MinuteBar);
}

#[tokio::test]
async fn daily_open_is_last_resort_and_never_estimates_volume() {
    let resolver = AuctionResolver::new(
        None,
        Arc::new(MockMinutes {
            calls: AtomicU32::new(0),
            bar: None,
        }),
        Arc::new(HistoryStore::new(Arc::new(MockBars {
            calls: AtomicU32::new(0),
            bars: vec![day_bar("2026-01-09", 10.40)],
        }))),
        retry(),
    );

    let quote = resolver
        .resolve_at("600000", d("2026-01-09"), after_open(d("2026-01-12")))
        .await
        .unwrap();

    assert_eq!(quote.tier, AuctionTier::DailyOpen);
    assert_eq!(quote.price, 10.40);
    assert_eq!(quote.volume, 0.0);
}

#[tokio::test]
async fn absent_quote_when_every_tier_fails() {
    let resolver = AuctionResolver::new(
        None,
        Arc::new(MockMinutes {
            calls: AtomicU32::new(0),
            bar: None,
        }),
        Arc::new(HistoryStore::new(Arc::new(MockBars {
            calls: AtomicU32::new(0),
            bars: vec![],
        }))),
        retry(),
    );

    let quote = resolver
        .resolve_at("600000", d("2026-01-09"), after_open(d("2026-01-12")))
        .await;
    assert!(quote.is_none());
}

#[tokio::test]
async fn concurrent_resolutions_share_one_fetch() {
    let minutes = Arc::new(MockMinutes {
        calls: AtomicU32::new(0),
        bar: Some((10.40, 300.0)),
    });
    let resolver = Arc::new(AuctionResolver::new(
        None,
        minutes.clone(),
        Arc::new(HistoryStore::new(Arc::new(MockBars {
            calls: AtomicU32::new(0),
            bars: vec![],
        }))),
        retry(),
    ));

    let date = d("2026-01-09");
    let now = after_open(d("2026-01-12"));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let resolver = resolver.clone();
        handles.push(tokio::spawn(async move {
            resolver.resolve_at("600000", date, now).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }

    assert_eq!(minutes.calls.load(Ordering::SeqCst), 1);
}
