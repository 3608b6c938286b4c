//! Tiered call-auction quote resolution.
//!
//! The opening auction price and matched volume come from the best
//! source that can still answer:
//!
//! 1. Live tick snapshot, only while the auction window for the
//!    current session is open (09:25 to 09:30). Transient failures are
//!    retried a bounded number of times.
//! 2. The earliest regular minute bar of the session (at or after
//!    09:30), with volume converted from lots to shares.
//! 3. The daily bar open price. The matched volume is unknown on this
//!    tier and reported as 0, never estimated.
//!
//! When every tier is exhausted the quote is absent and the caller
//! skips whatever depended on it. Results are cached per (symbol,
//! date) with single-flight semantics so concurrent evaluations of the
//! same instrument share one resolution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use super::history::HistoryStore;
use super::local_store::LocalStore;
use super::{AuctionQuote, AuctionTier};
use crate::error::DataError;

/// Real-time quote snapshot during the auction window. Price and
/// matched volume, volume already in shares.
#[async_trait]
pub trait TickSource: Send + Sync {
    async fn auction_tick(&self, symbol: &str) -> Result<(f64, f64), DataError>;
}

/// Earliest regular minute bar of a past session. Price and volume,
/// volume in lots as the feeds report it.
#[async_trait]
pub trait MinuteBarSource: Send + Sync {
    async fn first_session_minute(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<(f64, f64)>, DataError>;
}

#[async_trait]
impl MinuteBarSource for LocalStore {
    async fn first_session_minute(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<(f64, f64)>, DataError> {
        self.first_minute_bar(symbol, date)
            .await
            .map_err(|e| DataError::Storage(e.to_string()))
    }
}

/// Retry policy for the live tick tier.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(1000),
        }
    }
}

const AUCTION_WINDOW_START: NaiveTime = match NaiveTime::from_hms_opt(9, 25, 0) {
    Some(t) => t,
    None => unreachable!(),
};
const AUCTION_WINDOW_END: NaiveTime = match NaiveTime::from_hms_opt(9, 30, 0) {
    Some(t) => t,
    None => unreachable!(),
};

type QuoteCell = Arc<OnceCell<Option<AuctionQuote>>>;

/// Resolves call-auction quotes through the source tiers.
pub struct AuctionResolver {
    tick: Option<Arc<dyn TickSource>>,
    minute: Arc<dyn MinuteBarSource>,
    history: Arc<HistoryStore>,
    retry: RetryPolicy,
    cache: Mutex<HashMap<(String, NaiveDate), QuoteCell>>,
}

impl AuctionResolver {
    pub fn new(
        tick: Option<Arc<dyn TickSource>>,
        minute: Arc<dyn MinuteBarSource>,
        history: Arc<HistoryStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            tick,
            minute,
            history,
            retry,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the auction quote for `symbol` on `date`.
    pub async fn resolve(&self, symbol: &str, date: NaiveDate) -> Option<AuctionQuote> {
        self.resolve_at(symbol, date, Local::now()).await
    }

    /// Resolve with an explicit wall clock. The live tier only applies
    /// when `date` is the current session and `now` falls inside the
    /// auction window.
    pub async fn resolve_at(
        &self,
        symbol: &str,
        date: NaiveDate,
        now: DateTime<Local>,
    ) -> Option<AuctionQuote> {
        let cell = {
            let mut cache = self.cache.lock().await;
            Arc::clone(
                cache
                    .entry((symbol.to_string(), date))
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        *cell
            .get_or_init(|| self.resolve_uncached(symbol, date, now))
            .await
    }

    async fn resolve_uncached(
        &self,
        symbol: &str,
        date: NaiveDate,
        now: DateTime<Local>,
    ) -> Option<AuctionQuote> {
        if self.live_tier_open(date, now) {
            if let Some(quote) = self.try_live_tick(symbol).await {
                return Some(quote);
            }
        }

        if let Some(quote) = self.try_minute_bar(symbol, date).await {
            return Some(quote);
        }

        if let Some(quote) = self.try_daily_open(symbol, date).await {
            return Some(quote);
        }

        warn!(symbol, %date, "All auction quote tiers exhausted");
        None
    }

    fn live_tier_open(&self, date: NaiveDate, now: DateTime<Local>) -> bool {
        self.tick.is_some()
            && date == now.date_naive()
            && now.time() >= AUCTION_WINDOW_START
            && now.time() < AUCTION_WINDOW_END
    }

    async fn try_live_tick(&self, symbol: &str) -> Option<AuctionQuote> {
        let tick = self.tick.as_ref()?;

        for attempt in 1..=self.retry.max_attempts {
            match tick.auction_tick(symbol).await {
                Ok((price, volume)) if price > 0.0 => {
                    debug!(symbol, price, attempt, "Resolved auction quote from live tick");
                    return Some(AuctionQuote {
                        price,
                        volume,
                        tier: AuctionTier::LiveTick,
                    });
                }
                Ok(_) => {
                    warn!(symbol, "Live tick returned a non-positive price");
                    return None;
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    debug!(symbol, attempt, error = %e, "Retrying live tick fetch");
                    tokio::time::sleep(self.retry.backoff).await;
                }
                Err(e) => {
                    warn!(symbol, error = %e, "Live tick tier failed");
                    return None;
                }
            }
        }
        None
    }

    async fn try_minute_bar(&self, symbol: &str, date: NaiveDate) -> Option<AuctionQuote> {
        match self.minute.first_session_minute(symbol, date).await {
            Ok(Some((price, lots))) if price > 0.0 => {
                debug!(symbol, %date, price, "Resolved auction quote from minute bar");
                Some(AuctionQuote {
                    price,
                    // Minute feeds report lots
                    volume: lots * 100.0,
                    tier: AuctionTier::MinuteBar,
                })
            }
            Ok(_) => None,
            Err(e) => {
                warn!(symbol, %date, error = %e, "Minute bar tier failed");
                None
            }
        }
    }

    async fn try_daily_open(&self, symbol: &str, date: NaiveDate) -> Option<AuctionQuote> {
        match self.history.series(symbol).await {
            Ok(series) => series.bar_on(date).filter(|b| b.open > 0.0).map(|b| {
                debug!(symbol, %date, price = b.open, "Resolved auction quote from daily open");
                AuctionQuote {
                    price: b.open,
                    // Matched auction volume is unknowable from a daily bar
                    volume: 0.0,
                    tier: AuctionTier::DailyOpen,
                }
            }),
            Err(e) => {
                warn!(symbol, %date, error = %e, "Daily open tier failed");
                None
            }
        }
    }
}
