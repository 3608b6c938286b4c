//! Market data model: daily bars, instrument metadata, valuation
//! metrics and the call-auction quote types shared across the crate.

pub mod auction;
pub mod history;
pub mod local_store;
pub mod valuation;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Types
// ============================================================================

/// One daily OHLCV bar. Volume is in shares, amount in yuan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
    /// Percent change as reported by the data source, when present.
    /// Some feeds omit it or report 0.0 for stale rows.
    #[serde(default)]
    pub pct_change: Option<f64>,
}

/// Static instrument metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentMeta {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub list_date: Option<NaiveDate>,
    #[serde(default)]
    pub suspended: bool,
}

impl InstrumentMeta {
    /// ST and *ST names carry a 5% daily band and are excluded from
    /// the candidate universe.
    pub fn is_st(&self) -> bool {
        self.name.contains("ST")
    }

    /// Names containing the delisting marker are excluded outright.
    pub fn is_delisting(&self) -> bool {
        self.name.contains('退')
    }
}

/// Market-cap metrics, in yuan. Turnover ratio is carried when the
/// source reports it but no strategy gates on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub market_cap: f64,
    pub float_market_cap: f64,
    #[serde(default)]
    pub turnover_ratio: Option<f64>,
}

/// Which tier produced a call-auction quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionTier {
    /// Real-time tick snapshot during the auction window.
    LiveTick,
    /// Earliest minute bar of the session.
    MinuteBar,
    /// Daily bar open price, volume unknown.
    DailyOpen,
}

/// A resolved call-auction quote. Volume is in shares; the daily-open
/// tier cannot know it and reports 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuctionQuote {
    pub price: f64,
    pub volume: f64,
    pub tier: AuctionTier,
}

// ============================================================================
// Price Band Helpers
// ============================================================================

/// Daily price band ratio for an instrument. Growth boards (ChiNext
/// `30`, STAR `68`) move 20%, ST names 5%, everything else 10%.
pub fn limit_ratio(symbol: &str, name: &str) -> f64 {
    if symbol.starts_with("30") || symbol.starts_with("68") {
        0.20
    } else if name.contains("ST") {
        0.05
    } else {
        0.10
    }
}

/// True when the symbol trades on a 20% band.
pub fn is_growth_board(symbol: &str) -> bool {
    symbol.starts_with("30") || symbol.starts_with("68")
}

/// Exchange rounding to fen.
pub fn round_to_fen(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// Limit-up price from the previous close, or `None` when the
/// reference is unusable.
pub fn limit_price(prev_close: f64, ratio: f64) -> Option<f64> {
    if prev_close <= 0.0 {
        return None;
    }
    Some(round_to_fen(prev_close * (1.0 + ratio)))
}

// ============================================================================
// Bar Series
// ============================================================================

/// An instrument's daily bars, sorted ascending by date with duplicate
/// dates collapsed to the last observation.
#[derive(Debug, Clone, Default)]
pub struct BarSeries {
    bars: Vec<DailyBar>,
}

impl BarSeries {
    /// Build a series from unordered bars. Later entries win on
    /// duplicate dates. Mixed-unit volumes (lots instead of shares)
    /// are normalized against the prior close.
    pub fn new(mut bars: Vec<DailyBar>) -> Self {
        bars.sort_by_key(|b| b.date);
        bars.dedup_by(|next, prev| {
            if next.date == prev.date {
                *prev = *next;
                true
            } else {
                false
            }
        });
        normalize_volume_units(&mut bars);
        Self { bars }
    }

    pub fn bars(&self) -> &[DailyBar] {
        &self.bars
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Bar exactly on `date`, if the instrument traded that day.
    pub fn bar_on(&self, date: NaiveDate) -> Option<&DailyBar> {
        self.bars
            .binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|i| &self.bars[i])
    }

    /// Most recent bar strictly before `date`.
    pub fn bar_before(&self, date: NaiveDate) -> Option<&DailyBar> {
        let idx = self.bars.partition_point(|b| b.date < date);
        idx.checked_sub(1).map(|i| &self.bars[i])
    }

    /// Up to `n` most recent bars with date <= `date`, ascending.
    pub fn window_through(&self, date: NaiveDate, n: usize) -> &[DailyBar] {
        let end = self.bars.partition_point(|b| b.date <= date);
        let start = end.saturating_sub(n);
        &self.bars[start..end]
    }

    /// All bars strictly before `date`, ascending.
    pub fn bars_before(&self, date: NaiveDate) -> &[DailyBar] {
        let end = self.bars.partition_point(|b| b.date < date);
        &self.bars[..end]
    }
}

/// Some feeds report minute or daily volume in lots (100 shares)
/// rather than shares. Detect the unit per bar by checking the implied
/// average trade price against the prior close and scale up when it is
/// off by two orders of magnitude.
fn normalize_volume_units(bars: &mut [DailyBar]) {
    for i in 1..bars.len() {
        let prev_close = bars[i - 1].close;
        let b = &mut bars[i];
        if b.volume > 0.0 && prev_close > 0.0 && b.amount / b.volume > prev_close * 5.0 {
            b.volume *= 100.0;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
