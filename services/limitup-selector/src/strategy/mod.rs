//! Qualification strategies.
//!
//! Three independent strategies score a candidate for same-day entry:
//! first-board high-open, first-board low-open and weak-to-strong.
//! Each one walks its conditions in a fixed order and stops at the
//! first failure, recording which check failed. Candidates whose
//! inputs cannot be assembled are skipped rather than rejected, see
//! [`SkipReason`].

pub mod high_open;
pub mod left_pressure;
pub mod low_open;
pub mod weak_to_strong;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::{limit_price, limit_ratio, AuctionQuote, BarSeries, DailyBar, Valuation};
use crate::error::SkipReason;

pub use high_open::HighOpenStrategy;
pub use low_open::LowOpenStrategy;
pub use weak_to_strong::WeakToStrongStrategy;

/// Which strategy produced a result. Discovery order is HighOpen,
/// LowOpen, WeakToStrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    HighOpen,
    LowOpen,
    WeakToStrong,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StrategyKind::HighOpen => "high_open",
            StrategyKind::LowOpen => "low_open",
            StrategyKind::WeakToStrong => "weak_to_strong",
        };
        f.write_str(s)
    }
}

/// First condition a strategy failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Prior-session VWAP strength against the close before it.
    OpenStrength,
    /// Prior-session turnover outside the strategy's band.
    TurnoverBand,
    /// Market cap or float outside bounds.
    MarketCapBand,
    /// Auction matched volume too small against prior-session volume.
    AuctionVolumeRatio,
    /// Auction price outside the open band.
    AuctionPriceBand,
    /// Overhead supply check failed.
    LeftPressure,
    /// 60-bar relative position too high for a low open.
    RelativePosition,
    /// Ran up too far over the last three sessions.
    RecentRunup,
    /// Prior session's candle shape too weak.
    PriorSessionShape,
}

/// Outcome of evaluating one candidate against one strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum Verdict {
    Qualified,
    Rejected(RejectReason),
    Skipped(SkipReason),
}

impl Verdict {
    pub fn is_qualified(&self) -> bool {
        matches!(self, Verdict::Qualified)
    }
}

/// Per-candidate qualification record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationResult {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub verdict: Verdict,
}

/// Everything a strategy needs about one candidate, assembled eagerly
/// by the orchestrator. Strategies themselves are pure.
pub struct Candidate<'a> {
    pub symbol: &'a str,
    pub name: &'a str,
    pub entry_date: NaiveDate,
    /// Full daily history, including sessions before the entry date.
    pub series: &'a BarSeries,
    pub auction: Option<&'a AuctionQuote>,
    pub valuation: Option<&'a Valuation>,
}

impl<'a> Candidate<'a> {
    /// The session immediately before the entry date.
    pub fn prev_bar(&self) -> Option<&'a DailyBar> {
        self.series.bar_before(self.entry_date)
    }

    /// VWAP of the previous session.
    pub fn prev_avg_price(&self) -> Option<f64> {
        let prev = self.prev_bar()?;
        if prev.volume <= 0.0 {
            return None;
        }
        Some(prev.amount / prev.volume)
    }

    /// Entry-day limit price implied by the previous close.
    pub fn entry_limit_price(&self) -> Option<f64> {
        let prev = self.prev_bar()?;
        limit_price(prev.close, limit_ratio(self.symbol, self.name))
    }

    /// Up to `n` bars ending at the previous session, for lookback
    /// evaluation.
    pub fn lookback(&self, n: usize) -> &'a [DailyBar] {
        match self.prev_bar() {
            Some(prev) => self.series.window_through(prev.date, n),
            None => &[],
        }
    }
}

/// Market-cap bounds shared by the high-open and weak-to-strong
/// strategies.
pub(crate) fn market_cap_in_bounds(v: &Valuation) -> bool {
    v.market_cap >= 70e8 && v.float_market_cap <= 520e8
}

/// Auction matched volume against prior-session volume.
pub(crate) fn auction_volume_ratio_ok(
    auction: &AuctionQuote,
    prev_volume: f64,
    min_ratio: f64,
) -> bool {
    prev_volume > 0.0 && auction.volume / prev_volume >= min_ratio
}
