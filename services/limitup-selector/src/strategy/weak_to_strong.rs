//! Weak-to-strong strategy.
//!
//! Candidates touched the limit the previous session but failed to
//! seal it. The bet is that a board that broke without a prior run-up,
//! without a collapse into the close, and with enough auction demand
//! this morning turns strong on day two.

use tracing::debug;

use super::{
    auction_volume_ratio_ok, left_pressure, market_cap_in_bounds, Candidate, RejectReason, Verdict,
};
use crate::error::SkipReason;

/// Sessions of history fed to the left-pressure check.
const PRESSURE_LOOKBACK: usize = 101;

pub struct WeakToStrongStrategy {
    /// Maximum 3-session return into the broken board.
    pub max_recent_runup: f64,
    /// Minimum prior-session candle body, as (close-open)/open.
    pub min_prior_body: f64,
    /// Minimum prior-session VWAP change against that session's close.
    pub min_open_strength: f64,
    /// Prior-session turnover band, in yuan.
    pub turnover_band: (f64, f64),
    /// Minimum auction volume as a fraction of prior-session volume.
    pub min_auction_volume_ratio: f64,
    /// Open band for auction price against the projected prior close,
    /// both bounds inclusive.
    pub open_band: (f64, f64),
}

impl Default for WeakToStrongStrategy {
    fn default() -> Self {
        Self {
            max_recent_runup: 0.28,
            min_prior_body: -0.05,
            min_open_strength: -0.04,
            turnover_band: (3e8, 19e8),
            min_auction_volume_ratio: 0.03,
            open_band: (0.98, 1.09),
        }
    }
}

impl WeakToStrongStrategy {
    pub fn evaluate(&self, candidate: &Candidate<'_>) -> Verdict {
        let history = candidate.series.bars_before(candidate.entry_date);
        if history.len() < 4 {
            return Verdict::Skipped(SkipReason::MissingData);
        }
        let prev = &history[history.len() - 1];
        let base = &history[history.len() - 4];
        if base.close <= 0.0 || prev.open <= 0.0 || prev.close <= 0.0 {
            return Verdict::Skipped(SkipReason::InvalidReference);
        }

        if prev.close / base.close - 1.0 > self.max_recent_runup {
            return Verdict::Rejected(RejectReason::RecentRunup);
        }

        if (prev.close - prev.open) / prev.open < self.min_prior_body {
            return Verdict::Rejected(RejectReason::PriorSessionShape);
        }

        let Some(avg_price) = candidate.prev_avg_price() else {
            return Verdict::Skipped(SkipReason::InvalidReference);
        };
        if avg_price / prev.close - 1.0 < self.min_open_strength {
            return Verdict::Rejected(RejectReason::OpenStrength);
        }

        if prev.amount < self.turnover_band.0 || prev.amount > self.turnover_band.1 {
            return Verdict::Rejected(RejectReason::TurnoverBand);
        }

        let Some(valuation) = candidate.valuation else {
            return Verdict::Skipped(SkipReason::ValuationUnavailable);
        };
        if !market_cap_in_bounds(valuation) {
            return Verdict::Rejected(RejectReason::MarketCapBand);
        }

        let Some(auction) = candidate.auction else {
            return Verdict::Skipped(SkipReason::QuoteUnavailable);
        };
        if !auction_volume_ratio_ok(auction, prev.volume, self.min_auction_volume_ratio) {
            return Verdict::Rejected(RejectReason::AuctionVolumeRatio);
        }

        let Some(limit) = candidate.entry_limit_price() else {
            return Verdict::Skipped(SkipReason::InvalidReference);
        };
        let open_ratio = auction.price / (limit / 1.1);
        if open_ratio < self.open_band.0 || open_ratio > self.open_band.1 {
            return Verdict::Rejected(RejectReason::AuctionPriceBand);
        }

        if !left_pressure::passes(candidate.lookback(PRESSURE_LOOKBACK)) {
            return Verdict::Rejected(RejectReason::LeftPressure);
        }

        debug!(symbol = candidate.symbol, "Qualified for weak to strong");
        Verdict::Qualified
    }
}
