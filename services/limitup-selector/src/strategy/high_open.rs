//! First-board high-open strategy.
//!
//! Candidates sealed their first board the previous session. The
//! strategy wants a strong sealing day (VWAP close to the day's own
//! close), a turnover band that excludes both illiquid names and
//! crowded ones, mid-to-large caps, and an opening auction that gaps
//! up moderately on real volume without overhead supply nearby.

use tracing::debug;

use super::{
    auction_volume_ratio_ok, left_pressure, market_cap_in_bounds, Candidate, RejectReason, Verdict,
};
use crate::error::SkipReason;

/// Sessions of history fed to the left-pressure check.
const PRESSURE_LOOKBACK: usize = 101;

pub struct HighOpenStrategy {
    /// Minimum sealing-day VWAP strength against the day's own close,
    /// after the 1.1 projection.
    pub min_open_strength: f64,
    /// Prior-session turnover band, in yuan.
    pub turnover_band: (f64, f64),
    /// Minimum auction volume as a fraction of prior-session volume.
    pub min_auction_volume_ratio: f64,
    /// Open band for auction price against the projected prior close,
    /// both bounds exclusive.
    pub open_band: (f64, f64),
}

impl Default for HighOpenStrategy {
    fn default() -> Self {
        Self {
            min_open_strength: 0.07,
            turnover_band: (5.5e8, 20e8),
            min_auction_volume_ratio: 0.03,
            open_band: (1.0, 1.06),
        }
    }
}

impl HighOpenStrategy {
    pub fn evaluate(&self, candidate: &Candidate<'_>) -> Verdict {
        let Some(prev) = candidate.prev_bar() else {
            return Verdict::Skipped(SkipReason::MissingData);
        };
        if prev.close <= 0.0 {
            return Verdict::Skipped(SkipReason::InvalidReference);
        }
        let Some(avg_price) = candidate.prev_avg_price() else {
            // Zero prior volume, nothing to divide by
            return Verdict::Skipped(SkipReason::InvalidReference);
        };

        if (avg_price / prev.close) * 1.1 - 1.0 < self.min_open_strength {
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
        if open_ratio <= self.open_band.0 || open_ratio >= self.open_band.1 {
            return Verdict::Rejected(RejectReason::AuctionPriceBand);
        }

        if !left_pressure::passes(candidate.lookback(PRESSURE_LOOKBACK)) {
            return Verdict::Rejected(RejectReason::LeftPressure);
        }

        debug!(symbol = candidate.symbol, "Qualified for high open");
        Verdict::Qualified
    }
}
