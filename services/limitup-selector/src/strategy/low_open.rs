//! First-board low-open strategy.
//!
//! The mirror of the high-open entry: the candidate sealed its first
//! board, sits in the lower half of its 60-bar range, and the auction
//! gaps it down 3 to 4.5 percent. A shallow gap on a name that has
//! not run far tends to get bought back.

use tracing::debug;

use super::{Candidate, RejectReason, Verdict};
use crate::error::SkipReason;

/// Range window for the relative-position check.
const POSITION_WINDOW: usize = 60;

pub struct LowOpenStrategy {
    /// Maximum relative position within the 60-bar range, inclusive.
    pub max_relative_position: f64,
    /// Minimum prior-session turnover, in yuan.
    pub min_turnover: f64,
    /// Gap-down band for auction price against the previous close,
    /// both bounds inclusive.
    pub open_band: (f64, f64),
}

impl Default for LowOpenStrategy {
    fn default() -> Self {
        Self {
            max_relative_position: 0.5,
            min_turnover: 1e8,
            open_band: (0.955, 0.97),
        }
    }
}

impl LowOpenStrategy {
    pub fn evaluate(&self, candidate: &Candidate<'_>) -> Verdict {
        let Some(prev) = candidate.prev_bar() else {
            return Verdict::Skipped(SkipReason::MissingData);
        };
        if prev.close <= 0.0 {
            return Verdict::Skipped(SkipReason::InvalidReference);
        }

        let window = candidate.lookback(POSITION_WINDOW);
        if window.len() < POSITION_WINDOW {
            return Verdict::Skipped(SkipReason::MissingData);
        }

        let low = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let high = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let rp = if high > low {
            (prev.close - low) / (high - low)
        } else {
            // Degenerate range, treat as mid
            0.5
        };
        if rp > self.max_relative_position {
            return Verdict::Rejected(RejectReason::RelativePosition);
        }

        if prev.amount < self.min_turnover {
            return Verdict::Rejected(RejectReason::TurnoverBand);
        }

        let Some(auction) = candidate.auction else {
            return Verdict::Skipped(SkipReason::QuoteUnavailable);
        };
        let open_ratio = auction.price / prev.close;
        if open_ratio < self.open_band.0 || open_ratio > self.open_band.1 {
            return Verdict::Rejected(RejectReason::AuctionPriceBand);
        }

        debug!(symbol = candidate.symbol, rp, "Qualified for low open");
        Verdict::Qualified
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{AuctionQuote, AuctionTier, BarSeries, DailyBar};
    use crate::strategy::testutil::{bar, d};

    // 60 bars ranging 8.0..16.0, sealing day closes at 10.0 for a
    // relative position of 0.25.
    fn low_series(seal_close: f64) -> BarSeries {
        let mut bars: Vec<DailyBar> = (0..59)
            .map(|i| {
                let date = d("2025-10-01") + chrono::Duration::days(i);
                bar(&date.to_string(), 9.0, if i == 0 { 16.0 } else { 9.5 }, if i == 1 { 8.0 } else { 8.8 }, 9.2)
            })
            .collect();
        let mut sealing = bar("2026-01-09", 9.3, seal_close, 9.2, seal_close);
        sealing.amount = 2e8;
        sealing.volume = 2e8 / seal_close;
        bars.push(sealing);
        BarSeries::new(bars)
    }

    fn auction(price: f64) -> AuctionQuote {
        AuctionQuote {
            price,
            volume: 1_000_000.0,
            tier: AuctionTier::MinuteBar,
        }
    }

    fn candidate<'a>(series: &'a BarSeries, quote: Option<&'a AuctionQuote>) -> Candidate<'a> {
        Candidate {
            symbol: "600000",
            name: "浦发银行",
            entry_date: d("2026-01-12"),
            series,
            auction: quote,
            valuation: None,
        }
    }

    #[test]
    fn test_qualifies_on_shallow_gap_down() {
        let series = low_series(10.0);
        let quote = auction(9.65); // 0.965 of 10.0
        let verdict = LowOpenStrategy::default().evaluate(&candidate(&series, Some(&quote)));
        assert_eq!(verdict, Verdict::Qualified);
    }

    #[test]
    fn test_relative_position_half_is_inclusive() {
        // close 12.0 against the 8.0..16.0 range sits exactly at 0.5
        let series = low_series(12.0);
        let quote = auction(12.0 * 0.96);
        let verdict = LowOpenStrategy::default().evaluate(&candidate(&series, Some(&quote)));
        assert_eq!(verdict, Verdict::Qualified);
    }

    #[test]
    fn test_upper_half_rejected() {
        let series = low_series(14.0);
        let quote = auction(14.0 * 0.96);
        let verdict = LowOpenStrategy::default().evaluate(&candidate(&series, Some(&quote)));
        assert_eq!(verdict, Verdict::Rejected(RejectReason::RelativePosition));
    }

    #[test]
    fn test_gap_too_deep_rejected() {
        let series = low_series(10.0);
        let quote = auction(9.40); // 0.94, below the band
        let verdict = LowOpenStrategy::default().evaluate(&candidate(&series, Some(&quote)));
        assert_eq!(verdict, Verdict::Rejected(RejectReason::AuctionPriceBand));
    }

    #[test]
    fn test_band_edges() {
        let series = low_series(10.0);
        for (price, want) in [
            (9.56, Verdict::Qualified),
            (9.69, Verdict::Qualified),
            (9.71, Verdict::Rejected(RejectReason::AuctionPriceBand)),
            (9.54, Verdict::Rejected(RejectReason::AuctionPriceBand)),
        ] {
            let quote = auction(price);
            let verdict = LowOpenStrategy::default().evaluate(&candidate(&series, Some(&quote)));
            assert_eq!(verdict, want, "price {}", price);
        }
    }

    #[test]
    fn test_short_window_is_skip() {
        let series = BarSeries::new(vec![
            bar("2026-01-08", 9.9, 10.05, 9.85, 10.0),
            bar("2026-01-09", 10.2, 11.0, 10.1, 11.0),
        ]);
        let quote = auction(10.6);
        let verdict = LowOpenStrategy::default().evaluate(&candidate(&series, Some(&quote)));
        assert_eq!(verdict, Verdict::Skipped(SkipReason::MissingData));
    }

    #[test]
    fn test_thin_turnover_rejected() {
        let mut strategy = LowOpenStrategy::default();
        strategy.min_turnover = 3e8; // sealing day traded 2e8
        let series = low_series(10.0);
        let quote = auction(9.65);
        let verdict = strategy.evaluate(&candidate(&series, Some(&quote)));
        assert_eq!(verdict, Verdict::Rejected(RejectReason::TurnoverBand));
    }
}
