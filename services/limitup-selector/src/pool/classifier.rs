//! Per-bar limit-up classification.
//!
//! A bar is classified against the limit price implied by the prior
//! close. Printed prices only carry fen precision, so equality checks
//! allow a 2 fen tolerance. Bars whose reference is unusable classify
//! as neither state and simply fall out of the pools.

use serde::{Deserialize, Serialize};

use crate::data::{is_growth_board, limit_price, limit_ratio, DailyBar};

/// Price tolerance for limit comparisons, in yuan.
const PRICE_TOLERANCE: f64 = 0.02;

/// How a session ended relative to its limit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardClass {
    /// Closed pinned at the limit price.
    LimitUpClosed,
    /// Touched the limit intraday but closed below it.
    LimitUpNotClosed,
}

/// Classify one session's bar. `prev_close` is the close of the
/// session immediately before `bar`.
pub fn classify(symbol: &str, name: &str, bar: &DailyBar, prev_close: f64) -> Option<BoardClass> {
    let ratio = limit_ratio(symbol, name);
    let lp = limit_price(prev_close, ratio)?;

    // Some feeds omit pct_change or leave it 0 on stale rows; derive
    // it from closes in that case.
    let pct = match bar.pct_change {
        Some(p) if p != 0.0 => p,
        _ => {
            if prev_close <= 0.0 {
                return None;
            }
            (bar.close - prev_close) / prev_close * 100.0
        }
    };

    let threshold = if is_growth_board(symbol) { 19.5 } else { 9.75 };

    let closed_at_limit = pct >= threshold || (bar.close - lp).abs() <= PRICE_TOLERANCE;
    if closed_at_limit {
        return Some(BoardClass::LimitUpClosed);
    }

    let touched = (bar.high - lp).abs() <= PRICE_TOLERANCE || pct >= threshold;
    if touched && bar.close < lp {
        return Some(BoardClass::LimitUpNotClosed);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(open: f64, high: f64, low: f64, close: f64, pct: Option<f64>) -> DailyBar {
        DailyBar {
            date: NaiveDate::from_ymd_opt(2026, 1, 9).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1_000_000.0,
            amount: close * 1_000_000.0,
            pct_change: pct,
        }
    }

    #[test]
    fn test_closed_at_exact_limit() {
        // prev 10.00, main board limit 11.00
        let b = bar(10.20, 11.00, 10.10, 11.00, None);
        assert_eq!(
            classify("600000", "浦发银行", &b, 10.0),
            Some(BoardClass::LimitUpClosed)
        );
    }

    #[test]
    fn test_closed_within_fen_tolerance() {
        let b = bar(10.20, 11.00, 10.10, 10.99, None);
        assert_eq!(
            classify("600000", "浦发银行", &b, 10.0),
            Some(BoardClass::LimitUpClosed)
        );
    }

    #[test]
    fn test_reported_pct_trumps_derived() {
        // Close math says ~9% but the feed reports a sealed board
        let b = bar(10.0, 10.95, 9.9, 10.90, Some(10.0));
        assert_eq!(
            classify("600000", "浦发银行", &b, 10.0),
            Some(BoardClass::LimitUpClosed)
        );
    }

    #[test]
    fn test_zero_reported_pct_falls_back_to_closes() {
        let b = bar(10.20, 11.00, 10.10, 11.00, Some(0.0));
        assert_eq!(
            classify("600000", "浦发银行", &b, 10.0),
            Some(BoardClass::LimitUpClosed)
        );
    }

    #[test]
    fn test_touched_but_not_closed() {
        // High reached the limit, close fell back
        let b = bar(10.20, 11.00, 10.10, 10.60, None);
        assert_eq!(
            classify("600000", "浦发银行", &b, 10.0),
            Some(BoardClass::LimitUpNotClosed)
        );
    }

    #[test]
    fn test_ordinary_day_is_neither() {
        let b = bar(10.10, 10.50, 10.00, 10.30, None);
        assert_eq!(classify("600000", "浦发银行", &b, 10.0), None);
    }

    #[test]
    fn test_growth_board_threshold() {
        // prev 10.00, ChiNext limit 12.00; a 10% move is nothing there
        let b = bar(10.50, 11.00, 10.40, 11.00, None);
        assert_eq!(classify("300750", "宁德时代", &b, 10.0), None);

        let sealed = bar(11.0, 12.00, 10.9, 12.00, None);
        assert_eq!(
            classify("300750", "宁德时代", &sealed, 10.0),
            Some(BoardClass::LimitUpClosed)
        );
    }

    #[test]
    fn test_st_band() {
        // prev 10.00, ST limit 10.50
        let b = bar(10.10, 10.50, 10.00, 10.50, None);
        assert_eq!(
            classify("600000", "*ST示例", &b, 10.0),
            Some(BoardClass::LimitUpClosed)
        );
    }

    #[test]
    fn test_invalid_reference_is_neither() {
        let b = bar(10.20, 11.00, 10.10, 11.00, None);
        assert_eq!(classify("600000", "浦发银行", &b, 0.0), None);
    }
}
