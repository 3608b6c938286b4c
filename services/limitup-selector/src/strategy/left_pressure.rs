//! Overhead-supply heuristic ("zyts").
//!
//! The idea: find how far back the last price high comparable to the
//! reference session's high sits, pad that distance by a few sessions,
//! and demand that the reference session's volume roughly matches the
//! largest volume printed inside that window. A reference session that
//! out-trades the supply left at the old high has little resistance
//! above it.

use crate::data::DailyBar;

/// Lookback distance assumed when no earlier comparable high exists.
const DEFAULT_DISTANCE: usize = 100;

/// Padding added to the found distance.
const WINDOW_PAD: usize = 5;

/// Volume confirmation factor.
const VOLUME_FACTOR: f64 = 0.9;

/// Distance to the last bar whose high reached the reference high,
/// padded by [`WINDOW_PAD`]. `bars` end at the reference session; the
/// scan starts at the third-most-recent bar, which counts as distance
/// one.
pub fn pressure_window(bars: &[DailyBar]) -> usize {
    let n = bars.len();
    if n == 0 {
        return DEFAULT_DISTANCE + WINDOW_PAD;
    }
    let reference_high = bars[n - 1].high;

    let mut distance = DEFAULT_DISTANCE;
    if n >= 3 {
        for i in (0..=n - 3).rev() {
            if bars[i].high >= reference_high {
                distance = n - 2 - i;
                break;
            }
        }
    }
    distance + WINDOW_PAD
}

/// Whether the reference session's volume clears the window's prior
/// maximum. Fewer than two bars cannot be judged and fail.
pub fn passes(bars: &[DailyBar]) -> bool {
    let n = bars.len();
    if n < 2 {
        return false;
    }

    let window = pressure_window(bars);
    let start = n.saturating_sub(window);
    let max_prev = bars[start..n - 1]
        .iter()
        .map(|b| b.volume)
        .fold(0.0_f64, f64::max);

    // A window of zero traded volume poses no resistance at all.
    if max_prev == 0.0 {
        return true;
    }
    bars[n - 1].volume > max_prev * VOLUME_FACTOR
}
