//! Error types for data access and per-instrument evaluation.

use thiserror::Error;

/// Failures raised by market data stores and quote sources.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("quote source error: {0}")]
    Quote(String),

    #[error("no bars for {symbol}")]
    NoHistory { symbol: String },
}

impl DataError {
    /// Transient failures are worth retrying on the live quote tier.
    /// Storage faults are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DataError::Quote(_))
    }
}

/// Why an instrument was dropped from a selection run instead of being
/// scored. Skips are per-instrument and never abort the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Required history bars are absent or too short.
    MissingData,
    /// A reference value needed by the math is unusable, e.g. a
    /// non-positive previous close or a zero previous volume.
    InvalidReference,
    /// Every call-auction quote tier was exhausted.
    QuoteUnavailable,
    /// Market-cap or float metrics could not be obtained.
    ValuationUnavailable,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SkipReason::MissingData => "missing_data",
            SkipReason::InvalidReference => "invalid_reference",
            SkipReason::QuoteUnavailable => "quote_unavailable",
            SkipReason::ValuationUnavailable => "valuation_unavailable",
        };
        f.write_str(s)
    }
}
