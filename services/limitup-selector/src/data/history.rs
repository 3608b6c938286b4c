//! Daily bar access behind a source trait, with a per-run cache.
//!
//! Every consumer in a selection run sees the same immutable
//! [`BarSeries`] per symbol. Bars are fetched from the source once and
//! shared read-only after that.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::local_store::LocalStore;
use super::{BarSeries, DailyBar};
use crate::error::DataError;

/// Maximum bars kept per symbol. The deepest consumer looks back just
/// over a hundred sessions.
pub const HISTORY_DEPTH: usize = 120;

/// Source of daily bars for one instrument.
#[async_trait]
pub trait BarSource: Send + Sync {
    /// Newest `limit` bars for `symbol`, in chronological order.
    async fn daily_bars(&self, symbol: &str, limit: usize) -> Result<Vec<DailyBar>, DataError>;
}

#[async_trait]
impl BarSource for LocalStore {
    async fn daily_bars(&self, symbol: &str, limit: usize) -> Result<Vec<DailyBar>, DataError> {
        self.get_daily_bars(symbol, Some(limit))
            .await
            .map_err(|e| DataError::Storage(e.to_string()))
    }
}

/// Read-through cache over a [`BarSource`].
pub struct HistoryStore {
    source: Arc<dyn BarSource>,
    cache: RwLock<HashMap<String, Arc<BarSeries>>>,
}

impl HistoryStore {
    pub fn new(source: Arc<dyn BarSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Bar series for `symbol`. Empty histories are an error; callers
    /// treat them as a per-instrument skip.
    pub async fn series(&self, symbol: &str) -> Result<Arc<BarSeries>, DataError> {
        if let Some(series) = self.cache.read().await.get(symbol) {
            return Ok(Arc::clone(series));
        }

        let bars = self.source.daily_bars(symbol, HISTORY_DEPTH).await?;
        if bars.is_empty() {
            return Err(DataError::NoHistory {
                symbol: symbol.to_string(),
            });
        }

        let series = Arc::new(BarSeries::new(bars));
        debug!(symbol, bars = series.len(), "Cached bar series");

        let mut cache = self.cache.write().await;
        // A concurrent fetch may have landed first; keep whichever is there.
        Ok(Arc::clone(
            cache
                .entry(symbol.to_string())
                .or_insert(series),
        ))
    }
}
