//! Valuation metric access behind a source trait.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::local_store::LocalStore;
use super::Valuation;
use crate::error::DataError;

/// Source of market-cap metrics, resolved as-of a date.
#[async_trait]
pub trait ValuationSource: Send + Sync {
    /// Most recent metrics at or before `date`, or `None` when the
    /// instrument has never been valued.
    async fn valuation(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<Valuation>, DataError>;
}

#[async_trait]
impl ValuationSource for LocalStore {
    async fn valuation(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<Valuation>, DataError> {
        self.get_valuation(symbol, date)
            .await
            .map_err(|e| DataError::Storage(e.to_string()))
    }
}

/// Read-through cache over a [`ValuationSource`]. Absent valuations
/// are cached too so each instrument is asked about once per run.
pub struct ValuationCache {
    source: std::sync::Arc<dyn ValuationSource>,
    cache: RwLock<HashMap<(String, NaiveDate), Option<Valuation>>>,
}

impl ValuationCache {
    pub fn new(source: std::sync::Arc<dyn ValuationSource>) -> Self {
        Self {
            source,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn valuation(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<Valuation>, DataError> {
        let key = (symbol.to_string(), date);
        if let Some(v) = self.cache.read().await.get(&key) {
            return Ok(*v);
        }

        let v = self.source.valuation(symbol, date).await?;
        self.cache.write().await.insert(key, v);
        Ok(v)
    }
}
