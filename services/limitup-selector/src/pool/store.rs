//! Pool snapshot persistence.
//!
//! One JSON document per entry date keeps the pools replayable and
//! lets a later run rebuild its inputs without reclassifying history.
//! Regeneration fully overwrites the document, it is never merged.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::debug;

use super::PoolSnapshot;

pub struct PoolStore {
    dir: PathBuf,
}

impl PoolStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn path_for(&self, target_date: NaiveDate) -> PathBuf {
        self.dir.join(format!("pool_{}.json", target_date))
    }

    /// Persist a snapshot, replacing any existing document for the
    /// entry date.
    pub async fn save(&self, snapshot: &PoolSnapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create pool directory {}", self.dir.display()))?;

        let path = self.path_for(snapshot.target_date);
        let json = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write pool snapshot {}", path.display()))?;

        debug!(target_date = %snapshot.target_date,
               first_board = snapshot.first_board.len(),
               not_closed = snapshot.limit_up_not_closed.len(),
               "Saved pool snapshot");
        Ok(())
    }

    /// Load the snapshot for an entry date, `None` when absent.
    pub async fn load(&self, target_date: NaiveDate) -> Result<Option<PoolSnapshot>> {
        let path = self.path_for(target_date);
        if !path.exists() {
            return Ok(None);
        }

        let raw = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read pool snapshot {}", path.display()))?;
        let snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse pool snapshot {}", path.display()))?;
        Ok(Some(snapshot))
    }
}
