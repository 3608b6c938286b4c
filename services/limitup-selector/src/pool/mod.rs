//! Daily limit-up pools: per-bar classification, first-board
//! detection across sessions and snapshot persistence.

pub mod classifier;
pub mod detector;
pub mod store;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use classifier::{classify, BoardClass};
pub use detector::{first_board_pool, fresh_not_closed_pool};
pub use store::PoolStore;

/// The classified pools of one session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionPools {
    pub date: NaiveDate,
    /// Instruments that finished the session at the limit price.
    pub closed: Vec<String>,
    /// Instruments that touched the limit intraday but closed below it.
    pub not_closed: Vec<String>,
}

impl SessionPools {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            closed: Vec::new(),
            not_closed: Vec::new(),
        }
    }

    pub fn push(&mut self, symbol: &str, class: BoardClass) {
        match class {
            BoardClass::LimitUpClosed => self.closed.push(symbol.to_string()),
            BoardClass::LimitUpNotClosed => self.not_closed.push(symbol.to_string()),
        }
    }
}

/// The candidate pools feeding one entry date, derived from the two
/// sessions before it. Persisted as one document per entry date and
/// fully overwritten on regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub target_date: NaiveDate,
    pub prev_date: NaiveDate,
    pub prev2_date: NaiveDate,
    /// Sealed the limit on the previous session.
    pub limit_up: Vec<String>,
    /// Sealed the limit two sessions ago.
    pub limit_up_two_ago: Vec<String>,
    /// Sealed on the previous session but not the one before.
    pub first_board: Vec<String>,
    /// Touched but did not seal on the previous session, and did not
    /// seal the session before either.
    pub limit_up_not_closed: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl PoolSnapshot {
    /// Assemble the snapshot for `target_date` from the two prior
    /// sessions' classified pools.
    pub fn assemble(target_date: NaiveDate, prev: &SessionPools, prev2: &SessionPools) -> Self {
        Self {
            target_date,
            prev_date: prev.date,
            prev2_date: prev2.date,
            limit_up: prev.closed.clone(),
            limit_up_two_ago: prev2.closed.clone(),
            first_board: first_board_pool(prev, prev2),
            limit_up_not_closed: fresh_not_closed_pool(prev, prev2),
            generated_at: Utc::now(),
        }
    }
}
