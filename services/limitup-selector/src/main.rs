//! Limitup Selector - daily limit-up candidate selection for A-shares.
//!
//! Usage: `limitup-selector [YYYY-MM-DD]`. Without an argument the
//! entry date is today.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use limitup_common::config::Config;
use limitup_common::logging::init_logging;

use limitup_selector::calendar::TradingCalendar;
use limitup_selector::data::auction::{AuctionResolver, RetryPolicy};
use limitup_selector::data::history::HistoryStore;
use limitup_selector::data::local_store::LocalStore;
use limitup_selector::data::valuation::ValuationCache;
use limitup_selector::pool::PoolStore;
use limitup_selector::SelectionEngine;

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = std::time::Instant::now();

    let config = Config::load()?;

    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Limitup Selector v{}", env!("CARGO_PKG_VERSION"));

    let entry_date = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<NaiveDate>()
            .with_context(|| format!("Invalid entry date '{}', expected YYYY-MM-DD", arg))?,
        None => Local::now().date_naive(),
    };

    let store = Arc::new(LocalStore::open(&config.storage.db_path)?);
    let instruments = store.get_instruments().await?;
    let calendar = TradingCalendar::from_dates(store.observed_dates().await?);

    let history = Arc::new(HistoryStore::new(store.clone()));
    let auction = Arc::new(AuctionResolver::new(
        None,
        store.clone(),
        history.clone(),
        RetryPolicy {
            max_attempts: config.selection.auction_max_attempts,
            backoff: std::time::Duration::from_millis(config.selection.auction_backoff_ms),
        },
    ));
    let valuations = Arc::new(ValuationCache::new(store.clone()));
    let pool_store = PoolStore::new(&config.storage.pool_dir);

    let engine = SelectionEngine::new(
        config.selection.clone(),
        instruments,
        calendar,
        history,
        auction,
        valuations,
        pool_store,
    );

    let startup_duration = startup_start.elapsed();
    tracing::info!(
        duration_ms = startup_duration.as_millis() as u64,
        "Engine initialized in {:?}",
        startup_duration
    );

    let report = engine.run(entry_date).await?;

    for selection in &report.selections {
        tracing::info!(
            symbol = %selection.symbol,
            strategy = %selection.strategy,
            "Selected for entry"
        );
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
