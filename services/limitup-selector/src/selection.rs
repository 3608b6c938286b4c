//! Selection orchestration for one entry date.
//!
//! The engine classifies the two prior sessions into limit-up pools,
//! derives the candidate sets, resolves each candidate's auction
//! quote and valuation, and runs the strategies: high-open then
//! low-open over first boards (first satisfied wins), weak-to-strong
//! over broken boards. Instruments are evaluated concurrently and
//! independently; a failure on one never aborts the run. Output order
//! is deterministic for fixed inputs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use limitup_common::config::SelectionConfig;

use crate::calendar::TradingCalendar;
use crate::data::auction::AuctionResolver;
use crate::data::history::HistoryStore;
use crate::data::valuation::ValuationCache;
use crate::data::{AuctionQuote, InstrumentMeta, Valuation};
use crate::error::SkipReason;
use crate::pool::{classify, PoolSnapshot, PoolStore, SessionPools};
use crate::strategy::{
    Candidate, HighOpenStrategy, LowOpenStrategy, QualificationResult, StrategyKind, Verdict,
    WeakToStrongStrategy,
};

/// One selected entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub symbol: String,
    pub strategy: StrategyKind,
    pub entry_date: NaiveDate,
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionReport {
    pub entry_date: NaiveDate,
    pub snapshot: PoolSnapshot,
    /// Ordered picks: high-open, then low-open, then weak-to-strong,
    /// candidate order within each.
    pub selections: Vec<Selection>,
    /// Per-candidate diagnostics, including rejections and skips.
    pub outcomes: Vec<QualificationResult>,
    /// True when the time budget cancelled evaluations still in flight.
    pub truncated: bool,
}

pub struct SelectionEngine {
    config: SelectionConfig,
    instruments: Vec<InstrumentMeta>,
    calendar: TradingCalendar,
    history: Arc<HistoryStore>,
    auction: Arc<AuctionResolver>,
    valuations: Arc<ValuationCache>,
    pool_store: PoolStore,
    high_open: HighOpenStrategy,
    low_open: LowOpenStrategy,
    weak_to_strong: WeakToStrongStrategy,
}

impl SelectionEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SelectionConfig,
        instruments: Vec<InstrumentMeta>,
        calendar: TradingCalendar,
        history: Arc<HistoryStore>,
        auction: Arc<AuctionResolver>,
        valuations: Arc<ValuationCache>,
        pool_store: PoolStore,
    ) -> Self {
        Self {
            config,
            instruments,
            calendar,
            history,
            auction,
            valuations,
            pool_store,
            high_open: HighOpenStrategy::default(),
            low_open: LowOpenStrategy::default(),
            weak_to_strong: WeakToStrongStrategy::default(),
        }
    }

    /// Run the full selection for `entry_date`.
    pub async fn run(&self, entry_date: NaiveDate) -> Result<SelectionReport> {
        let universe = self.universe(entry_date);
        if universe.is_empty() {
            bail!("no tradable instruments with history, cannot run selection");
        }

        let Some(prev_date) = self.calendar.previous_or_weekday(entry_date) else {
            bail!("no trading session before {} in the calendar", entry_date);
        };
        let Some(prev2_date) = self.calendar.previous_or_weekday(prev_date) else {
            bail!("no trading session before {} in the calendar", prev_date);
        };
        info!(%entry_date, %prev_date, %prev2_date, universe = universe.len(), "Starting selection run");

        let deadline = self
            .config
            .time_budget_secs
            .map(|s| tokio::time::Instant::now() + Duration::from_secs(s));

        let snapshot = match self.pool_store.load(entry_date).await {
            Ok(Some(s)) if s.prev_date == prev_date && s.prev2_date == prev2_date => {
                info!(%entry_date, "Reusing persisted pool snapshot");
                s
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted pool snapshot, regenerating");
                self.build_snapshot(&universe, entry_date, prev_date, prev2_date)
                    .await?
            }
            _ => {
                self.build_snapshot(&universe, entry_date, prev_date, prev2_date)
                    .await?
            }
        };
        info!(
            first_board = snapshot.first_board.len(),
            not_closed = snapshot.limit_up_not_closed.len(),
            "Assembled candidate pools"
        );

        let names: HashMap<&str, &str> = self
            .instruments
            .iter()
            .map(|m| (m.symbol.as_str(), m.name.as_str()))
            .collect();

        let mut outcomes = Vec::new();
        let mut truncated = false;

        // First boards: high-open, then low-open for whatever it passed on.
        let first_board_futs = snapshot.first_board.iter().filter_map(|symbol| {
            let name = names.get(symbol.as_str())?;
            Some(self.evaluate_first_board(symbol.clone(), name.to_string(), entry_date))
        });
        let stream = stream::iter(first_board_futs).buffered(self.config.max_concurrency.max(1));
        let (results, cut) = collect_until(stream, deadline).await;
        truncated |= cut;
        outcomes.extend(results.into_iter().flatten());

        // Broken boards: weak-to-strong.
        let not_closed_futs = snapshot.limit_up_not_closed.iter().filter_map(|symbol| {
            let name = names.get(symbol.as_str())?;
            Some(self.evaluate_weak_to_strong(symbol.clone(), name.to_string(), entry_date))
        });
        let stream = stream::iter(not_closed_futs).buffered(self.config.max_concurrency.max(1));
        let (results, cut) = collect_until(stream, deadline).await;
        truncated |= cut;
        outcomes.extend(results);

        if truncated {
            warn!("Time budget exhausted, some candidates were not evaluated");
        }

        let selections = assemble_selections(&outcomes, entry_date);
        info!(selected = selections.len(), "Selection run finished");

        Ok(SelectionReport {
            entry_date,
            snapshot,
            selections,
            outcomes,
            truncated,
        })
    }

    /// Tradable universe for the entry date.
    fn universe(&self, entry_date: NaiveDate) -> Vec<&InstrumentMeta> {
        self.instruments
            .iter()
            .filter(|m| self.in_universe(m, entry_date))
            .collect()
    }

    fn in_universe(&self, meta: &InstrumentMeta, entry_date: NaiveDate) -> bool {
        let s = meta.symbol.as_str();
        // Beijing exchange and STAR board are out of scope for entries
        if s.starts_with('4') || s.starts_with('8') || s.starts_with("68") {
            return false;
        }
        if meta.is_st() || meta.is_delisting() || meta.suspended {
            return false;
        }
        if let Some(list_date) = meta.list_date {
            if (entry_date - list_date).num_days() < self.config.min_listed_days {
                return false;
            }
        }
        true
    }

    /// Classify every universe instrument's bar on `date` into the
    /// session pools. Instruments without a usable bar fall out
    /// silently.
    async fn classify_session(
        &self,
        universe: &[&InstrumentMeta],
        date: NaiveDate,
    ) -> SessionPools {
        let futs = universe.iter().map(|meta| async move {
            let series = self.history.series(&meta.symbol).await.ok()?;
            let bar = *series.bar_on(date)?;
            let prev_close = series.bar_before(date)?.close;
            let class = classify(&meta.symbol, &meta.name, &bar, prev_close)?;
            Some((meta.symbol.clone(), class))
        });

        let classified: Vec<_> = stream::iter(futs)
            .buffered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let mut pools = SessionPools::new(date);
        for item in classified.into_iter().flatten() {
            pools.push(&item.0, item.1);
        }
        pools
    }

    /// Classify the two prior sessions, assemble the snapshot and
    /// persist it.
    async fn build_snapshot(
        &self,
        universe: &[&InstrumentMeta],
        entry_date: NaiveDate,
        prev_date: NaiveDate,
        prev2_date: NaiveDate,
    ) -> Result<PoolSnapshot> {
        let prev_pools = self.classify_session(universe, prev_date).await;
        let prev2_pools = self.classify_session(universe, prev2_date).await;
        let snapshot = PoolSnapshot::assemble(entry_date, &prev_pools, &prev2_pools);
        self.pool_store.save(&snapshot).await?;
        Ok(snapshot)
    }

    async fn evaluate_first_board(
        &self,
        symbol: String,
        name: String,
        entry_date: NaiveDate,
    ) -> Vec<QualificationResult> {
        let (series, quote, valuation) = match self.candidate_inputs(&symbol, entry_date).await {
            Ok(inputs) => inputs,
            Err(reason) => {
                return vec![QualificationResult {
                    symbol,
                    strategy: StrategyKind::HighOpen,
                    verdict: Verdict::Skipped(reason),
                }]
            }
        };
        let candidate = Candidate {
            symbol: &symbol,
            name: &name,
            entry_date,
            series: &series,
            auction: quote.as_ref(),
            valuation: valuation.as_ref(),
        };

        let high = self.high_open.evaluate(&candidate);
        let low = if high.is_qualified() {
            None
        } else {
            Some(self.low_open.evaluate(&candidate))
        };

        let mut results = vec![QualificationResult {
            symbol: symbol.clone(),
            strategy: StrategyKind::HighOpen,
            verdict: high,
        }];
        if let Some(verdict) = low {
            results.push(QualificationResult {
                symbol,
                strategy: StrategyKind::LowOpen,
                verdict,
            });
        }
        results
    }

    async fn evaluate_weak_to_strong(
        &self,
        symbol: String,
        name: String,
        entry_date: NaiveDate,
    ) -> QualificationResult {
        let (series, quote, valuation) = match self.candidate_inputs(&symbol, entry_date).await {
            Ok(inputs) => inputs,
            Err(reason) => {
                return QualificationResult {
                    symbol,
                    strategy: StrategyKind::WeakToStrong,
                    verdict: Verdict::Skipped(reason),
                }
            }
        };
        let candidate = Candidate {
            symbol: &symbol,
            name: &name,
            entry_date,
            series: &series,
            auction: quote.as_ref(),
            valuation: valuation.as_ref(),
        };
        let verdict = self.weak_to_strong.evaluate(&candidate);
        QualificationResult {
            symbol,
            strategy: StrategyKind::WeakToStrong,
            verdict,
        }
    }

    async fn candidate_inputs(
        &self,
        symbol: &str,
        entry_date: NaiveDate,
    ) -> Result<
        (
            Arc<crate::data::BarSeries>,
            Option<AuctionQuote>,
            Option<Valuation>,
        ),
        SkipReason,
    > {
        let series = self
            .history
            .series(symbol)
            .await
            .map_err(|_| SkipReason::MissingData)?;
        let quote = self.auction.resolve(symbol, entry_date).await;
        let valuation = self
            .valuations
            .valuation(symbol, entry_date)
            .await
            .map_err(|_| SkipReason::ValuationUnavailable)?;
        Ok((series, quote, valuation))
    }
}

/// Ordered picks from the outcome list: strategy discovery order
/// first, candidate order within.
fn assemble_selections(outcomes: &[QualificationResult], entry_date: NaiveDate) -> Vec<Selection> {
    let mut selections = Vec::new();
    for strategy in [
        StrategyKind::HighOpen,
        StrategyKind::LowOpen,
        StrategyKind::WeakToStrong,
    ] {
        for outcome in outcomes {
            if outcome.strategy == strategy && outcome.verdict.is_qualified() {
                selections.push(Selection {
                    symbol: outcome.symbol.clone(),
                    strategy,
                    entry_date,
                });
            }
        }
    }
    selections
}

/// Drain a stream until it ends or the deadline passes. Finished items
/// are kept; the rest are cancelled by dropping the stream.
async fn collect_until<S, T>(stream: S, deadline: Option<tokio::time::Instant>) -> (Vec<T>, bool)
where
    S: futures::Stream<Item = T>,
{
    let mut stream = std::pin::pin!(stream);
    let mut out = Vec::new();

    let Some(deadline) = deadline else {
        while let Some(item) = stream.next().await {
            out.push(item);
        }
        return (out, false);
    };

    let sleep = tokio::time::sleep_until(deadline);
    let mut sleep = std::pin::pin!(sleep);
    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(item) => out.push(item),
                None => return (out, false),
            },
            _ = &mut sleep => return (out, true),
        }
    }
}
