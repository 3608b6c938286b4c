//! Local market data storage using SQLite.
//!
//! Provides persistent storage for:
//! - Daily bar data
//! - Intraday minute bars around the open
//! - Instrument metadata
//! - Valuation metrics
//!
//! Enables offline selection runs and keeps the engine replayable for
//! past sessions.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{DailyBar, InstrumentMeta, Valuation};

// ============================================================================
// Database Schema
// ============================================================================

const CREATE_TABLES_SQL: &str = r#"
-- Daily bar table
CREATE TABLE IF NOT EXISTS daily_bars (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    date TEXT NOT NULL,
    open REAL NOT NULL,
    high REAL NOT NULL,
    low REAL NOT NULL,
    close REAL NOT NULL,
    volume REAL NOT NULL,
    amount REAL DEFAULT 0,
    pct_change REAL,
    source TEXT NOT NULL,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(symbol, date)
);

CREATE INDEX IF NOT EXISTS idx_daily_bars_symbol_date
ON daily_bars(symbol, date DESC);

CREATE INDEX IF NOT EXISTS idx_daily_bars_date
ON daily_bars(date);

-- Minute bar table, only the opening minutes are kept
CREATE TABLE IF NOT EXISTS minute_bars (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    date TEXT NOT NULL,
    minute TEXT NOT NULL,
    price REAL NOT NULL,
    volume REAL NOT NULL,
    source TEXT NOT NULL,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(symbol, date, minute)
);

CREATE INDEX IF NOT EXISTS idx_minute_bars_symbol_date
ON minute_bars(symbol, date, minute);

-- Instrument metadata table
CREATE TABLE IF NOT EXISTS instruments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    name TEXT NOT NULL,
    list_date TEXT,
    is_suspended INTEGER DEFAULT 0,
    source TEXT NOT NULL,
    updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(symbol)
);

-- Valuation metrics table
CREATE TABLE IF NOT EXISTS valuations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL,
    date TEXT NOT NULL,
    market_cap REAL NOT NULL,
    float_market_cap REAL NOT NULL,
    turnover_ratio REAL,
    source TEXT NOT NULL,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(symbol, date)
);

CREATE INDEX IF NOT EXISTS idx_valuations_symbol_date
ON valuations(symbol, date DESC);
"#;

// ============================================================================
// Local Store
// ============================================================================

/// Local SQLite storage for market data
pub struct LocalStore {
    /// SQLite connection wrapped in Mutex for thread safety
    /// Note: We use Mutex instead of RwLock because rusqlite::Connection
    /// is Send but not Sync, and Mutex<T> is Sync when T: Send
    db: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl LocalStore {
    /// Open (or create) the database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)
            .context("Failed to open local market database")?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .context("Failed to set database pragmas")?;

        conn.execute_batch(CREATE_TABLES_SQL)
            .context("Failed to create database tables")?;

        info!(db_path = %db_path.display(), "Initialized local market store");

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    // ========================================================================
    // Daily Bar Operations
    // ========================================================================

    /// Get daily bars for a symbol in chronological order, newest `limit`
    /// when a limit is given.
    pub async fn get_daily_bars(
        &self,
        symbol: &str,
        limit: Option<usize>,
    ) -> Result<Vec<DailyBar>> {
        let db = self.db.lock().await;

        let mut sql = String::from(
            "SELECT date, open, high, low, close, volume, amount, pct_change
             FROM daily_bars WHERE symbol = ?1 ORDER BY date DESC",
        );
        if let Some(lim) = limit {
            sql.push_str(&format!(" LIMIT {}", lim));
        }

        let mut stmt = db.prepare(&sql)?;
        let rows = stmt.query_map(params![symbol], Self::row_to_bar)?;

        let mut bars: Vec<DailyBar> = rows.filter_map(|r| r.ok()).collect();
        bars.reverse(); // Return in chronological order
        Ok(bars)
    }

    fn row_to_bar(row: &rusqlite::Row) -> rusqlite::Result<DailyBar> {
        let date_str: String = row.get(0)?;
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| chrono::Local::now().date_naive());

        Ok(DailyBar {
            date,
            open: row.get(1)?,
            high: row.get(2)?,
            low: row.get(3)?,
            close: row.get(4)?,
            volume: row.get(5)?,
            amount: row.get(6)?,
            pct_change: row.get(7)?,
        })
    }

    /// Save daily bars for a symbol. Existing rows for the same date are
    /// replaced.
    pub async fn save_daily_bars(
        &self,
        symbol: &str,
        bars: &[DailyBar],
        source: &str,
    ) -> Result<usize> {
        if bars.is_empty() {
            return Ok(0);
        }

        let db = self.db.lock().await;

        let mut count = 0;
        for bar in bars {
            let result = db.execute(
                r#"
                INSERT OR REPLACE INTO daily_bars
                (symbol, date, open, high, low, close, volume, amount, pct_change, source)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    symbol,
                    bar.date.to_string(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume,
                    bar.amount,
                    bar.pct_change,
                    source,
                ],
            );

            if result.is_ok() {
                count += 1;
            }
        }

        debug!(symbol, count, "Saved daily bars to local store");
        Ok(count)
    }

    /// All distinct session dates observed in daily bars, ascending.
    /// Feeds the trading calendar.
    pub async fn observed_dates(&self) -> Result<Vec<NaiveDate>> {
        let db = self.db.lock().await;

        let mut stmt = db.prepare("SELECT DISTINCT date FROM daily_bars ORDER BY date")?;
        let rows = stmt.query_map([], |row| {
            let s: String = row.get(0)?;
            Ok(s)
        })?;

        let mut dates = Vec::new();
        for row in rows {
            if let Ok(s) = row {
                if let Ok(d) = NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
                    dates.push(d);
                }
            }
        }
        Ok(dates)
    }

    /// Symbols with at least one daily bar.
    pub async fn symbols_with_bars(&self) -> Result<Vec<String>> {
        let db = self.db.lock().await;

        let mut stmt = db.prepare("SELECT DISTINCT symbol FROM daily_bars ORDER BY symbol")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ========================================================================
    // Minute Bar Operations
    // ========================================================================

    /// Save opening minute bars for a symbol and session.
    pub async fn save_minute_bars(
        &self,
        symbol: &str,
        date: NaiveDate,
        bars: &[(NaiveTime, f64, f64)],
        source: &str,
    ) -> Result<usize> {
        if bars.is_empty() {
            return Ok(0);
        }

        let db = self.db.lock().await;

        let mut count = 0;
        for (minute, price, volume) in bars {
            let result = db.execute(
                r#"
                INSERT OR REPLACE INTO minute_bars
                (symbol, date, minute, price, volume, source)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    symbol,
                    date.to_string(),
                    minute.format("%H:%M").to_string(),
                    price,
                    volume,
                    source,
                ],
            );

            if result.is_ok() {
                count += 1;
            }
        }

        debug!(symbol, %date, count, "Saved minute bars to local store");
        Ok(count)
    }

    /// Earliest minute bar of a session at or after 09:30, if stored.
    /// Returns (price, volume).
    pub async fn first_minute_bar(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<(f64, f64)>> {
        let db = self.db.lock().await;

        let result = db.query_row(
            "SELECT price, volume FROM minute_bars
             WHERE symbol = ?1 AND date = ?2 AND minute >= '09:30'
             ORDER BY minute ASC LIMIT 1",
            params![symbol, date.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        );

        match result {
            Ok(data) => Ok(Some(data)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Instrument Operations
    // ========================================================================

    /// Save the instrument list. Existing rows are replaced.
    pub async fn save_instruments(
        &self,
        instruments: &[InstrumentMeta],
        source: &str,
    ) -> Result<usize> {
        if instruments.is_empty() {
            return Ok(0);
        }

        let db = self.db.lock().await;
        let mut count = 0;

        for meta in instruments {
            let result = db.execute(
                r#"
                INSERT OR REPLACE INTO instruments
                (symbol, name, list_date, is_suspended, source)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    meta.symbol,
                    meta.name,
                    meta.list_date.map(|d| d.to_string()),
                    if meta.suspended { 1 } else { 0 },
                    source,
                ],
            );

            if result.is_ok() {
                count += 1;
            }
        }

        debug!(count, "Saved instrument list to local store");
        Ok(count)
    }

    /// Get all instruments.
    pub async fn get_instruments(&self) -> Result<Vec<InstrumentMeta>> {
        let db = self.db.lock().await;

        let mut stmt = db.prepare(
            "SELECT symbol, name, list_date, is_suspended FROM instruments ORDER BY symbol",
        )?;

        let rows = stmt.query_map([], |row| {
            let list_date_str: Option<String> = row.get(2)?;
            let list_date =
                list_date_str.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok());

            Ok(InstrumentMeta {
                symbol: row.get(0)?,
                name: row.get(1)?,
                list_date,
                suspended: row.get::<_, i32>(3)? != 0,
            })
        })?;

        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ========================================================================
    // Valuation Operations
    // ========================================================================

    /// Save valuation metrics for a symbol and date.
    pub async fn save_valuation(
        &self,
        symbol: &str,
        date: NaiveDate,
        valuation: &Valuation,
        source: &str,
    ) -> Result<()> {
        let db = self.db.lock().await;

        db.execute(
            r#"
            INSERT OR REPLACE INTO valuations
            (symbol, date, market_cap, float_market_cap, turnover_ratio, source)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                symbol,
                date.to_string(),
                valuation.market_cap,
                valuation.float_market_cap,
                valuation.turnover_ratio,
                source,
            ],
        )?;

        debug!(symbol, %date, "Saved valuation metrics to local store");
        Ok(())
    }

    /// Most recent valuation metrics at or before `date`.
    pub async fn get_valuation(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<Valuation>> {
        let db = self.db.lock().await;

        let result = db.query_row(
            "SELECT market_cap, float_market_cap, turnover_ratio FROM valuations
             WHERE symbol = ?1 AND date <= ?2 ORDER BY date DESC LIMIT 1",
            params![symbol, date.to_string()],
            |row| {
                Ok(Valuation {
                    market_cap: row.get(0)?,
                    float_market_cap: row.get(1)?,
                    turnover_ratio: row.get(2)?,
                })
            },
        );

        match result {
            Ok(data) => Ok(Some(data)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn bar(date: &str, close: f64) -> DailyBar {
        DailyBar {
            date: d(date),
            open: close - 0.1,
            high: close + 0.1,
            low: close - 0.2,
            close,
            volume: 1_000_000.0,
            amount: close * 1_000_000.0,
            pct_change: Some(1.0),
        }
    }

    fn open_temp() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(&dir.path().join("market.db")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_daily_bar_roundtrip() {
        let (_dir, store) = open_temp();
        let bars = vec![bar("2026-01-06", 9.0), bar("2026-01-07", 9.5)];
        let saved = store.save_daily_bars("600000", &bars, "test").await.unwrap();
        assert_eq!(saved, 2);

        let loaded = store.get_daily_bars("600000", None).await.unwrap();
        assert_eq!(loaded.len(), 2);
        // Chronological order
        assert_eq!(loaded[0].date, d("2026-01-06"));
        assert_eq!(loaded[1].close, 9.5);
    }

    #[tokio::test]
    async fn test_replace_on_duplicate_date() {
        let (_dir, store) = open_temp();
        store
            .save_daily_bars("600000", &[bar("2026-01-06", 9.0)], "test")
            .await
            .unwrap();
        store
            .save_daily_bars("600000", &[bar("2026-01-06", 9.2)], "test")
            .await
            .unwrap();

        let loaded = store.get_daily_bars("600000", None).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].close, 9.2);
    }

    #[tokio::test]
    async fn test_observed_dates_union_across_symbols() {
        let (_dir, store) = open_temp();
        store
            .save_daily_bars("600000", &[bar("2026-01-06", 9.0)], "test")
            .await
            .unwrap();
        store
            .save_daily_bars("000001", &[bar("2026-01-07", 12.0)], "test")
            .await
            .unwrap();

        let dates = store.observed_dates().await.unwrap();
        assert_eq!(dates, vec![d("2026-01-06"), d("2026-01-07")]);
    }

    #[tokio::test]
    async fn test_first_minute_bar_skips_auction_rows() {
        let (_dir, store) = open_temp();
        let t = |s: &str| NaiveTime::parse_from_str(s, "%H:%M").unwrap();
        store
            .save_minute_bars(
                "600000",
                d("2026-01-07"),
                &[
                    (t("09:25"), 9.9, 100.0),
                    (t("09:30"), 10.0, 5000.0),
                    (t("09:31"), 10.1, 3000.0),
                ],
                "test",
            )
            .await
            .unwrap();

        let first = store.first_minute_bar("600000", d("2026-01-07")).await.unwrap();
        assert_eq!(first, Some((10.0, 5000.0)));
    }

    #[tokio::test]
    async fn test_valuation_as_of_lookup() {
        let (_dir, store) = open_temp();
        let v1 = Valuation { market_cap: 80e8, float_market_cap: 60e8, turnover_ratio: Some(3.2) };
        let v2 = Valuation { market_cap: 90e8, float_market_cap: 70e8, turnover_ratio: None };
        store.save_valuation("600000", d("2026-01-05"), &v1, "test").await.unwrap();
        store.save_valuation("600000", d("2026-01-07"), &v2, "test").await.unwrap();

        // As-of between the two rows resolves to the earlier one
        let got = store.get_valuation("600000", d("2026-01-06")).await.unwrap();
        assert_eq!(got, Some(v1));
        assert_eq!(
            store.get_valuation("600000", d("2026-01-04")).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_instrument_roundtrip() {
        let (_dir, store) = open_temp();
        let metas = vec![InstrumentMeta {
            symbol: "600000".into(),
            name: "浦发银行".into(),
            list_date: Some(d("1999-11-10")),
            suspended: false,
        }];
        store.save_instruments(&metas, "test").await.unwrap();
        let loaded = store.get_instruments().await.unwrap();
        assert_eq!(loaded, metas);
    }
}
