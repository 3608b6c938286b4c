//! Limitup Selector Library
//!
//! Daily A-share limit-up candidate classification and selection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     limitup-selector                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐  ┌──────────────┐  ┌───────────────────┐     │
//! │  │  Market    │  │  Pool        │  │  Strategy         │     │
//! │  │  Data      │─▶│  Classifier  │─▶│  Evaluators       │     │
//! │  │  (SQLite)  │  │  + Detector  │  │  (high/low/w2s)   │     │
//! │  └────────────┘  └──────────────┘  └───────────────────┘     │
//! │         │                 │                  │               │
//! │         └───────── Selection Orchestrator ───┘               │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Limit-up pools
//! - **LIMIT_UP_CLOSED**: sealed the daily band into the close
//! - **LIMIT_UP_NOT_CLOSED**: touched the band intraday, broke open
//! - **First board**: sealed yesterday, did not seal the day before
//!
//! ## Strategies
//! - **High open**: first board gapping up 0-6% on real auction volume
//! - **Low open**: first board gapping down 3-4.5% low in its range
//! - **Weak to strong**: broken board opening firm the next morning
//!
//! ## Call auction
//! - [09:25, 09:30) price discovery; quotes resolve through live tick,
//!   minute bar, then daily open, first tier that answers wins

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod calendar;
pub mod data;
pub mod error;
pub mod pool;
pub mod selection;
pub mod strategy;

pub use calendar::TradingCalendar;
pub use selection::{Selection, SelectionEngine, SelectionReport};
