//! Shared infrastructure for the limitup services.
//!
//! Provides the unified configuration file and structured logging setup
//! used by every binary in the workspace.

#![warn(clippy::all)]

pub mod config;
pub mod logging;

pub use config::Config;
