//! RevLab Runner — portfolio orchestration on top of `revlab-core`.
//!
//! This crate provides:
//! - TOML run configuration with the documented defaults
//! - Series acquisition (cache-first, then the batch fetch pipeline)
//! - Parallel per-symbol backtests
//! - Portfolio aggregation, rankings, and the text report
//! - Artifact export (summary.json, trades.csv, equity.csv)

pub mod config;
pub mod export;
pub mod fetch;
pub mod report;
pub mod runner;

pub use config::{ConfigError, RunConfig};
pub use export::save_artifacts;
pub use fetch::{acquire_series, AcquireError, AcquireOptions, AcquiredData, SeriesSource};
pub use report::{aggregate, render_text, PortfolioSummary, RankedSymbol};
pub use runner::{run_portfolio, PortfolioRun, SkippedSymbol, SymbolReport};
