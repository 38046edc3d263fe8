//! RevLab Core — domain types, rate-limited fetch pipeline, signal engine,
//! and backtest engine for a mean-reversion strategy.
//!
//! This crate contains:
//! - Domain types (bars, price series, signal points, positions, trades)
//! - Data acquisition: DataProvider trait, shared RateLimiter with
//!   exponential backoff, batched bounded-concurrency fetching, HTTP and
//!   synthetic providers, CSV bar cache, universe config
//! - Signal engine: rolling mean, price/mean ratio, full-series percentile
//!   thresholds, Buy/Sell/Hold policy
//! - Backtest engine: Flat/Long state machine, slippage and cost model,
//!   equity curve, performance metrics, buy-and-hold comparison

pub mod data;
pub mod domain;
pub mod engine;
pub mod signals;
