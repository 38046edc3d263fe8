//! Data provider trait, fetch error taxonomy, and progress observation.
//!
//! The DataProvider trait abstracts over series sources (live HTTP endpoint,
//! synthetic generator) so the signal and backtest engines never know where
//! bars came from. Modes differ only in which implementation is wired in.

use crate::domain::PriceSeries;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

/// Structured fetch errors.
///
/// Only `RateLimited` is transient (retried with backoff); every other
/// variant is permanent for the requesting symbol and fails it immediately.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limited by provider: {0}")]
    RateLimited(String),

    #[error("rate limit retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed provider response: {0}")]
    InvalidResponse(String),

    #[error("provider error {code}: {message}")]
    Upstream { code: String, message: String },

    #[error("invalid series data: {0}")]
    BadData(String),

    #[error("not attempted: {0}")]
    NotAttempted(String),
}

impl FetchError {
    /// True for the transient rate-limit class that gets retried with backoff.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, FetchError::RateLimited(_))
    }
}

/// Status of one symbol's fetch after all retries resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Ok,
    RateLimited,
    Failed,
}

/// Final outcome for one symbol. The batch fetcher produces exactly one
/// per symbol in the universe; nothing is silently dropped.
#[derive(Debug)]
pub enum FetchOutcome {
    Ok(PriceSeries),
    /// Rate-limit retries were exhausted.
    RateLimited(FetchError),
    /// Permanent failure (bad symbol, auth, network, deadline).
    Failed(FetchError),
}

impl FetchOutcome {
    pub fn status(&self) -> FetchStatus {
        match self {
            FetchOutcome::Ok(_) => FetchStatus::Ok,
            FetchOutcome::RateLimited(_) => FetchStatus::RateLimited,
            FetchOutcome::Failed(_) => FetchStatus::Failed,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, FetchOutcome::Ok(_))
    }

    pub fn series(&self) -> Option<&PriceSeries> {
        match self {
            FetchOutcome::Ok(series) => Some(series),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchOutcome::Ok(_) => None,
            FetchOutcome::RateLimited(e) | FetchOutcome::Failed(e) => Some(e),
        }
    }
}

/// Aggregate tally of a batch-fetch run.
#[derive(Debug)]
pub struct FetchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub rate_limited: usize,
    pub failed: usize,
    /// (symbol, reason) for every non-Ok outcome.
    pub errors: Vec<(String, String)>,
}

impl FetchSummary {
    pub fn from_outcomes(outcomes: &BTreeMap<String, FetchOutcome>) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            succeeded: 0,
            rate_limited: 0,
            failed: 0,
            errors: Vec::new(),
        };
        for (symbol, outcome) in outcomes {
            match outcome.status() {
                FetchStatus::Ok => summary.succeeded += 1,
                FetchStatus::RateLimited => summary.rate_limited += 1,
                FetchStatus::Failed => summary.failed += 1,
            }
            if let Some(err) = outcome.error() {
                summary.errors.push((symbol.clone(), err.to_string()));
            }
        }
        summary
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }
}

/// Trait for series sources (live HTTP provider, synthetic generator).
///
/// Implementations handle the specifics of one source. Rate limiting and
/// retries sit above this trait in the batch fetcher — providers just
/// classify and return errors.
pub trait DataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily OHLCV bars for a symbol over a date range (inclusive).
    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError>;
}

/// Progress callbacks for multi-symbol fetch operations.
pub trait FetchProgress: Sync {
    /// Called when a symbol's fetch is dispatched.
    fn on_start(&self, _symbol: &str, _index: usize, _total: usize) {}

    /// Called before sleeping out a rate-limit backoff.
    fn on_retry(&self, _symbol: &str, _attempt: u32, _delay: std::time::Duration) {}

    /// Called when a symbol's fetch resolves.
    fn on_complete(&self, _symbol: &str, _status: FetchStatus) {}

    /// Called once after the final batch.
    fn on_finished(&self, _summary: &FetchSummary) {}
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl FetchProgress for StdoutProgress {
    fn on_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {symbol}...", index + 1, total);
    }

    fn on_retry(&self, symbol: &str, attempt: u32, delay: std::time::Duration) {
        println!(
            "  rate limited: {symbol}, retry {attempt} in {:.1}s",
            delay.as_secs_f64()
        );
    }

    fn on_complete(&self, symbol: &str, status: FetchStatus) {
        match status {
            FetchStatus::Ok => println!("  OK: {symbol}"),
            FetchStatus::RateLimited => println!("  RATE LIMITED: {symbol} (gave up)"),
            FetchStatus::Failed => println!("  FAIL: {symbol}"),
        }
    }

    fn on_finished(&self, summary: &FetchSummary) {
        println!(
            "\nFetch complete: {}/{} succeeded, {} rate limited, {} failed",
            summary.succeeded, summary.total, summary.rate_limited, summary.failed
        );
    }
}

/// No-op progress reporter for library callers and tests.
pub struct NullProgress;

impl FetchProgress for NullProgress {}
