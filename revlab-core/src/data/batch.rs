//! Batch fetch orchestration — bounded workers, shared rate limiting,
//! batch pacing, and a complete per-symbol outcome map.
//!
//! The universe is split into consecutive fixed-size batches. Within a
//! batch, up to `max_workers` threads pull symbols from a shared cursor,
//! each request gated by the shared [`RateLimiter`]. Batches run strictly
//! sequentially with a pause between them. A failed symbol never aborts
//! the batch; every symbol resolves to exactly one [`FetchOutcome`].

use super::provider::{
    DataProvider, FetchError, FetchOutcome, FetchProgress, FetchSummary,
};
use super::rate_limiter::{Backoff, RateLimiter, RetryPolicy};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Configuration for a batch-fetch run.
#[derive(Debug, Clone, Copy)]
pub struct FetchConfig {
    pub retry: RetryPolicy,
    /// Symbols per batch.
    pub batch_size: usize,
    /// Concurrent workers within a batch.
    pub max_workers: usize,
    /// Pause between consecutive batches.
    pub batch_delay: Duration,
    /// Optional wall-clock cutoff: in-flight requests finish, but no new
    /// symbol is dispatched after this instant.
    pub deadline: Option<Instant>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            batch_size: 3,
            max_workers: 3,
            batch_delay: Duration::from_secs_f64(5.0),
            deadline: None,
        }
    }
}

/// Split a universe into consecutive batches of `batch_size`.
///
/// Chunking is stable: the same universe ordering always yields the same
/// partition, which keeps fetch runs reproducible.
pub fn partition(symbols: &[String], batch_size: usize) -> Vec<&[String]> {
    assert!(batch_size >= 1, "batch_size must be >= 1");
    symbols.chunks(batch_size).collect()
}

/// Drives batched, rate-limited fetches against one provider.
pub struct BatchFetcher<'a> {
    provider: &'a dyn DataProvider,
    limiter: RateLimiter,
    config: FetchConfig,
}

impl<'a> BatchFetcher<'a> {
    pub fn new(provider: &'a dyn DataProvider, config: FetchConfig) -> Self {
        Self {
            provider,
            limiter: RateLimiter::new(config.retry.base_delay),
            config,
        }
    }

    /// Fetch every symbol in the universe, returning one outcome per symbol
    /// and a run summary. Symbols must be unique; ordering determines batch
    /// assignment.
    pub fn fetch_universe(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
        progress: &dyn FetchProgress,
    ) -> (BTreeMap<String, FetchOutcome>, FetchSummary) {
        let total = symbols.len();
        let collected: Mutex<BTreeMap<String, FetchOutcome>> = Mutex::new(BTreeMap::new());

        for (batch_index, batch) in partition(symbols, self.config.batch_size)
            .into_iter()
            .enumerate()
        {
            if batch_index > 0 && !self.deadline_passed() {
                std::thread::sleep(self.config.batch_delay);
            }

            let base_index = batch_index * self.config.batch_size;
            let cursor = AtomicUsize::new(0);
            let workers = self.config.max_workers.clamp(1, batch.len());

            std::thread::scope(|scope| {
                for _ in 0..workers {
                    scope.spawn(|| loop {
                        let i = cursor.fetch_add(1, Ordering::SeqCst);
                        if i >= batch.len() {
                            break;
                        }
                        let symbol = &batch[i];

                        let outcome = if self.deadline_passed() {
                            FetchOutcome::Failed(FetchError::NotAttempted(
                                "deadline elapsed before dispatch".into(),
                            ))
                        } else {
                            progress.on_start(symbol, base_index + i, total);
                            self.fetch_symbol(symbol, start, end, progress)
                        };

                        progress.on_complete(symbol, outcome.status());
                        collected
                            .lock()
                            .unwrap()
                            .insert(symbol.clone(), outcome);
                    });
                }
            });
        }

        let outcomes = collected.into_inner().unwrap();
        let summary = FetchSummary::from_outcomes(&outcomes);
        progress.on_finished(&summary);
        (outcomes, summary)
    }

    /// Fetch one symbol through the rate limiter, retrying rate-limit
    /// failures per the backoff schedule. Permanent errors fail immediately.
    fn fetch_symbol(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        progress: &dyn FetchProgress,
    ) -> FetchOutcome {
        let mut backoff = Backoff::new(self.config.retry);

        loop {
            self.limiter.acquire();
            match self.provider.fetch(symbol, start, end) {
                Ok(series) => return FetchOutcome::Ok(series),
                Err(err) if err.is_rate_limit() => match backoff.on_rate_limit() {
                    Some(delay) => {
                        progress.on_retry(symbol, backoff.attempts(), delay);
                        std::thread::sleep(delay);
                        backoff.resume();
                    }
                    None => {
                        return FetchOutcome::RateLimited(FetchError::RetriesExhausted {
                            attempts: backoff.attempts(),
                            last: err.to_string(),
                        })
                    }
                },
                Err(err) => return FetchOutcome::Failed(err),
            }
        }
    }

    fn deadline_passed(&self) -> bool {
        self.config
            .deadline
            .map(|d| Instant::now() >= d)
            .unwrap_or(false)
    }
}
