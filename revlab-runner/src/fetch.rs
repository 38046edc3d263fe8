//! Series acquisition for the runner.
//!
//! Resolution order per symbol:
//! 1. Cached bars covering the requested range → use them.
//! 2. Provider available → batched, rate-limited download; cache on success.
//! 3. Otherwise the symbol is carried as a failure — never silently dropped.

use revlab_core::data::{
    BarCache, BatchFetcher, DataProvider, FetchConfig, FetchOutcome, FetchProgress,
    FetchStatus,
};
use revlab_core::domain::PriceSeries;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("no series could be acquired for any symbol")]
    NothingAcquired,
}

/// Options controlling acquisition.
#[derive(Debug, Clone, Copy)]
pub struct AcquireOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Skip the cache and always hit the provider.
    pub force: bool,
}

/// Where a symbol's series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSource {
    Cache,
    Provider,
}

/// Acquired series plus provenance and failure accounting.
#[derive(Debug)]
pub struct AcquiredData {
    pub series: BTreeMap<String, PriceSeries>,
    pub sources: BTreeMap<String, SeriesSource>,
    /// (symbol, reason) for every symbol that produced no series.
    pub failures: Vec<(String, String)>,
    /// BLAKE3 over all bars in sorted symbol order; stable across runs.
    pub dataset_hash: String,
}

/// Acquire series for every symbol, cache-first, then via the provider.
///
/// The returned `failures` list together with `series` covers the whole
/// universe: every symbol lands in exactly one of the two.
pub fn acquire_series(
    symbols: &[String],
    cache: &BarCache,
    provider: Option<&dyn DataProvider>,
    fetch_config: FetchConfig,
    opts: &AcquireOptions,
    progress: &dyn FetchProgress,
) -> Result<AcquiredData, AcquireError> {
    let mut series: BTreeMap<String, PriceSeries> = BTreeMap::new();
    let mut sources: BTreeMap<String, SeriesSource> = BTreeMap::new();
    let mut failures: Vec<(String, String)> = Vec::new();
    let mut to_fetch: Vec<String> = Vec::new();

    for symbol in symbols {
        if !opts.force && cache.covers_range(symbol, opts.start, opts.end) {
            match cache.load(symbol) {
                Ok(loaded) => {
                    series.insert(symbol.clone(), loaded);
                    sources.insert(symbol.clone(), SeriesSource::Cache);
                    continue;
                }
                Err(e) => {
                    // Meta said covered but the entry is unreadable; refetch.
                    if provider.is_none() {
                        failures.push((symbol.clone(), e.to_string()));
                        continue;
                    }
                }
            }
        }
        match provider {
            Some(_) => to_fetch.push(symbol.clone()),
            None => failures.push((
                symbol.clone(),
                "not cached and no provider available".into(),
            )),
        }
    }

    if let Some(provider) = provider {
        if !to_fetch.is_empty() {
            let fetcher = BatchFetcher::new(provider, fetch_config);
            let (outcomes, _summary) =
                fetcher.fetch_universe(&to_fetch, opts.start, opts.end, progress);

            for (symbol, outcome) in outcomes {
                match outcome {
                    FetchOutcome::Ok(fetched) => {
                        if let Err(e) = cache.write(&fetched) {
                            eprintln!("WARNING: cache write failed for {symbol}: {e}");
                        }
                        series.insert(symbol.clone(), fetched);
                        sources.insert(symbol, SeriesSource::Provider);
                    }
                    other => {
                        let status = match other.status() {
                            FetchStatus::RateLimited => "rate limited",
                            _ => "failed",
                        };
                        let reason = other
                            .error()
                            .map(|e| format!("{status}: {e}"))
                            .unwrap_or_else(|| status.to_string());
                        failures.push((symbol, reason));
                    }
                }
            }
        }
    }

    if series.is_empty() {
        return Err(AcquireError::NothingAcquired);
    }

    let dataset_hash = dataset_hash(&series);
    Ok(AcquiredData {
        series,
        sources,
        failures,
        dataset_hash,
    })
}

/// Deterministic BLAKE3 hash over all bar data in sorted symbol order.
fn dataset_hash(series: &BTreeMap<String, PriceSeries>) -> String {
    let mut hasher = blake3::Hasher::new();
    for (symbol, prices) in series {
        hasher.update(symbol.as_bytes());
        for bar in prices.bars() {
            hasher.update(bar.date.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
            hasher.update(&bar.volume.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use revlab_core::data::{NullProgress, SyntheticProvider};
    use revlab_core::domain::{Bar, PriceSeries};
    use tempfile::TempDir;

    fn make_series(symbol: &str, closes: &[f64]) -> PriceSeries {
        let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: symbol.to_string(),
                date: base + chrono::Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000,
            })
            .collect();
        PriceSeries::new(symbol, bars).unwrap()
    }

    fn opts() -> AcquireOptions {
        AcquireOptions {
            start: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 1, 4).unwrap(),
            force: false,
        }
    }

    fn fast_fetch_config() -> FetchConfig {
        FetchConfig {
            retry: revlab_core::data::RetryPolicy {
                base_delay: std::time::Duration::from_millis(1),
                max_retries: 1,
                backoff_factor: 2.0,
                jitter: false,
            },
            batch_size: 8,
            max_workers: 2,
            batch_delay: std::time::Duration::from_millis(1),
            deadline: None,
        }
    }

    #[test]
    fn cached_symbols_load_without_provider() {
        let dir = TempDir::new().unwrap();
        let cache = BarCache::new(dir.path());
        cache.write(&make_series("TCS", &[100.0, 101.0, 102.0])).unwrap();

        let acquired = acquire_series(
            &["TCS".to_string()],
            &cache,
            None,
            fast_fetch_config(),
            &opts(),
            &NullProgress,
        )
        .unwrap();

        assert_eq!(acquired.series.len(), 1);
        assert_eq!(acquired.sources["TCS"], SeriesSource::Cache);
        assert!(acquired.failures.is_empty());
    }

    #[test]
    fn uncached_symbol_without_provider_is_a_failure() {
        let dir = TempDir::new().unwrap();
        let cache = BarCache::new(dir.path());
        cache.write(&make_series("TCS", &[100.0, 101.0, 102.0])).unwrap();

        let acquired = acquire_series(
            &["TCS".to_string(), "INFY".to_string()],
            &cache,
            None,
            fast_fetch_config(),
            &opts(),
            &NullProgress,
        )
        .unwrap();

        assert_eq!(acquired.series.len(), 1);
        assert_eq!(acquired.failures.len(), 1);
        assert_eq!(acquired.failures[0].0, "INFY");
    }

    #[test]
    fn provider_fetch_populates_cache() {
        let dir = TempDir::new().unwrap();
        let cache = BarCache::new(dir.path());
        let provider = SyntheticProvider;

        let acquired = acquire_series(
            &["RELIANCE".to_string()],
            &cache,
            Some(&provider),
            fast_fetch_config(),
            &AcquireOptions {
                start: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
                end: NaiveDate::from_ymd_opt(2023, 3, 31).unwrap(),
                force: false,
            },
            &NullProgress,
        )
        .unwrap();

        assert_eq!(acquired.sources["RELIANCE"], SeriesSource::Provider);
        // The fetched series is now cached.
        assert!(cache.load("RELIANCE").is_ok());
    }

    #[test]
    fn nothing_acquired_is_an_error() {
        let dir = TempDir::new().unwrap();
        let cache = BarCache::new(dir.path());

        let result = acquire_series(
            &["TCS".to_string()],
            &cache,
            None,
            fast_fetch_config(),
            &opts(),
            &NullProgress,
        );
        assert!(matches!(result, Err(AcquireError::NothingAcquired)));
    }

    #[test]
    fn dataset_hash_is_stable() {
        let dir = TempDir::new().unwrap();
        let cache = BarCache::new(dir.path());
        cache.write(&make_series("TCS", &[100.0, 101.0, 102.0])).unwrap();

        let a = acquire_series(
            &["TCS".to_string()],
            &cache,
            None,
            fast_fetch_config(),
            &opts(),
            &NullProgress,
        )
        .unwrap();
        let b = acquire_series(
            &["TCS".to_string()],
            &cache,
            None,
            fast_fetch_config(),
            &opts(),
            &NullProgress,
        )
        .unwrap();
        assert_eq!(a.dataset_hash, b.dataset_hash);
    }
}
