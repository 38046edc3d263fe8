//! Synthetic data provider.
//!
//! Generates a deterministic geometric random walk per symbol, with a
//! mean-reversion pull injected whenever price strays more than 10% from
//! its trailing 21-bar mean. Weekday dates only. Seeded by blake3 of the
//! symbol name, so the same symbol always produces the same series.

use super::provider::{DataProvider, FetchError};
use crate::domain::{Bar, PriceSeries};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Daily drift of the walk (~5% annual).
const DRIFT: f64 = 0.0002;
/// Daily volatility of the walk (~32% annual).
const VOLATILITY: f64 = 0.02;
/// Window of the trailing mean the reversion pull references.
const REVERSION_WINDOW: usize = 21;

/// Starting prices for familiar symbols; everything else gets a
/// seeded random price in a plausible range.
fn base_price(symbol: &str, rng: &mut StdRng) -> f64 {
    match symbol {
        "RELIANCE" => 2500.0,
        "TCS" => 3500.0,
        "HDFCBANK" => 1600.0,
        "INFY" => 1400.0,
        "ICICIBANK" => 950.0,
        "HINDUNILVR" => 2600.0,
        "ITC" => 450.0,
        "SBIN" => 600.0,
        "BHARTIARTL" => 850.0,
        "AXISBANK" => 1100.0,
        _ => rng.gen_range(100.0..5000.0),
    }
}

/// Deterministic synthetic OHLCV source for demo and test modes.
pub struct SyntheticProvider;

impl SyntheticProvider {
    /// Generate bars for one symbol over the date range (weekdays only).
    pub fn generate(symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<Bar> {
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let mut close = base_price(symbol, &mut rng);
        let mut closes: Vec<f64> = Vec::new();
        let mut bars: Vec<Bar> = Vec::new();
        let mut date = start;

        while date <= end {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                date += chrono::Duration::days(1);
                continue;
            }

            let log_return = DRIFT + VOLATILITY * rng.gen_range(-1.0..1.0);
            close *= log_return.exp();

            // Pull the walk back toward its trailing mean when it strays.
            if closes.len() >= REVERSION_WINDOW {
                let mean: f64 = closes[closes.len() - REVERSION_WINDOW..]
                    .iter()
                    .sum::<f64>()
                    / REVERSION_WINDOW as f64;
                let ratio = close / mean;
                if ratio > 1.1 {
                    close *= rng.gen_range(0.995..0.999);
                } else if ratio < 0.9 {
                    close *= rng.gen_range(1.001..1.005);
                }
            }

            let open = match bars.last() {
                Some(prev) => prev.close * rng.gen_range(0.998..1.002),
                None => close * rng.gen_range(0.995..1.005),
            };
            let intraday = rng.gen_range(0.005..0.025);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..intraday));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..intraday));
            let volume = (rng.gen_range(100_000.0..2_000_000.0)
                * rng.gen_range(0.5..2.0)) as u64;

            bars.push(Bar {
                symbol: symbol.to_string(),
                date,
                open,
                high: high.max(open).max(close),
                low: low.min(open).min(close),
                close,
                volume,
            });
            closes.push(close);
            date += chrono::Duration::days(1);
        }

        bars
    }
}

impl DataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError> {
        let bars = Self::generate(symbol, start, end);
        if bars.is_empty() {
            return Err(FetchError::BadData(format!(
                "no weekdays in range {start}..={end} for {symbol}"
            )));
        }
        PriceSeries::new(symbol, bars).map_err(|e| FetchError::BadData(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
        )
    }

    #[test]
    fn generation_is_deterministic() {
        let (start, end) = range();
        let a = SyntheticProvider::generate("RELIANCE", start, end);
        let b = SyntheticProvider::generate("RELIANCE", start, end);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.date, y.date);
            assert_eq!(x.close, y.close);
            assert_eq!(x.volume, y.volume);
        }
    }

    #[test]
    fn different_symbols_diverge() {
        let (start, end) = range();
        let a = SyntheticProvider::generate("RELIANCE", start, end);
        let b = SyntheticProvider::generate("TCS", start, end);
        assert_ne!(a[0].close, b[0].close);
    }

    #[test]
    fn bars_are_weekdays_only_and_sane() {
        let (start, end) = range();
        let bars = SyntheticProvider::generate("INFY", start, end);
        assert!(!bars.is_empty());
        for bar in &bars {
            assert!(!matches!(bar.date.weekday(), Weekday::Sat | Weekday::Sun));
            assert!(bar.is_sane(), "insane bar: {bar:?}");
        }
    }

    #[test]
    fn fetch_returns_valid_series() {
        let (start, end) = range();
        let series = SyntheticProvider.fetch("SBIN", start, end).unwrap();
        assert!(series.len() > 100);
        assert_eq!(series.symbol(), "SBIN");
    }

    #[test]
    fn empty_weekday_range_is_error() {
        // A Saturday-Sunday range contains no weekdays.
        let start = NaiveDate::from_ymd_opt(2023, 1, 7).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 1, 8).unwrap();
        let err = SyntheticProvider.fetch("SBIN", start, end).unwrap_err();
        assert!(matches!(err, FetchError::BadData(_)));
    }
}
