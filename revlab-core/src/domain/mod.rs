//! Domain types: bars, series, signals, positions, trades.

pub mod bar;
pub mod position;
pub mod series;
pub mod signal;
pub mod trade;

pub use bar::Bar;
pub use position::{Position, PositionSide};
pub use series::{PriceSeries, SeriesError};
pub use signal::{Signal, SignalPoint};
pub use trade::{ExitReason, Trade};

/// Build a PriceSeries from close prices for tests.
///
/// Generates plausible OHLV around each close: open = prev close,
/// high/low bound open and close, volume fixed. Dates are consecutive
/// calendar days from 2024-01-02.
#[cfg(test)]
pub mod test_support {
    use super::{Bar, PriceSeries};
    use chrono::NaiveDate;

    pub fn make_bars(symbol: &str, closes: &[f64]) -> Vec<Bar> {
        let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                Bar {
                    symbol: symbol.to_string(),
                    date: base_date + chrono::Duration::days(i as i64),
                    open,
                    high: open.max(close) + 1.0,
                    low: open.min(close) - 1.0,
                    close,
                    volume: 1000,
                }
            })
            .collect()
    }

    pub fn make_series(symbol: &str, closes: &[f64]) -> PriceSeries {
        PriceSeries::new(symbol, make_bars(symbol, closes)).unwrap()
    }

    pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
        assert!(
            (actual - expected).abs() < epsilon,
            "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
            (actual - expected).abs()
        );
    }

    pub const DEFAULT_EPSILON: f64 = 1e-10;
}
