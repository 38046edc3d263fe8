//! Mean-reversion signal engine.
//!
//! For each bar once the rolling window is full: moving average of closes,
//! price-to-average ratio, then a Buy/Sell/Hold decision against percentile
//! thresholds computed over the symbol's entire ratio sequence.
//!
//! The full-series thresholding looks ahead by construction. That is the
//! documented behavior of this strategy and is preserved exactly; do not
//! replace it with a rolling percentile.

pub mod percentile;
pub mod sma;

pub use percentile::percentile;
pub use sma::rolling_mean;

use crate::domain::{PriceSeries, Signal, SignalPoint};
use serde::{Deserialize, Serialize};

/// Signal engine parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SignalParams {
    /// Rolling window for the moving average.
    pub window: usize,
    /// Percentile below which the ratio triggers Buy.
    pub lower_pct: f64,
    /// Percentile above which the ratio triggers Sell.
    pub upper_pct: f64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            window: 21,
            lower_pct: 5.0,
            upper_pct: 95.0,
        }
    }
}

/// Compute the signal sequence for one symbol.
///
/// Emits exactly `len - window + 1` points for a series of `len >= window`
/// bars, and nothing for a shorter series. NaN closes (or NaN windows)
/// produce Hold and are excluded from the percentile computation.
/// The function is pure: identical input always yields identical output.
pub fn compute_signals(series: &PriceSeries, params: &SignalParams) -> Vec<SignalPoint> {
    assert!(params.window >= 1, "window must be >= 1");
    assert!(
        params.lower_pct < params.upper_pct,
        "lower_pct must be below upper_pct"
    );

    let bars = series.bars();
    let n = bars.len();
    if n < params.window {
        return Vec::new();
    }

    let closes = series.closes();
    let means = rolling_mean(&closes, params.window);

    // Ratio per emitted bar; NaN where close or mean is NaN.
    let first = params.window - 1;
    let ratios: Vec<f64> = (first..n)
        .map(|i| {
            let close = closes[i];
            let mean = means[i];
            if close.is_nan() || mean.is_nan() {
                f64::NAN
            } else {
                close / mean
            }
        })
        .collect();

    let lower = percentile(&ratios, params.lower_pct);
    let upper = percentile(&ratios, params.upper_pct);

    ratios
        .iter()
        .enumerate()
        .map(|(j, &ratio)| {
            let i = first + j;
            let signal = match (lower, upper) {
                (Some(lo), Some(hi)) if !ratio.is_nan() => {
                    if ratio > hi {
                        Signal::Sell
                    } else if ratio < lo {
                        Signal::Buy
                    } else {
                        Signal::Hold
                    }
                }
                // NaN ratio, or no finite ratios at all: never trade blind.
                _ => Signal::Hold,
            };
            SignalPoint {
                symbol: series.symbol().to_string(),
                date: bars[i].date,
                close: closes[i],
                moving_average: means[i],
                ratio,
                signal,
            }
        })
        .collect()
}
