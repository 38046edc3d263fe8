//! PriceSeries — an ordered run of bars for one symbol.

use super::bar::Bar;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural defects that make a bar sequence unusable.
#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("series for '{symbol}' is empty")]
    Empty { symbol: String },

    #[error("series for '{symbol}' is out of order at index {index} ({prev} >= {next})")]
    OutOfOrder {
        symbol: String,
        index: usize,
        prev: chrono::NaiveDate,
        next: chrono::NaiveDate,
    },

    #[error("series for '{symbol}' mixes bars from '{other}'")]
    MixedSymbols { symbol: String, other: String },
}

/// Ordered OHLCV history for a single symbol, strictly ascending by date.
///
/// Construction validates the ordering invariant once; everything downstream
/// (signal engine, backtest engine) relies on it and never re-checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Build a series from bars, enforcing strict ascending dates and a
    /// single symbol. Duplicate dates are rejected, not deduplicated.
    pub fn new(symbol: impl Into<String>, bars: Vec<Bar>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(SeriesError::Empty { symbol });
        }
        for (i, bar) in bars.iter().enumerate() {
            if bar.symbol != symbol {
                return Err(SeriesError::MixedSymbols {
                    symbol,
                    other: bar.symbol.clone(),
                });
            }
            if i > 0 && bars[i - 1].date >= bar.date {
                return Err(SeriesError::OutOfOrder {
                    symbol,
                    index: i,
                    prev: bars[i - 1].date,
                    next: bar.date,
                });
            }
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Close prices in bar order (NaN for void bars).
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// The last bar with a non-NaN close, if any.
    pub fn last_valid_close(&self) -> Option<&Bar> {
        self.bars.iter().rev().find(|b| !b.close.is_nan())
    }
}
