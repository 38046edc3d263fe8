//! Signal types produced by the signal engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Trading signal for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// One evaluated bar: rolling mean, price-to-mean ratio, and the resulting
/// signal. Emitted only once the rolling window is full — bars before the
/// fill produce no SignalPoint at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalPoint {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
    pub moving_average: f64,
    /// close / moving_average; NaN when either input is NaN.
    pub ratio: f64,
    pub signal: Signal,
}
