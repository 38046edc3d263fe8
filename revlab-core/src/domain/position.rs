//! Position state tracked by the backtest engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which side of the market a position is on. There is no short side:
/// the engine is long-only and Flat is the only other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Flat,
}

/// An open position. At most one exists per symbol at any time (no
/// pyramiding); only the backtest engine mutates position state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub side: PositionSide,
    /// Execution price including slippage adjustment.
    pub entry_price: f64,
    pub entry_date: NaiveDate,
    /// Fraction of equity committed to the position.
    pub size_fraction: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == PositionSide::Long
    }
}
