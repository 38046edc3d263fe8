//! Trade — a completed round trip, created when a position closes.

use super::position::PositionSide;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// A reversal (Sell) signal closed the position.
    Signal,
    /// End of data forced the close — a synthetic exit at the final bar.
    EndOfData,
}

/// A completed round-trip trade. Immutable once created; the per-symbol
/// trade log is append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub side: PositionSide,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    /// Entry price including slippage adjustment.
    pub entry_price: f64,
    /// Exit price including slippage adjustment.
    pub exit_price: f64,
    /// Round-trip return net of slippage (in prices) and transaction costs.
    pub pnl_pct: f64,
    /// Round-trip transaction cost fraction charged (entry + exit).
    pub costs: f64,
    pub bars_held: usize,
    pub exit: ExitReason,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.pnl_pct > 0.0
    }
}
