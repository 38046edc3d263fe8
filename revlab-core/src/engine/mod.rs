//! Backtest engine — replays a signal sequence into positions, trades,
//! an equity curve, and performance metrics.
//!
//! Fill policy: orders execute at the close of the signal bar (the bar the
//! signal was computed on), adjusted for slippage. This is the one fill
//! timing used everywhere; there is no next-bar-open variant.
//!
//! Friction: entering or exiting charges the equity a multiplicative
//! haircut of `size_fraction * (slippage_rate + cost_rate)`, and trade
//! entry/exit prices carry the slippage adjustment, so a flat price series
//! loses exactly its compounded friction and nothing else.

pub mod metrics;

pub use metrics::Metrics;

use crate::domain::{
    ExitReason, Position, PositionSide, PriceSeries, Signal, SignalPoint, Trade,
};
use serde::{Deserialize, Serialize};

/// Execution model parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExecutionParams {
    /// Fraction of equity committed per position.
    pub position_size_fraction: f64,
    /// Adverse price movement applied to every fill.
    pub slippage_rate: f64,
    /// Transaction cost per side, as a fraction of notional.
    pub cost_rate: f64,
    /// Bars per year used for annualization.
    pub periods_per_year: f64,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            position_size_fraction: 0.05,
            slippage_rate: 0.0005,
            cost_rate: 0.001,
            periods_per_year: 252.0,
        }
    }
}

impl ExecutionParams {
    /// Equity haircut applied on each fill.
    fn friction(&self) -> f64 {
        self.position_size_fraction * (self.slippage_rate + self.cost_rate)
    }
}

/// Everything a single-symbol backtest produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestOutput {
    pub trades: Vec<Trade>,
    /// One equity value per bar, starting from 1.0.
    pub equity_curve: Vec<f64>,
    pub metrics: Metrics,
}

/// Replay a signal sequence against its price series.
///
/// `signals` must be the tail-aligned output of the signal engine: signal
/// `j` belongs to bar `prices.len() - signals.len() + j`. Bars before the
/// first signal are necessarily Flat.
///
/// State machine per bar (after applying the bar's market move):
/// - Flat + Buy  → open Long at close·(1+slippage); friction charged.
///   Entries never fire on the final bar (a position must outlive its
///   entry bar so every trade has exit strictly after entry).
/// - Long + Sell → close at close·(1−slippage); friction charged; Trade.
/// - Long + Hold/Buy → carry; Flat + Sell/Hold → stay Flat (no shorting).
/// - End of data while Long → force-close at the final bar, marked as a
///   synthetic exit, friction still charged.
pub fn run(
    signals: &[SignalPoint],
    prices: &PriceSeries,
    params: &ExecutionParams,
) -> BacktestOutput {
    let bars = prices.bars();
    let n = bars.len();
    assert!(
        signals.len() <= n,
        "more signals than bars ({} > {n})",
        signals.len()
    );
    let offset = n - signals.len();
    let friction = params.friction();

    let mut equity = 1.0_f64;
    let mut equity_curve = Vec::with_capacity(n);
    let mut trades: Vec<Trade> = Vec::new();
    let mut open: Option<Position> = None;
    let mut entry_index = 0usize;

    for i in 0..n {
        if open.is_some() && i > 0 {
            equity *= 1.0 + params.position_size_fraction * bar_return(bars, i);
        }

        if i >= offset {
            match (open.is_some(), signals[i - offset].signal) {
                (false, Signal::Buy) if i + 1 < n && !bars[i].close.is_nan() => {
                    equity *= 1.0 - friction;
                    open = Some(Position {
                        symbol: prices.symbol().to_string(),
                        side: PositionSide::Long,
                        entry_price: bars[i].close * (1.0 + params.slippage_rate),
                        entry_date: bars[i].date,
                        size_fraction: params.position_size_fraction,
                    });
                    entry_index = i;
                }
                (true, Signal::Sell) if !bars[i].close.is_nan() => {
                    equity *= 1.0 - friction;
                    let position = open.take().unwrap();
                    trades.push(close_position(
                        &position,
                        bars[i].close * (1.0 - params.slippage_rate),
                        bars[i].date,
                        i - entry_index,
                        ExitReason::Signal,
                        params,
                    ));
                }
                _ => {}
            }
        }

        equity_curve.push(equity);
    }

    // End of data while Long: every open position resolves into a Trade.
    if let Some(position) = open.take() {
        equity *= 1.0 - friction;
        if let Some(last) = equity_curve.last_mut() {
            *last = equity;
        }
        // A position can only open on a finite close, so one exists.
        let exit_close = prices
            .last_valid_close()
            .map(|b| b.close)
            .unwrap_or(position.entry_price);
        trades.push(close_position(
            &position,
            exit_close * (1.0 - params.slippage_rate),
            bars[n - 1].date,
            (n - 1) - entry_index,
            ExitReason::EndOfData,
            params,
        ));
    }

    let metrics = Metrics::compute(&equity_curve, params.periods_per_year);
    BacktestOutput {
        trades,
        equity_curve,
        metrics,
    }
}

/// Buy-and-hold comparison: permanently Long from the first tradable bar,
/// computed through the same engine so both curves share one code path.
pub fn buy_and_hold(prices: &PriceSeries, params: &ExecutionParams) -> BacktestOutput {
    let mut entered = false;
    let signals: Vec<SignalPoint> = prices
        .bars()
        .iter()
        .map(|bar| {
            let signal = if !entered && !bar.close.is_nan() {
                entered = true;
                Signal::Buy
            } else {
                Signal::Hold
            };
            SignalPoint {
                symbol: bar.symbol.clone(),
                date: bar.date,
                close: bar.close,
                moving_average: f64::NAN,
                ratio: f64::NAN,
                signal,
            }
        })
        .collect();
    run(&signals, prices, params)
}

/// Close-to-close return for bar `i`; 0 when either close is NaN.
fn bar_return(bars: &[crate::domain::Bar], i: usize) -> f64 {
    let prev = bars[i - 1].close;
    let cur = bars[i].close;
    if prev.is_nan() || cur.is_nan() || prev <= 0.0 {
        0.0
    } else {
        cur / prev - 1.0
    }
}

fn close_position(
    position: &Position,
    exit_price: f64,
    exit_date: chrono::NaiveDate,
    bars_held: usize,
    exit: ExitReason,
    params: &ExecutionParams,
) -> Trade {
    let costs = 2.0 * params.cost_rate;
    Trade {
        symbol: position.symbol.clone(),
        side: position.side,
        entry_date: position.entry_date,
        exit_date,
        entry_price: position.entry_price,
        exit_price,
        pnl_pct: exit_price / position.entry_price - 1.0 - costs,
        costs,
        bars_held,
        exit,
    }
}
