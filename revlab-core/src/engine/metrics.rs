//! Performance metrics — pure functions over an equity curve.

use serde::{Deserialize, Serialize};

/// Performance statistics for one equity curve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Metrics {
    pub total_return: f64,
    /// Annualized standard deviation of per-bar returns.
    pub volatility: f64,
    /// Annualized mean return over annualized volatility.
    pub sharpe: f64,
    /// Most negative peak-to-trough decline (a non-positive fraction).
    pub max_drawdown: f64,
}

impl Metrics {
    /// Compute all metrics from an equity curve.
    pub fn compute(equity_curve: &[f64], periods_per_year: f64) -> Self {
        let returns = per_bar_returns(equity_curve);
        Self {
            total_return: total_return(equity_curve),
            volatility: volatility(&returns, periods_per_year),
            sharpe: sharpe(&returns, periods_per_year),
            max_drawdown: max_drawdown(equity_curve),
        }
    }
}

/// Total return as a fraction: final / initial − 1.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let initial = equity_curve[0];
    if initial <= 0.0 {
        return 0.0;
    }
    equity_curve[equity_curve.len() - 1] / initial - 1.0
}

/// Annualized volatility: sample stddev of per-bar returns · sqrt(periods).
pub fn volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    std_dev(returns) * periods_per_year.sqrt()
}

/// Annualized Sharpe: mean per-bar return · periods, over annualized vol.
/// Zero when volatility vanishes or there are fewer than 2 returns.
pub fn sharpe(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let vol = volatility(returns, periods_per_year);
    if vol < 1e-15 {
        return 0.0;
    }
    mean(returns) * periods_per_year / vol
}

/// Minimum of equity / running-max − 1 over the curve (≤ 0).
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let mut peak = equity_curve[0];
    let mut worst = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = eq / peak - 1.0;
            if dd < worst {
                worst = dd;
            }
        }
    }
    worst
}

/// Simple per-bar returns of an equity curve.
pub fn per_bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    if equity_curve.len() < 2 {
        return Vec::new();
    }
    equity_curve
        .windows(2)
        .map(|w| if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
