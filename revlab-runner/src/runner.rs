//! Portfolio runner — per-symbol signal generation and backtests.
//!
//! The signal and backtest engines are pure, so symbols run in parallel
//! with rayon. A symbol that cannot be backtested (too few bars, degenerate
//! data) is skipped with a recorded reason and never aborts the run.

use chrono::NaiveDate;
use rayon::prelude::*;
use revlab_core::domain::{PriceSeries, Trade};
use revlab_core::engine::{self, ExecutionParams, Metrics};
use revlab_core::signals::{compute_signals, SignalParams};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result of backtesting one symbol: strategy vs buy-and-hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub strategy: Metrics,
    pub buy_hold: Metrics,
    /// strategy total return − buy-and-hold total return.
    pub excess_return: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
    /// Bar dates aligned with `equity_curve`.
    pub dates: Vec<NaiveDate>,
    pub signal_count: usize,
    pub bar_count: usize,
}

/// A symbol excluded from the aggregate, with the reason why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub reason: String,
}

/// All per-symbol results of one portfolio run.
#[derive(Debug)]
pub struct PortfolioRun {
    /// Reports sorted by symbol.
    pub reports: Vec<SymbolReport>,
    pub skipped: Vec<SkippedSymbol>,
}

/// Backtest every series in the map. Symbols run in parallel; output
/// ordering is by symbol name regardless of completion order.
pub fn run_portfolio(
    series: &BTreeMap<String, PriceSeries>,
    signal_params: &SignalParams,
    execution_params: &ExecutionParams,
) -> PortfolioRun {
    let results: Vec<Result<SymbolReport, SkippedSymbol>> = series
        .par_iter()
        .map(|(symbol, prices)| run_symbol(symbol, prices, signal_params, execution_params))
        .collect();

    let mut reports = Vec::new();
    let mut skipped = Vec::new();
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(skip) => skipped.push(skip),
        }
    }
    reports.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    skipped.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    PortfolioRun { reports, skipped }
}

fn run_symbol(
    symbol: &str,
    prices: &PriceSeries,
    signal_params: &SignalParams,
    execution_params: &ExecutionParams,
) -> Result<SymbolReport, SkippedSymbol> {
    let signals = compute_signals(prices, signal_params);
    if signals.is_empty() {
        return Err(SkippedSymbol {
            symbol: symbol.to_string(),
            reason: format!(
                "insufficient bars: {} < window {}",
                prices.len(),
                signal_params.window
            ),
        });
    }

    let strategy = engine::run(&signals, prices, execution_params);
    let buy_hold = engine::buy_and_hold(prices, execution_params);

    Ok(SymbolReport {
        symbol: symbol.to_string(),
        excess_return: strategy.metrics.total_return - buy_hold.metrics.total_return,
        strategy: strategy.metrics,
        buy_hold: buy_hold.metrics,
        trades: strategy.trades,
        dates: prices.bars().iter().map(|b| b.date).collect(),
        signal_count: signals.len(),
        bar_count: prices.len(),
        equity_curve: strategy.equity_curve,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use revlab_core::domain::Bar;

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

    fn oscillating_closes(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 12.0 * ((i as f64) * std::f64::consts::TAU / 21.0).sin())
            .collect()
    }

    #[test]
    fn portfolio_runs_all_symbols() {
        let mut series = BTreeMap::new();
        series.insert("AAA".to_string(), make_series("AAA", &oscillating_closes(120)));
        series.insert("BBB".to_string(), make_series("BBB", &oscillating_closes(120)));

        let run = run_portfolio(
            &series,
            &SignalParams::default(),
            &ExecutionParams::default(),
        );

        assert_eq!(run.reports.len(), 2);
        assert!(run.skipped.is_empty());
        assert_eq!(run.reports[0].symbol, "AAA");
        assert_eq!(run.reports[1].symbol, "BBB");
        for report in &run.reports {
            assert_eq!(report.bar_count, 120);
            assert_eq!(report.signal_count, 120 - 21 + 1);
            assert_eq!(report.equity_curve.len(), 120);
            assert_eq!(report.dates.len(), 120);
        }
    }

    #[test]
    fn short_series_is_skipped_with_reason() {
        let mut series = BTreeMap::new();
        series.insert("AAA".to_string(), make_series("AAA", &oscillating_closes(120)));
        series.insert("TINY".to_string(), make_series("TINY", &[100.0, 101.0]));

        let run = run_portfolio(
            &series,
            &SignalParams::default(),
            &ExecutionParams::default(),
        );

        assert_eq!(run.reports.len(), 1);
        assert_eq!(run.skipped.len(), 1);
        assert_eq!(run.skipped[0].symbol, "TINY");
        assert!(run.skipped[0].reason.contains("insufficient bars"));
    }

    #[test]
    fn excess_return_is_strategy_minus_buyhold() {
        let mut series = BTreeMap::new();
        series.insert("AAA".to_string(), make_series("AAA", &oscillating_closes(120)));

        let run = run_portfolio(
            &series,
            &SignalParams::default(),
            &ExecutionParams::default(),
        );
        let report = &run.reports[0];
        let expected = report.strategy.total_return - report.buy_hold.total_return;
        assert!((report.excess_return - expected).abs() < 1e-15);
    }

    #[test]
    fn identical_input_gives_identical_reports() {
        let mut series = BTreeMap::new();
        series.insert("AAA".to_string(), make_series("AAA", &oscillating_closes(90)));

        let a = run_portfolio(
            &series,
            &SignalParams::default(),
            &ExecutionParams::default(),
        );
        let b = run_portfolio(
            &series,
            &SignalParams::default(),
            &ExecutionParams::default(),
        );
        assert_eq!(a.reports[0].trades.len(), b.reports[0].trades.len());
        assert_eq!(
            a.reports[0].strategy.total_return.to_bits(),
            b.reports[0].strategy.total_return.to_bits()
        );
    }
}
