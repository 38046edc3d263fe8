//! Artifact export — the durable outputs of a run.
//!
//! One directory per run containing:
//! - `summary.json` — the aggregated PortfolioSummary
//! - `trades.csv`   — every trade across all symbols
//! - `equity.csv`   — per-symbol equity curves keyed by date

use crate::report::PortfolioSummary;
use crate::runner::PortfolioRun;
use anyhow::{Context, Result};
use revlab_core::domain::{ExitReason, PositionSide};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct TradeRow<'a> {
    symbol: &'a str,
    side: &'static str,
    entry_date: String,
    exit_date: String,
    entry_price: f64,
    exit_price: f64,
    pnl_pct: f64,
    costs: f64,
    bars_held: usize,
    exit: &'static str,
}

#[derive(Serialize)]
struct EquityRow<'a> {
    symbol: &'a str,
    date: String,
    equity: f64,
}

/// Write the full artifact set under `output_dir/<run_name>`.
/// Returns the run directory path.
pub fn save_artifacts(
    run: &PortfolioRun,
    summary: &PortfolioSummary,
    output_dir: &Path,
    run_name: &str,
) -> Result<PathBuf> {
    let run_dir = output_dir.join(run_name);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("create run directory {}", run_dir.display()))?;

    let summary_path = run_dir.join("summary.json");
    let json = serde_json::to_string_pretty(summary).context("serialize summary")?;
    std::fs::write(&summary_path, json)
        .with_context(|| format!("write {}", summary_path.display()))?;

    write_trades_csv(&run_dir.join("trades.csv"), run)?;
    write_equity_csv(&run_dir.join("equity.csv"), run)?;

    Ok(run_dir)
}

fn write_trades_csv(path: &Path, run: &PortfolioRun) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create trades CSV {}", path.display()))?;

    for report in &run.reports {
        for trade in &report.trades {
            writer.serialize(TradeRow {
                symbol: &trade.symbol,
                side: match trade.side {
                    PositionSide::Long => "LONG",
                    PositionSide::Flat => "FLAT",
                },
                entry_date: trade.entry_date.to_string(),
                exit_date: trade.exit_date.to_string(),
                entry_price: trade.entry_price,
                exit_price: trade.exit_price,
                pnl_pct: trade.pnl_pct,
                costs: trade.costs,
                bars_held: trade.bars_held,
                exit: match trade.exit {
                    ExitReason::Signal => "signal",
                    ExitReason::EndOfData => "end_of_data",
                },
            })?;
        }
    }
    writer.flush().context("flush trades CSV")?;
    Ok(())
}

fn write_equity_csv(path: &Path, run: &PortfolioRun) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create equity CSV {}", path.display()))?;

    for report in &run.reports {
        for (date, equity) in report.dates.iter().zip(&report.equity_curve) {
            writer.serialize(EquityRow {
                symbol: &report.symbol,
                date: date.to_string(),
                equity: *equity,
            })?;
        }
    }
    writer.flush().context("flush equity CSV")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::aggregate;
    use crate::runner::run_portfolio;
    use revlab_core::domain::{Bar, PriceSeries};
    use revlab_core::engine::ExecutionParams;
    use revlab_core::signals::SignalParams;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn oscillating_series(symbol: &str, n: usize) -> PriceSeries {
        let base = chrono::NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let bars: Vec<Bar> = (0..n)
            .map(|i| {
                let close =
                    100.0 + 12.0 * ((i as f64) * std::f64::consts::TAU / 21.0).sin();
                Bar {
                    symbol: symbol.to_string(),
                    date: base + chrono::Duration::days(i as i64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1000,
                }
            })
            .collect();
        PriceSeries::new(symbol, bars).unwrap()
    }

    #[test]
    fn artifacts_written_and_readable() {
        let mut series = BTreeMap::new();
        series.insert("AAA".to_string(), oscillating_series("AAA", 120));

        let run = run_portfolio(
            &series,
            &SignalParams::default(),
            &ExecutionParams::default(),
        );
        let summary = aggregate(&run, &[], 5);

        let dir = TempDir::new().unwrap();
        let run_dir = save_artifacts(&run, &summary, dir.path(), "test-run").unwrap();

        assert!(run_dir.join("summary.json").exists());
        assert!(run_dir.join("trades.csv").exists());
        assert!(run_dir.join("equity.csv").exists());

        // summary.json parses back.
        let content = std::fs::read_to_string(run_dir.join("summary.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["symbol_count"], 1);

        // equity.csv has one row per bar plus header.
        let equity = std::fs::read_to_string(run_dir.join("equity.csv")).unwrap();
        assert_eq!(equity.lines().count(), 121);
        assert!(equity.starts_with("symbol,date,equity"));

        // trades.csv has a header and at least one trade for the oscillator.
        let trades = std::fs::read_to_string(run_dir.join("trades.csv")).unwrap();
        assert!(trades.lines().count() > 1);
        assert!(trades.starts_with(
            "symbol,side,entry_date,exit_date,entry_price,exit_price,pnl_pct,costs,bars_held,exit"
        ));
    }
}
