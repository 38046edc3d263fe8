//! Portfolio-level aggregation and the text report.
//!
//! Averages per-symbol metrics for strategy and buy-and-hold, computes the
//! excess-return win rate, ranks top/bottom performers (ties broken by
//! symbol name ascending so output is deterministic), and always enumerates
//! failures — a symbol that produced nothing still appears in the report.

use crate::runner::{PortfolioRun, SymbolReport};
use revlab_core::engine::Metrics;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// One row in the performer rankings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedSymbol {
    pub symbol: String,
    pub strategy_return: f64,
    pub buy_hold_return: f64,
    pub excess_return: f64,
    pub sharpe: f64,
}

/// Aggregated portfolio summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub symbol_count: usize,
    pub avg_strategy: Metrics,
    pub avg_buy_hold: Metrics,
    pub avg_excess_return: f64,
    /// Fraction of symbols with positive excess return.
    pub win_rate: f64,
    pub top: Vec<RankedSymbol>,
    pub bottom: Vec<RankedSymbol>,
    /// (symbol, reason) for every symbol that never reached the backtest
    /// (fetch failures) or was skipped during it.
    pub failures: Vec<(String, String)>,
}

/// Aggregate a portfolio run plus acquisition failures into a summary.
pub fn aggregate(
    run: &PortfolioRun,
    fetch_failures: &[(String, String)],
    top_n: usize,
) -> PortfolioSummary {
    let reports = &run.reports;
    let count = reports.len();

    let mut failures: Vec<(String, String)> = fetch_failures.to_vec();
    failures.extend(
        run.skipped
            .iter()
            .map(|s| (s.symbol.clone(), s.reason.clone())),
    );
    failures.sort();

    let win_rate = if count == 0 {
        0.0
    } else {
        reports.iter().filter(|r| r.excess_return > 0.0).count() as f64 / count as f64
    };

    PortfolioSummary {
        symbol_count: count,
        avg_strategy: average_metrics(reports.iter().map(|r| &r.strategy)),
        avg_buy_hold: average_metrics(reports.iter().map(|r| &r.buy_hold)),
        avg_excess_return: mean(reports.iter().map(|r| r.excess_return)),
        win_rate,
        top: rank_top(reports, top_n),
        bottom: rank_bottom(reports, top_n),
        failures,
    }
}

/// Top N by strategy return, best first; ties by symbol ascending.
fn rank_top(reports: &[SymbolReport], n: usize) -> Vec<RankedSymbol> {
    let mut ranked: Vec<&SymbolReport> = reports.iter().collect();
    ranked.sort_by(|a, b| {
        b.strategy
            .total_return
            .partial_cmp(&a.strategy.total_return)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    ranked.into_iter().take(n).map(to_ranked).collect()
}

/// Bottom N by strategy return, worst first; ties by symbol ascending.
fn rank_bottom(reports: &[SymbolReport], n: usize) -> Vec<RankedSymbol> {
    let mut ranked: Vec<&SymbolReport> = reports.iter().collect();
    ranked.sort_by(|a, b| {
        a.strategy
            .total_return
            .partial_cmp(&b.strategy.total_return)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    ranked.into_iter().take(n).map(to_ranked).collect()
}

fn to_ranked(report: &SymbolReport) -> RankedSymbol {
    RankedSymbol {
        symbol: report.symbol.clone(),
        strategy_return: report.strategy.total_return,
        buy_hold_return: report.buy_hold.total_return,
        excess_return: report.excess_return,
        sharpe: report.strategy.sharpe,
    }
}

fn average_metrics<'a>(metrics: impl Iterator<Item = &'a Metrics>) -> Metrics {
    let collected: Vec<&Metrics> = metrics.collect();
    Metrics {
        total_return: mean(collected.iter().map(|m| m.total_return)),
        volatility: mean(collected.iter().map(|m| m.volatility)),
        sharpe: mean(collected.iter().map(|m| m.sharpe)),
        max_drawdown: mean(collected.iter().map(|m| m.max_drawdown)),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        return 0.0;
    }
    collected.iter().sum::<f64>() / collected.len() as f64
}

/// Render the summary as the tabular text report.
pub fn render_text(summary: &PortfolioSummary) -> String {
    let mut out = String::new();
    let rule = "=".repeat(72);
    let thin = "-".repeat(72);

    writeln!(out, "{rule}").unwrap();
    writeln!(out, "MEAN REVERSION STRATEGY BACKTEST REPORT").unwrap();
    writeln!(out, "{rule}").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "PORTFOLIO SUMMARY:").unwrap();
    writeln!(out, "Symbols backtested:        {}", summary.symbol_count).unwrap();
    writeln!(
        out,
        "Average strategy return:   {:>8.2}%",
        summary.avg_strategy.total_return * 100.0
    )
    .unwrap();
    writeln!(
        out,
        "Average buy & hold return: {:>8.2}%",
        summary.avg_buy_hold.total_return * 100.0
    )
    .unwrap();
    writeln!(
        out,
        "Average excess return:     {:>8.2}%",
        summary.avg_excess_return * 100.0
    )
    .unwrap();
    writeln!(
        out,
        "Win rate (excess > 0):     {:>8.1}%",
        summary.win_rate * 100.0
    )
    .unwrap();
    writeln!(out).unwrap();

    writeln!(out, "RISK METRICS:").unwrap();
    writeln!(out, "{thin}").unwrap();
    writeln!(
        out,
        "{:<28} {:>12} {:>12}",
        "Metric", "Strategy", "Buy & Hold"
    )
    .unwrap();
    writeln!(out, "{thin}").unwrap();
    writeln!(
        out,
        "{:<28} {:>11.2}% {:>11.2}%",
        "Mean volatility",
        summary.avg_strategy.volatility * 100.0,
        summary.avg_buy_hold.volatility * 100.0
    )
    .unwrap();
    writeln!(
        out,
        "{:<28} {:>12.2} {:>12.2}",
        "Mean Sharpe ratio", summary.avg_strategy.sharpe, summary.avg_buy_hold.sharpe
    )
    .unwrap();
    writeln!(
        out,
        "{:<28} {:>11.2}% {:>11.2}%",
        "Mean max drawdown",
        summary.avg_strategy.max_drawdown * 100.0,
        summary.avg_buy_hold.max_drawdown * 100.0
    )
    .unwrap();
    writeln!(out).unwrap();

    render_ranking(&mut out, "TOP PERFORMERS:", &summary.top, &thin);
    render_ranking(&mut out, "BOTTOM PERFORMERS:", &summary.bottom, &thin);

    if summary.failures.is_empty() {
        writeln!(out, "FAILURES: none").unwrap();
    } else {
        writeln!(out, "FAILURES ({}):", summary.failures.len()).unwrap();
        for (symbol, reason) in &summary.failures {
            writeln!(out, "  {symbol}: {reason}").unwrap();
        }
    }

    out
}

fn render_ranking(out: &mut String, title: &str, rows: &[RankedSymbol], thin: &str) {
    writeln!(out, "{title}").unwrap();
    writeln!(out, "{thin}").unwrap();
    writeln!(
        out,
        "{:<6} {:<12} {:>10} {:>10} {:>10} {:>8}",
        "Rank", "Symbol", "Strategy", "Buy&Hold", "Excess", "Sharpe"
    )
    .unwrap();
    writeln!(out, "{thin}").unwrap();
    for (i, row) in rows.iter().enumerate() {
        writeln!(
            out,
            "{:<6} {:<12} {:>9.2}% {:>9.2}% {:>9.2}% {:>8.2}",
            i + 1,
            row.symbol,
            row.strategy_return * 100.0,
            row.buy_hold_return * 100.0,
            row.excess_return * 100.0,
            row.sharpe
        )
        .unwrap();
    }
    writeln!(out).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::SkippedSymbol;
    use proptest::prelude::*;

    fn metrics(total_return: f64) -> Metrics {
        Metrics {
            total_return,
            volatility: 0.2,
            sharpe: 1.0,
            max_drawdown: -0.1,
        }
    }

    fn report(symbol: &str, strategy_return: f64, buy_hold_return: f64) -> SymbolReport {
        SymbolReport {
            symbol: symbol.to_string(),
            strategy: metrics(strategy_return),
            buy_hold: metrics(buy_hold_return),
            excess_return: strategy_return - buy_hold_return,
            trades: vec![],
            equity_curve: vec![1.0],
            dates: vec![chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()],
            signal_count: 0,
            bar_count: 1,
        }
    }

    fn run_of(reports: Vec<SymbolReport>) -> PortfolioRun {
        PortfolioRun {
            reports,
            skipped: vec![],
        }
    }

    #[test]
    fn averages_and_win_rate() {
        let run = run_of(vec![
            report("AAA", 0.10, 0.05), // excess +
            report("BBB", 0.00, 0.10), // excess -
            report("CCC", 0.20, 0.10), // excess +
            report("DDD", -0.10, 0.00), // excess -
        ]);
        let summary = aggregate(&run, &[], 3);

        assert_eq!(summary.symbol_count, 4);
        assert!((summary.avg_strategy.total_return - 0.05).abs() < 1e-12);
        assert!((summary.win_rate - 0.5).abs() < 1e-12);
        assert!(
            (summary.avg_excess_return - (0.05 - 0.10 + 0.10 - 0.10) / 4.0).abs() < 1e-12
        );
    }

    #[test]
    fn rankings_ordered_with_symbol_tiebreak() {
        let run = run_of(vec![
            report("ZZZ", 0.10, 0.0),
            report("AAA", 0.10, 0.0), // same return as ZZZ
            report("MMM", 0.30, 0.0),
            report("DDD", -0.20, 0.0),
            report("CCC", -0.20, 0.0), // same return as DDD
        ]);
        let summary = aggregate(&run, &[], 3);

        let top: Vec<&str> = summary.top.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(top, vec!["MMM", "AAA", "ZZZ"]);

        let bottom: Vec<&str> = summary.bottom.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(bottom, vec!["CCC", "DDD", "AAA"]);
    }

    #[test]
    fn top_n_larger_than_universe_is_clamped() {
        let run = run_of(vec![report("AAA", 0.1, 0.0)]);
        let summary = aggregate(&run, &[], 10);
        assert_eq!(summary.top.len(), 1);
        assert_eq!(summary.bottom.len(), 1);
    }

    #[test]
    fn failures_merge_fetch_and_skip_reasons() {
        let run = PortfolioRun {
            reports: vec![report("AAA", 0.1, 0.0)],
            skipped: vec![SkippedSymbol {
                symbol: "TINY".into(),
                reason: "insufficient bars: 2 < window 21".into(),
            }],
        };
        let fetch_failures = vec![("BAD".to_string(), "symbol not found: BAD".to_string())];
        let summary = aggregate(&run, &fetch_failures, 5);

        assert_eq!(summary.failures.len(), 2);
        assert_eq!(summary.failures[0].0, "BAD");
        assert_eq!(summary.failures[1].0, "TINY");
    }

    #[test]
    fn empty_run_aggregates_to_zeros() {
        let summary = aggregate(&run_of(vec![]), &[], 5);
        assert_eq!(summary.symbol_count, 0);
        assert_eq!(summary.win_rate, 0.0);
        assert_eq!(summary.avg_strategy.total_return, 0.0);
        assert!(summary.top.is_empty());
    }

    proptest! {
        /// Rankings depend only on (return, symbol), not on input order.
        #[test]
        fn rankings_are_input_order_invariant(
            returns in proptest::collection::vec(-0.5f64..0.5, 1..20),
            seed in 0u64..1000,
        ) {
            let mut reports: Vec<SymbolReport> = returns
                .iter()
                .enumerate()
                .map(|(i, &r)| report(&format!("SYM{i:02}"), r, 0.0))
                .collect();

            let summary_sorted = aggregate(&run_of(reports.clone()), &[], 5);

            // Deterministic shuffle driven by the seed.
            let len = reports.len();
            for i in 0..len {
                let j = ((seed as usize).wrapping_mul(31).wrapping_add(i * 17)) % len;
                reports.swap(i, j);
            }
            let summary_shuffled = aggregate(&run_of(reports), &[], 5);

            let top_a: Vec<&str> =
                summary_sorted.top.iter().map(|r| r.symbol.as_str()).collect();
            let top_b: Vec<&str> =
                summary_shuffled.top.iter().map(|r| r.symbol.as_str()).collect();
            prop_assert_eq!(top_a, top_b);

            let bottom_a: Vec<&str> =
                summary_sorted.bottom.iter().map(|r| r.symbol.as_str()).collect();
            let bottom_b: Vec<&str> =
                summary_shuffled.bottom.iter().map(|r| r.symbol.as_str()).collect();
            prop_assert_eq!(bottom_a, bottom_b);
        }
    }

    #[test]
    fn text_report_enumerates_failures() {
        let run = run_of(vec![report("AAA", 0.1, 0.05)]);
        let failures = vec![("BAD".to_string(), "rate limited".to_string())];
        let summary = aggregate(&run, &failures, 5);
        let text = render_text(&summary);

        assert!(text.contains("MEAN REVERSION STRATEGY BACKTEST REPORT"));
        assert!(text.contains("TOP PERFORMERS"));
        assert!(text.contains("BAD: rate limited"));
        assert!(text.contains("Win rate"));
    }
}
