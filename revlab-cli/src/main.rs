//! RevLab CLI — fetch, run, demo, and cache management commands.
//!
//! Commands:
//! - `fetch` — download the universe through the rate-limited batch pipeline
//! - `run`   — portfolio backtest from cached/live data, save artifacts
//! - `demo`  — same backtest on deterministic synthetic data, no network
//! - `cache status` / `cache clean` — inspect and prune the bar cache
//!
//! The three data modes differ only in which DataProvider supplies series;
//! the signal/backtest core is identical across them.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use revlab_core::data::{
    BarCache, DataProvider, HttpProvider, HttpProviderConfig, StdoutProgress,
    SyntheticProvider, Universe,
};
use revlab_runner::fetch::{acquire_series, AcquireOptions};
use revlab_runner::{aggregate, render_text, run_portfolio, save_artifacts, RunConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "revlab", about = "RevLab — mean-reversion backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download bars for the universe and cache them.
    Fetch {
        /// Symbols to fetch (defaults to the configured universe).
        symbols: Vec<String>,

        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Universe TOML file (overrides config universe).
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Force re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Run the portfolio backtest and save artifacts.
    Run {
        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Never make network requests; cached data only.
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Use the synthetic data source instead of cache/live.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// How many symbols to show in the top/bottom rankings.
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Run the backtest on synthetic data (no network, no cache).
    Demo {
        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// How many symbols to show in the top/bottom rankings.
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols, ranges, and bar counts.
    Status {
        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Remove symbols cached more than the given number of days ago.
    Clean {
        /// Remove entries written more than this many days ago.
        #[arg(long)]
        older_than_days: u64,

        /// Cache directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Actually delete (without this flag, only previews).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch {
            symbols,
            config,
            universe,
            force,
        } => cmd_fetch(symbols, config, universe, force),
        Commands::Run {
            config,
            offline,
            synthetic,
            output_dir,
            top,
        } => cmd_run(config, offline, synthetic, &output_dir, top),
        Commands::Demo { config, top } => cmd_demo(config, top),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => cmd_cache_status(&cache_dir),
            CacheAction::Clean {
                older_than_days,
                cache_dir,
                confirm,
            } => cmd_cache_clean(&cache_dir, older_than_days, confirm),
        },
    }
}

fn load_config(path: Option<PathBuf>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::from_file(&path)
            .with_context(|| format!("load config {}", path.display())),
        None => Ok(RunConfig::default()),
    }
}

fn resolve_universe(
    explicit: Vec<String>,
    universe_file: Option<PathBuf>,
    config: &RunConfig,
) -> Result<Vec<String>> {
    if !explicit.is_empty() {
        return Ok(explicit);
    }
    if let Some(path) = universe_file {
        let universe = Universe::from_file(&path)
            .with_context(|| format!("load universe {}", path.display()))?;
        return Ok(universe.symbols);
    }
    Ok(config.universe())
}

fn live_provider(config: &RunConfig) -> Result<HttpProvider> {
    if config.fetch.base_url.is_empty() {
        bail!("no provider base_url configured — set [fetch].base_url in the config");
    }
    let mut provider_config = HttpProviderConfig::new(config.fetch.base_url.clone());
    provider_config.access_token = std::env::var("REVLAB_ACCESS_TOKEN").ok();
    Ok(HttpProvider::new(provider_config))
}

fn cmd_fetch(
    symbols: Vec<String>,
    config_path: Option<PathBuf>,
    universe_file: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let universe = resolve_universe(symbols, universe_file, &config)?;
    let cache = BarCache::new(&config.data.cache_dir);
    let provider = live_provider(&config)?;

    let acquired = acquire_series(
        &universe,
        &cache,
        Some(&provider),
        config.fetch_config(),
        &AcquireOptions {
            start: config.data.start_date,
            end: config.data.end_date,
            force,
        },
        &StdoutProgress,
    )
    .context("acquire series")?;

    if !acquired.failures.is_empty() {
        for (symbol, reason) in &acquired.failures {
            eprintln!("Error for {symbol}: {reason}");
        }
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_run(
    config_path: Option<PathBuf>,
    offline: bool,
    synthetic: bool,
    output_dir: &Path,
    top: usize,
) -> Result<()> {
    if offline && synthetic {
        bail!("--offline and --synthetic are mutually exclusive");
    }
    let config = load_config(config_path)?;
    let universe = config.universe();

    // Mode selection only changes which provider supplies the series;
    // synthetic bars never touch the on-disk cache.
    let (series, failures, dataset_hash) = if synthetic {
        println!("SYNTHETIC MODE — results are for testing only\n");
        let (series, failures) = synthetic_series(&universe, &config);
        (series, failures, None)
    } else {
        let cache = BarCache::new(&config.data.cache_dir);
        let http_provider = if offline {
            None
        } else {
            live_provider(&config).ok()
        };
        let provider: Option<&dyn DataProvider> =
            http_provider.as_ref().map(|p| p as &dyn DataProvider);

        let acquired = acquire_series(
            &universe,
            &cache,
            provider,
            config.fetch_config(),
            &AcquireOptions {
                start: config.data.start_date,
                end: config.data.end_date,
                force: false,
            },
            &StdoutProgress,
        )
        .context("acquire series")?;
        (
            acquired.series,
            acquired.failures,
            Some(acquired.dataset_hash),
        )
    };

    if series.is_empty() {
        bail!("no series available to backtest");
    }

    let run = run_portfolio(
        &series,
        &config.signal_params(),
        &config.execution_params(),
    );
    let summary = aggregate(&run, &failures, top);

    println!("{}", render_text(&summary));

    let hash = dataset_hash.unwrap_or_else(|| "synthetic".to_string());
    if hash != "synthetic" {
        println!("Dataset hash: {hash}");
    }
    let short = if hash.len() > 12 { &hash[..12] } else { &hash };
    let run_name = format!("run-{}-{}", config.data.end_date, short);
    let run_dir = save_artifacts(&run, &summary, output_dir, &run_name)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

/// Generate series for every symbol from the synthetic provider.
fn synthetic_series(
    universe: &[String],
    config: &RunConfig,
) -> (
    std::collections::BTreeMap<String, revlab_core::domain::PriceSeries>,
    Vec<(String, String)>,
) {
    let provider = SyntheticProvider;
    let mut series = std::collections::BTreeMap::new();
    let mut failures = Vec::new();
    for symbol in universe {
        match provider.fetch(symbol, config.data.start_date, config.data.end_date) {
            Ok(fetched) => {
                series.insert(symbol.clone(), fetched);
            }
            Err(e) => failures.push((symbol.clone(), e.to_string())),
        }
    }
    (series, failures)
}

fn cmd_demo(config_path: Option<PathBuf>, top: usize) -> Result<()> {
    let config = load_config(config_path)?;
    let universe = config.universe();

    println!("DEMO MODE — synthetic data, results are for testing only\n");

    let (series, failures) = synthetic_series(&universe, &config);
    if series.is_empty() {
        bail!("no synthetic series generated — check the configured date range");
    }

    let run = run_portfolio(
        &series,
        &config.signal_params(),
        &config.execution_params(),
    );
    let summary = aggregate(&run, &failures, top);
    println!("{}", render_text(&summary));

    Ok(())
}

fn cmd_cache_status(cache_dir: &Path) -> Result<()> {
    let cache = BarCache::new(cache_dir);
    let metas = cache.list()?;

    if metas.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", metas.len());
    println!();
    println!("{:<12} {:<25} {:>10}", "Symbol", "Date Range", "Bars");
    println!("{}", "-".repeat(50));
    for meta in &metas {
        println!(
            "{:<12} {:<25} {:>10}",
            meta.symbol,
            format!("{} to {}", meta.start_date, meta.end_date),
            meta.bar_count
        );
    }
    Ok(())
}

fn cmd_cache_clean(cache_dir: &Path, older_than_days: u64, confirm: bool) -> Result<()> {
    let cache = BarCache::new(cache_dir);
    let cutoff =
        chrono::Local::now().naive_local() - chrono::Duration::days(older_than_days as i64);

    let stale: Vec<String> = cache
        .list()?
        .into_iter()
        .filter(|meta| meta.cached_at < cutoff)
        .map(|meta| meta.symbol)
        .collect();

    if stale.is_empty() {
        println!("No entries older than {older_than_days} days.");
        return Ok(());
    }

    println!("Found {} stale cache entries:", stale.len());
    for symbol in &stale {
        println!("  {symbol}");
    }

    if !confirm {
        println!("\nDry run — pass --confirm to actually delete.");
        return Ok(());
    }

    for symbol in &stale {
        cache.remove(symbol)?;
        println!("Removed: {symbol}");
    }
    Ok(())
}

// Keep argument parsing honest even without running the binary.
#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn demo_parses_with_defaults() {
        let cli = Cli::parse_from(["revlab", "demo"]);
        match cli.command {
            Commands::Demo { config, top } => {
                assert!(config.is_none());
                assert_eq!(top, 5);
            }
            _ => panic!("expected demo"),
        }
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::parse_from(["revlab", "run", "--offline", "--top", "10"]);
        match cli.command {
            Commands::Run {
                offline,
                synthetic,
                top,
                ..
            } => {
                assert!(offline);
                assert!(!synthetic);
                assert_eq!(top, 10);
            }
            _ => panic!("expected run"),
        }
    }
}
