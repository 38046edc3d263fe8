//! Serializable run configuration.
//!
//! One TOML file describes a complete portfolio backtest: the universe and
//! date range, strategy parameters, execution model, and fetch pacing.
//! Every field has the documented default, so an empty file is a valid
//! (if pointless) configuration.

use chrono::NaiveDate;
use revlab_core::data::rate_limiter::RetryPolicy;
use revlab_core::data::FetchConfig;
use revlab_core::engine::ExecutionParams;
use revlab_core::signals::SignalParams;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file: {0}")]
    Io(String),

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete portfolio backtest configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub data: DataSection,
    pub strategy: StrategySection,
    pub execution: ExecutionSection,
    pub fetch: FetchSection,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data: DataSection::default(),
            strategy: StrategySection::default(),
            execution: ExecutionSection::default(),
            fetch: FetchSection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataSection {
    /// Symbols to run; empty means the built-in default universe.
    pub universe: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub cache_dir: String,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            universe: Vec::new(),
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            cache_dir: "data".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StrategySection {
    pub window: usize,
    pub lower_pct: f64,
    pub upper_pct: f64,
}

impl Default for StrategySection {
    fn default() -> Self {
        Self {
            window: 21,
            lower_pct: 5.0,
            upper_pct: 95.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionSection {
    pub position_size_fraction: f64,
    pub slippage_rate: f64,
    pub cost_rate: f64,
    pub periods_per_year: f64,
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            position_size_fraction: 0.05,
            slippage_rate: 0.0005,
            cost_rate: 0.001,
            periods_per_year: 252.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchSection {
    pub base_url: String,
    pub base_delay_secs: f64,
    pub max_retries: u32,
    pub backoff_factor: f64,
    pub max_workers: usize,
    pub batch_size: usize,
    pub batch_delay_secs: f64,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            base_delay_secs: 3.0,
            max_retries: 3,
            backoff_factor: 2.0,
            max_workers: 3,
            batch_size: 3,
            batch_delay_secs: 5.0,
        }
    }
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.strategy.window < 1 {
            return Err(ConfigError::Invalid("window must be >= 1".into()));
        }
        if !(0.0..=100.0).contains(&self.strategy.lower_pct)
            || !(0.0..=100.0).contains(&self.strategy.upper_pct)
            || self.strategy.lower_pct >= self.strategy.upper_pct
        {
            return Err(ConfigError::Invalid(
                "percentiles must satisfy 0 <= lower < upper <= 100".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.execution.position_size_fraction) {
            return Err(ConfigError::Invalid(
                "position_size_fraction must be in [0, 1]".into(),
            ));
        }
        if self.fetch.batch_size < 1 || self.fetch.max_workers < 1 {
            return Err(ConfigError::Invalid(
                "batch_size and max_workers must be >= 1".into(),
            ));
        }
        if self.data.start_date >= self.data.end_date {
            return Err(ConfigError::Invalid(
                "start_date must precede end_date".into(),
            ));
        }
        Ok(())
    }

    pub fn signal_params(&self) -> SignalParams {
        SignalParams {
            window: self.strategy.window,
            lower_pct: self.strategy.lower_pct,
            upper_pct: self.strategy.upper_pct,
        }
    }

    pub fn execution_params(&self) -> ExecutionParams {
        ExecutionParams {
            position_size_fraction: self.execution.position_size_fraction,
            slippage_rate: self.execution.slippage_rate,
            cost_rate: self.execution.cost_rate,
            periods_per_year: self.execution.periods_per_year,
        }
    }

    /// Fetch pacing with live-mode jitter enabled.
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            retry: RetryPolicy {
                base_delay: Duration::from_secs_f64(self.fetch.base_delay_secs),
                max_retries: self.fetch.max_retries,
                backoff_factor: self.fetch.backoff_factor,
                jitter: true,
            },
            batch_size: self.fetch.batch_size,
            max_workers: self.fetch.max_workers,
            batch_delay: Duration::from_secs_f64(self.fetch.batch_delay_secs),
            deadline: None,
        }
    }

    /// The configured universe, or the built-in default when empty.
    pub fn universe(&self) -> Vec<String> {
        if self.data.universe.is_empty() {
            revlab_core::data::Universe::default_nifty().symbols
        } else {
            self.data.universe.clone()
        }
    }
}
