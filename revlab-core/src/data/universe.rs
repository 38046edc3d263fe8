//! Universe configuration — the ordered symbol list to fetch and backtest.
//!
//! Stored as a TOML file with a `symbols` array. Ordering matters: it
//! determines batch partitioning, so it is preserved exactly as written.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file: {0}")]
    Io(String),

    #[error("parse universe TOML: {0}")]
    Parse(String),

    #[error("duplicate symbol in universe: {0}")]
    Duplicate(String),

    #[error("universe is empty")]
    Empty,
}

/// An ordered list of unique symbols.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    pub symbols: Vec<String>,
}

impl Universe {
    pub fn new(symbols: Vec<String>) -> Result<Self, UniverseError> {
        if symbols.is_empty() {
            return Err(UniverseError::Empty);
        }
        let mut seen = std::collections::BTreeSet::new();
        for symbol in &symbols {
            if !seen.insert(symbol.clone()) {
                return Err(UniverseError::Duplicate(symbol.clone()));
            }
        }
        Ok(Self { symbols })
    }

    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| UniverseError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        let parsed: Universe =
            toml::from_str(content).map_err(|e| UniverseError::Parse(e.to_string()))?;
        Self::new(parsed.symbols)
    }

    pub fn to_toml(&self) -> Result<String, UniverseError> {
        toml::to_string_pretty(self).map_err(|e| UniverseError::Parse(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// The default Nifty-50 large-cap universe.
    pub fn default_nifty() -> Self {
        let symbols = [
            "ADANIENT", "ADANIPORTS", "APOLLOHOSP", "ASIANPAINT", "AXISBANK",
            "BAJAJ-AUTO", "BAJFINANCE", "BAJAJFINSV", "BHARTIARTL", "BPCL",
            "BRITANNIA", "CIPLA", "COALINDIA", "DIVISLAB", "DRREDDY",
            "EICHERMOT", "GRASIM", "HCLTECH", "HDFCBANK", "HDFCLIFE",
            "HEROMOTOCO", "HINDALCO", "HINDUNILVR", "ICICIBANK", "INDUSINDBK",
            "INFY", "ITC", "JSWSTEEL", "KOTAKBANK", "LT",
            "M&M", "MARUTI", "NESTLEIND", "NTPC", "ONGC",
            "POWERGRID", "RELIANCE", "SBILIFE", "SBIN", "SUNPHARMA",
            "TATACONSUM", "TATAMOTORS", "TATASTEEL", "TECHM", "TITAN",
            "ULTRACEMCO", "UPL", "WIPRO",
        ];
        Self {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
        }
    }
}
