//! On-disk bar cache.
//!
//! Layout: one directory per symbol under the cache root —
//! `symbol=TCS/bars.csv` (date,open,high,low,close,volume rows) plus
//! `meta.json` with the covered range, bar count, and write time.

use crate::domain::{Bar, PriceSeries};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no cached data for symbol '{symbol}'")]
    Missing { symbol: String },

    #[error("cache I/O error: {0}")]
    Io(String),

    #[error("corrupt cache entry for '{symbol}': {reason}")]
    Corrupt { symbol: String, reason: String },
}

/// Metadata sidecar for one cached symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bar_count: usize,
    pub cached_at: NaiveDateTime,
}

/// CSV row shape; symbol lives in the directory name, not the rows.
#[derive(Debug, Serialize, Deserialize)]
struct BarRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

/// CSV-backed bar cache rooted at a directory.
#[derive(Debug)]
pub struct BarCache {
    root: PathBuf,
}

impl BarCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.root.join(format!("symbol={symbol}"))
    }

    /// Write a series, replacing any existing entry for the symbol.
    pub fn write(&self, series: &PriceSeries) -> Result<(), CacheError> {
        let dir = self.symbol_dir(series.symbol());
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::Io(e.to_string()))?;

        let mut writer = csv::Writer::from_path(dir.join("bars.csv"))
            .map_err(|e| CacheError::Io(e.to_string()))?;
        for bar in series.bars() {
            writer
                .serialize(BarRow {
                    date: bar.date,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume,
                })
                .map_err(|e| CacheError::Io(e.to_string()))?;
        }
        writer.flush().map_err(|e| CacheError::Io(e.to_string()))?;

        let bars = series.bars();
        let meta = CacheMeta {
            symbol: series.symbol().to_string(),
            start_date: bars[0].date,
            end_date: bars[bars.len() - 1].date,
            bar_count: bars.len(),
            cached_at: chrono::Local::now().naive_local(),
        };
        let json = serde_json::to_string_pretty(&meta)
            .map_err(|e| CacheError::Io(e.to_string()))?;
        std::fs::write(dir.join("meta.json"), json)
            .map_err(|e| CacheError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load a symbol's cached series.
    pub fn load(&self, symbol: &str) -> Result<PriceSeries, CacheError> {
        let path = self.symbol_dir(symbol).join("bars.csv");
        if !path.exists() {
            return Err(CacheError::Missing {
                symbol: symbol.to_string(),
            });
        }

        let mut reader =
            csv::Reader::from_path(&path).map_err(|e| CacheError::Io(e.to_string()))?;
        let mut bars = Vec::new();
        for row in reader.deserialize::<BarRow>() {
            let row = row.map_err(|e| CacheError::Corrupt {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;
            bars.push(Bar {
                symbol: symbol.to_string(),
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        PriceSeries::new(symbol, bars).map_err(|e| CacheError::Corrupt {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })
    }

    /// Whether the cached entry fully covers [start, end].
    pub fn covers_range(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> bool {
        match self.read_meta(symbol) {
            Ok(meta) => meta.start_date <= start && meta.end_date >= end,
            Err(_) => false,
        }
    }

    pub fn read_meta(&self, symbol: &str) -> Result<CacheMeta, CacheError> {
        let path = self.symbol_dir(symbol).join("meta.json");
        let content = std::fs::read_to_string(&path).map_err(|_| CacheError::Missing {
            symbol: symbol.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| CacheError::Corrupt {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })
    }

    /// Metadata for every cached symbol, sorted by symbol.
    pub fn list(&self) -> Result<Vec<CacheMeta>, CacheError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut metas = Vec::new();
        let entries =
            std::fs::read_dir(&self.root).map_err(|e| CacheError::Io(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| CacheError::Io(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(symbol) = name.strip_prefix("symbol=") {
                if let Ok(meta) = self.read_meta(symbol) {
                    metas.push(meta);
                }
            }
        }
        metas.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(metas)
    }

    /// Remove a symbol's cache entry.
    pub fn remove(&self, symbol: &str) -> Result<(), CacheError> {
        let dir = self.symbol_dir(symbol);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| CacheError::Io(e.to_string()))?;
        }
        Ok(())
    }
}
