use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, info};

use super::MarketDataSource;
use crate::types::{Bar, DateRange};

// ---------------------------------------------------------------------------
// BarStore -- thread-safe historical bars per ticker
// ---------------------------------------------------------------------------

/// Thread-safe store of historical bars keyed by upper-cased ticker.
///
/// Each ticker's bars are kept sorted by timestamp with at most one bar per
/// timestamp; a later bar for an existing timestamp replaces the earlier one.
#[derive(Default)]
pub struct BarStore {
    bars: RwLock<HashMap<String, Vec<Bar>>>,
}

impl BarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document of the shape `{ "AAPL": [ {bar}, ... ], ... }`.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: HashMap<String, Vec<Bar>> =
            serde_json::from_str(text).context("failed to parse bar JSON")?;
        let store = Self::new();
        for (ticker, bars) in raw {
            store.insert(&ticker, bars);
        }
        Ok(store)
    }

    /// Load a JSON bar document from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read bars from {}", path.display()))?;
        let store = Self::from_json(&content)
            .with_context(|| format!("failed to load bars from {}", path.display()))?;
        info!(
            path = %path.display(),
            tickers = store.tickers().len(),
            "bar store loaded"
        );
        Ok(store)
    }

    /// Merge `bars` into the ticker's history.
    pub fn insert(&self, ticker: &str, bars: Vec<Bar>) {
        let mut map = self.bars.write();
        let history = map.entry(normalise(ticker)).or_default();
        for bar in bars {
            upsert(history, bar);
        }
    }

    /// Insert or replace a single bar.
    pub fn push(&self, ticker: &str, bar: Bar) {
        let mut map = self.bars.write();
        upsert(map.entry(normalise(ticker)).or_default(), bar);
    }

    /// Bars of `ticker` inside `range`, oldest first.
    pub fn get_range(&self, ticker: &str, range: &DateRange) -> Vec<Bar> {
        let map = self.bars.read();
        match map.get(&normalise(ticker)) {
            Some(history) => history
                .iter()
                .filter(|b| range.contains(&b.timestamp))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Known tickers, sorted.
    pub fn tickers(&self) -> Vec<String> {
        let map = self.bars.read();
        let mut tickers: Vec<String> = map.keys().cloned().collect();
        tickers.sort();
        tickers
    }

    pub fn count(&self, ticker: &str) -> usize {
        let map = self.bars.read();
        map.get(&normalise(ticker)).map_or(0, Vec::len)
    }

    /// Latest bar timestamp across every ticker.
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        let map = self.bars.read();
        map.values()
            .filter_map(|history| history.last().map(|b| b.timestamp))
            .max()
    }
}

impl MarketDataSource for BarStore {
    fn fetch(&self, ticker: &str, range: &DateRange) -> Result<Vec<Bar>> {
        let bars = self.get_range(ticker, range);
        debug!(ticker, rows = bars.len(), "bars fetched from store");
        Ok(bars)
    }
}

fn normalise(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

fn upsert(history: &mut Vec<Bar>, bar: Bar) {
    match history.binary_search_by(|b| b.timestamp.cmp(&bar.timestamp)) {
        Ok(pos) => history[pos] = bar,
        Err(pos) => history.insert(pos, bar),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
