// =============================================================================
// Pipeline Configuration — indicator parameters, weights and tickers
// =============================================================================
//
// Every field carries a serde default so that a partial (or empty) JSON file
// loads cleanly.  Persistence uses an atomic tmp + rename write.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::{IndicatorSpec, MacdParams, RsiParams, VolumeParams};
use crate::signals::WeightVector;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_tickers() -> Vec<String> {
    vec!["AAPL".to_string(), "GOOGL".to_string(), "MSFT".to_string()]
}

/// Seven calendar days is about five trading bars, fewer than the default
/// RSI (15) and volume (20) warm-ups, so those columns stay undefined over a
/// default window.  Raise it to get defined RSI/volume readings.
fn default_lookback_days() -> i64 {
    7
}

fn default_weights() -> WeightVector {
    WeightVector::new()
        .with("MACD_Signal", 0.4)
        .with("RSI_Signal", 0.3)
        .with("Volume_Signal", 0.3)
}

fn default_decision_threshold() -> f64 {
    0.5
}

// =============================================================================
// PipelineConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Tickers processed per batch, in output order.
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,

    /// Length of the historical window ending at the latest available bar.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    #[serde(default)]
    pub macd: MacdParams,

    #[serde(default)]
    pub rsi: RsiParams,

    #[serde(default)]
    pub volume: VolumeParams,

    /// Composite weights keyed by signal column name.
    #[serde(default = "default_weights")]
    pub weights: WeightVector,

    /// Composite values beyond +/- this are read as BUY / SELL.
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,

    /// Process tickers on a worker pool instead of sequentially.
    #[serde(default)]
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tickers: default_tickers(),
            lookback_days: default_lookback_days(),
            macd: MacdParams::default(),
            rsi: RsiParams::default(),
            volume: VolumeParams::default(),
            weights: default_weights(),
            decision_threshold: default_decision_threshold(),
            parallel: false,
        }
    }
}

impl PipelineConfig {
    /// The indicators every ticker session runs, in registration order.
    pub fn indicators(&self) -> Vec<IndicatorSpec> {
        vec![
            IndicatorSpec::Macd(self.macd.clone()),
            IndicatorSpec::Rsi(self.rsi.clone()),
            IndicatorSpec::VolumeSpike(self.volume.clone()),
        ]
    }

    /// Bars needed before every indicator column is defined: RSI is first
    /// defined at bar `period`, the volume mean at bar `window - 1`.
    pub fn warm_up_bars(&self) -> usize {
        (self.rsi.period + 1).max(self.volume.window)
    }

    /// Check the configuration before any ticker runs: indicator parameters
    /// must be valid and the lookback positive.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.lookback_days > 0,
            "lookback_days must be positive, got {}",
            self.lookback_days
        );
        for spec in self.indicators() {
            spec.build().context("invalid indicator configuration")?;
        }
        Ok(())
    }

    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing file is an error so the caller can fall back to defaults
    /// with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read pipeline config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse pipeline config from {}", path.display()))?;

        info!(
            path = %path.display(),
            tickers = ?config.tickers,
            weights = config.weights.len(),
            "pipeline config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise pipeline config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "pipeline config saved (atomic)");
        Ok(())
    }
}
