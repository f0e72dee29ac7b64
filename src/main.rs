// =============================================================================
// Composite Signals — Batch Entry Point
// =============================================================================
//
// Loads the pipeline config and a JSON bar file, computes the composite for
// every configured ticker over the trailing lookback window, and writes one
// JSON line per (ticker, bar) to stdout.
//
// Environment:
//   COMPOSITE_CONFIG   path to the JSON config   (default composite_config.json)
//   COMPOSITE_BARS     path to the JSON bar file (default bars.json)
//   COMPOSITE_TICKERS  comma-separated ticker override
//   RUST_LOG           log filter                (default info)
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use composite_signals::config::PipelineConfig;
use composite_signals::market_data::{BarStore, MarketDataSource};
use composite_signals::output::JsonLinesSink;
use composite_signals::pipeline::{self, TickerOutcome};
use composite_signals::types::DateRange;

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path =
        std::env::var("COMPOSITE_CONFIG").unwrap_or_else(|_| "composite_config.json".into());
    let mut config = PipelineConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        PipelineConfig::default()
    });

    if let Ok(syms) = std::env::var("COMPOSITE_TICKERS") {
        config.tickers = syms
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }
    config.validate()?;

    info!(tickers = ?config.tickers, parallel = config.parallel, "Configured tickers");

    // ── 2. Market data ───────────────────────────────────────────────────
    let bars_path = std::env::var("COMPOSITE_BARS").unwrap_or_else(|_| "bars.json".into());
    let store = BarStore::load(&bars_path)?;

    let Some(latest) = store.latest_timestamp() else {
        warn!(path = %bars_path, "bar file holds no bars, nothing to do");
        return Ok(());
    };
    // Half-open range: include the latest bar itself.
    let range = DateRange::trailing_days(latest + chrono::Duration::seconds(1), config.lookback_days);
    info!(start = %range.start, end = %range.end, "Historical window");

    // ── 3. Batch ─────────────────────────────────────────────────────────
    let outcomes = if config.parallel {
        let source: Arc<dyn MarketDataSource> = Arc::new(store);
        let tickers = config.tickers.clone();
        pipeline::run_batch_parallel(source, &tickers, range, Arc::new(config.clone())).await?
    } else {
        pipeline::run_batch(&store, &config.tickers, &range, &config)
    };

    // ── 4. Output ────────────────────────────────────────────────────────
    let mut sink = JsonLinesSink::new(std::io::stdout().lock());
    let rows = pipeline::write_outcomes(&mut sink, &outcomes).context("failed to export results")?;

    let skipped = outcomes
        .iter()
        .filter(|o| !matches!(o, TickerOutcome::Computed { .. }))
        .count();
    info!(rows, computed = outcomes.len() - skipped, skipped, "Batch complete");

    for (ticker, score) in pipeline::rank_tickers(&outcomes) {
        info!(%ticker, score, "Latest composite");
    }
    let best: Vec<String> = pipeline::best_buys(&outcomes, config.decision_threshold)
        .into_iter()
        .map(|(t, s)| format!("{t} ({s:.2})"))
        .collect();
    info!(best = ?best, "Best tickers to buy");

    Ok(())
}
