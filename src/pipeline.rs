// =============================================================================
// Batch Pipeline — per-ticker sessions over a historical window
// =============================================================================
//
// For each ticker:
//   1. Fetch bars for the date range from the market data source
//   2. Empty result => NoData, skip the ticker
//   3. Build a Frame and a fresh SignalRegistry (one session per ticker)
//   4. Run every configured indicator and register its signal column
//   5. Compute the weighted composite
//
// A failing ticker is reported as `Failed` and the batch carries on.  The
// parallel runner gives each ticker its own blocking task; the only shared
// state is the outcome collection point.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::frame::Frame;
use crate::indicators::IndicatorSpec;
use crate::market_data::MarketDataSource;
use crate::output::{export_rows, OutputSink};
use crate::signals::{CompositeResult, SignalRegistry, WeightVector};
use crate::types::DateRange;

/// What happened to one ticker in a batch.
#[derive(Debug, Clone)]
pub enum TickerOutcome {
    Computed {
        ticker: String,
        result: CompositeResult,
    },
    /// The source returned no bars for the range.
    NoData { ticker: String },
    Failed { ticker: String, error: String },
}

impl TickerOutcome {
    pub fn ticker(&self) -> &str {
        match self {
            Self::Computed { ticker, .. } | Self::NoData { ticker } | Self::Failed { ticker, .. } => {
                ticker
            }
        }
    }

    pub fn result(&self) -> Option<&CompositeResult> {
        match self {
            Self::Computed { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// Run `specs` over `frame` in a fresh registry and combine their designated
/// signal columns under `weights`.
pub fn compute_session(
    frame: &Frame,
    specs: &[IndicatorSpec],
    weights: &WeightVector,
) -> crate::Result<CompositeResult> {
    let mut registry = SignalRegistry::new();
    for spec in specs {
        registry.register_indicator(spec, frame)?;
    }
    registry.composite(weights)
}

/// Process a single ticker end to end.
pub fn run_ticker(
    source: &dyn MarketDataSource,
    ticker: &str,
    range: &DateRange,
    config: &PipelineConfig,
) -> TickerOutcome {
    let session = Uuid::new_v4();
    let span = info_span!("ticker", ticker, %session);
    let _guard = span.enter();

    let bars = match source.fetch(ticker, range) {
        Ok(bars) => bars,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "fetch failed, skipping ticker");
            return TickerOutcome::Failed {
                ticker: ticker.to_string(),
                error: format!("{e:#}"),
            };
        }
    };

    if bars.is_empty() {
        warn!(start = %range.start, end = %range.end, "no data for range, skipping ticker");
        return TickerOutcome::NoData {
            ticker: ticker.to_string(),
        };
    }

    let frame = Frame::from_bars(&bars);
    debug!(rows = frame.len(), "frame built");
    if frame.len() < config.warm_up_bars() {
        warn!(
            rows = frame.len(),
            warm_up = config.warm_up_bars(),
            "window shorter than indicator warm-up, some signals stay undefined"
        );
    }

    match compute_session(&frame, &config.indicators(), &config.weights) {
        Ok(result) => {
            info!(
                rows = result.len(),
                latest = ?result.latest(),
                decision = ?result.latest_decision(config.decision_threshold),
                "composite computed"
            );
            TickerOutcome::Computed {
                ticker: ticker.to_string(),
                result,
            }
        }
        Err(e) => {
            warn!(error = %e, "composite failed, skipping ticker");
            TickerOutcome::Failed {
                ticker: ticker.to_string(),
                error: e.to_string(),
            }
        }
    }
}

/// Process `tickers` one after another.
pub fn run_batch(
    source: &dyn MarketDataSource,
    tickers: &[String],
    range: &DateRange,
    config: &PipelineConfig,
) -> Vec<TickerOutcome> {
    info!(tickers = tickers.len(), "running batch sequentially");
    tickers
        .iter()
        .map(|ticker| run_ticker(source, ticker, range, config))
        .collect()
}

/// Process `tickers` with one blocking task per ticker.
///
/// Outcomes are returned in the order of `tickers`.
pub async fn run_batch_parallel(
    source: Arc<dyn MarketDataSource>,
    tickers: &[String],
    range: DateRange,
    config: Arc<PipelineConfig>,
) -> Result<Vec<TickerOutcome>> {
    info!(tickers = tickers.len(), "running batch in parallel");
    let collected: Arc<Mutex<Vec<(usize, TickerOutcome)>>> =
        Arc::new(Mutex::new(Vec::with_capacity(tickers.len())));

    let mut tasks = JoinSet::new();
    for (position, ticker) in tickers.iter().enumerate() {
        let source = Arc::clone(&source);
        let config = Arc::clone(&config);
        let collected = Arc::clone(&collected);
        let ticker = ticker.clone();
        tasks.spawn_blocking(move || {
            let outcome = run_ticker(source.as_ref(), &ticker, &range, &config);
            collected.lock().push((position, outcome));
        });
    }

    while let Some(joined) = tasks.join_next().await {
        joined.context("ticker task panicked")?;
    }

    let mut outcomes = std::mem::take(&mut *collected.lock());
    outcomes.sort_by_key(|(position, _)| *position);
    Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
}

/// Send every computed ticker's rows to `sink`; returns the rows written.
pub fn write_outcomes(sink: &mut dyn OutputSink, outcomes: &[TickerOutcome]) -> Result<usize> {
    let mut written = 0;
    for outcome in outcomes {
        if let TickerOutcome::Computed { ticker, result } = outcome {
            let rows = export_rows(ticker, result);
            sink.write(&rows)
                .with_context(|| format!("failed to write rows for {ticker}"))?;
            written += rows.len();
        }
    }
    Ok(written)
}

/// Computed tickers ordered by latest composite value, highest first.
///
/// Tickers whose latest value is undefined are left out.
pub fn rank_tickers(outcomes: &[TickerOutcome]) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = outcomes
        .iter()
        .filter_map(|o| {
            let latest = o.result()?.latest()?;
            (!latest.is_nan()).then(|| (o.ticker().to_string(), latest))
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Ranked tickers whose latest composite exceeds `threshold`.
pub fn best_buys(outcomes: &[TickerOutcome], threshold: f64) -> Vec<(String, f64)> {
    rank_tickers(outcomes)
        .into_iter()
        .filter(|(_, score)| *score > threshold)
        .collect()
}
