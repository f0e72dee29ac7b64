// =============================================================================
// Output — export rows and sinks
// =============================================================================
//
// Export shape: one row per (ticker, timestamp) with every registered signal,
// `Composite_Signal` and `Ticker`.  Undefined cells serialise as JSON null and
// read back as `None`.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::signals::CompositeResult;

const TICKER_KEY: &str = "Ticker";
const TIMESTAMP_KEY: &str = "timestamp";

/// One exported bar.  Signal columns are flattened next to `Ticker` and
/// `timestamp`, so a signal registered under either of those names would
/// clash with the fixed keys; [`export_rows`] leaves such columns out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "Ticker")]
    pub ticker: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub columns: BTreeMap<String, Option<f64>>,
}

/// Flatten one ticker's composite table into export rows, oldest first.
pub fn export_rows(ticker: &str, result: &CompositeResult) -> Vec<ExportRow> {
    result
        .frame()
        .rows()
        .map(|(timestamp, cells)| ExportRow {
            ticker: ticker.to_string(),
            timestamp,
            columns: cells
                .into_iter()
                .filter(|(name, _)| *name != TICKER_KEY && *name != TIMESTAMP_KEY)
                .map(|(name, value)| (name.to_string(), (!value.is_nan()).then_some(value)))
                .collect(),
        })
        .collect()
}

/// Consumes exported rows.
pub trait OutputSink {
    fn write(&mut self, rows: &[ExportRow]) -> Result<()>;
}

/// Collects rows in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<ExportRow>,
}

impl OutputSink for MemorySink {
    fn write(&mut self, rows: &[ExportRow]) -> Result<()> {
        self.rows.extend_from_slice(rows);
        Ok(())
    }
}

/// Writes one JSON object per row, newline separated.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for JsonLinesSink<W> {
    fn write(&mut self, rows: &[ExportRow]) -> Result<()> {
        for row in rows {
            serde_json::to_writer(&mut self.writer, row).context("failed to serialise export row")?;
            self.writer
                .write_all(b"\n")
                .context("failed to write export row")?;
        }
        self.writer.flush().context("failed to flush export sink")
    }
}
