// =============================================================================
// Composite Signals — technical indicators combined into one weighted score
// =============================================================================
//
// Batch, single-pass computation over a fixed historical window:
//   indicators  -> MACD, RSI and volume-spike calculators over a Frame
//   signals     -> per-session registry and weighted composite
//   pipeline    -> per-ticker sessions, sequential or on a worker pool
//   market_data -> bar source seam plus an in-memory store
//   output      -> export rows and sinks
// =============================================================================

pub mod config;
pub mod error;
pub mod frame;
pub mod indicators;
pub mod market_data;
pub mod output;
pub mod pipeline;
pub mod signals;
pub mod types;

pub use error::{Result, SignalError};
pub use frame::{Frame, TimeSeries};
pub use indicators::{Indicator, IndicatorSpec};
pub use signals::{CompositeResult, SignalRegistry, WeightVector, COMPOSITE_COLUMN};
pub use types::{Bar, DateRange, Decision, PriceField};
