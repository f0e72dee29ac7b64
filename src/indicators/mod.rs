// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator calculators.  The numeric kernels
// (`calculate_ema`, `calculate_rsi`, `rolling_mean`) work on plain slices and
// return one value per input bar, with `NaN` marking warm-up bars.  The
// `Indicator` implementations wrap those kernels, read their input column from
// a `Frame`, and append their derived and signal columns to a copy of it.

pub mod ema;
pub mod macd;
pub mod rolling;
pub mod rsi;
pub mod volume;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SignalError};
use crate::frame::Frame;

pub use macd::{Macd, MacdParams};
pub use rsi::{Rsi, RsiParams};
pub use volume::{VolumeParams, VolumeSpike};

/// Common capability of every indicator: derive columns from a frame.
pub trait Indicator: Send + Sync {
    /// Short display name, used in logs and error messages.
    fn name(&self) -> &'static str;

    /// The binary column this indicator designates as its signal.
    fn signal_column(&self) -> &'static str;

    /// Return a copy of `data` with this indicator's columns appended.
    ///
    /// A zero-row frame yields a zero-row frame carrying the new (empty)
    /// columns.
    fn calculate(&self, data: &Frame) -> Result<Frame>;
}

/// Selects an indicator variant together with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorSpec {
    Macd(MacdParams),
    Rsi(RsiParams),
    VolumeSpike(VolumeParams),
}

impl IndicatorSpec {
    /// Validate the parameters and instantiate the indicator.
    pub fn build(&self) -> Result<Box<dyn Indicator>> {
        Ok(match self {
            Self::Macd(p) => Box::new(Macd::new(p.clone())?),
            Self::Rsi(p) => Box::new(Rsi::new(p.clone())?),
            Self::VolumeSpike(p) => Box::new(VolumeSpike::new(p.clone())?),
        })
    }

    /// The designated signal column of the variant.
    pub fn signal_column(&self) -> &'static str {
        match self {
            Self::Macd(_) => macd::SIGNAL_COLUMN,
            Self::Rsi(_) => rsi::SIGNAL_COLUMN,
            Self::VolumeSpike(_) => volume::SIGNAL_COLUMN,
        }
    }
}

/// Fetch the input column an indicator reads, failing loudly when absent.
pub(crate) fn input_column<'a>(data: &'a Frame, column: &str) -> Result<&'a [f64]> {
    data.column(column).ok_or_else(|| SignalError::MissingColumn {
        column: column.to_string(),
    })
}

/// `1.0` where `flag` holds, `0.0` elsewhere.
pub(crate) fn flag(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}
