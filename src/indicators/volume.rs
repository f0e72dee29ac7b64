// =============================================================================
// Volume Spike — relative-volume indicator
// =============================================================================
//
// Compares each bar's volume against the rolling mean volume of the trailing
// `window` bars (current bar included):
//
//   spike_t = volume_t > mean_t * threshold        (strict)
//
// Buy/sell reading:
//   buy  = spike
//   sell = defined mean, no spike, and volume_t < volume_{t-1}
//
// Bars inside the warm-up window have no mean and never flag.

use serde::{Deserialize, Serialize};

use super::rolling::rolling_mean;
use super::{flag, input_column, Indicator};
use crate::error::{Result, SignalError};
use crate::frame::Frame;

pub const MEAN_COLUMN: &str = "Volume_MA";
pub const SIGNAL_COLUMN: &str = "Volume_Signal";
pub const BUY_COLUMN: &str = "Volume_Buy";
pub const SELL_COLUMN: &str = "Volume_Sell";

fn default_window() -> usize {
    20
}

fn default_threshold() -> f64 {
    1.5
}

fn default_column() -> String {
    "Volume".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeParams {
    #[serde(default = "default_window")]
    pub window: usize,

    /// Multiple of the rolling mean a bar must exceed to count as a spike.
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default = "default_column")]
    pub column: String,
}

impl Default for VolumeParams {
    fn default() -> Self {
        Self {
            window: default_window(),
            threshold: default_threshold(),
            column: default_column(),
        }
    }
}

impl VolumeParams {
    /// Parameters of the buy/sell reading, which uses a 2x multiplier.
    pub fn directional() -> Self {
        Self {
            threshold: 2.0,
            ..Self::default()
        }
    }
}

/// Volume spike indicator.
#[derive(Debug, Clone)]
pub struct VolumeSpike {
    params: VolumeParams,
}

impl VolumeSpike {
    pub fn new(params: VolumeParams) -> Result<Self> {
        if params.window == 0 {
            return Err(SignalError::invalid("volume spike", "window must be at least 1"));
        }
        if !(params.threshold > 0.0) {
            return Err(SignalError::invalid(
                "volume spike",
                format!("threshold must be positive, got {}", params.threshold),
            ));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &VolumeParams {
        &self.params
    }
}

impl Indicator for VolumeSpike {
    fn name(&self) -> &'static str {
        "volume spike"
    }

    fn signal_column(&self) -> &'static str {
        SIGNAL_COLUMN
    }

    fn calculate(&self, data: &Frame) -> Result<Frame> {
        let volumes = input_column(data, &self.params.column)?;
        let mean = rolling_mean(volumes, self.params.window);

        let spikes: Vec<bool> = volumes
            .iter()
            .zip(&mean)
            .map(|(&v, &m)| v > m * self.params.threshold)
            .collect();

        let sell = (0..volumes.len())
            .map(|i| {
                let declining = i > 0 && volumes[i] < volumes[i - 1];
                flag(!mean[i].is_nan() && !spikes[i] && declining)
            })
            .collect();
        let signal: Vec<f64> = spikes.iter().map(|&s| flag(s)).collect();

        let mut out = data.clone();
        out.insert_column(MEAN_COLUMN, mean)?;
        out.insert_column(SIGNAL_COLUMN, signal.clone())?;
        out.insert_column(BUY_COLUMN, signal)?;
        out.insert_column(SELL_COLUMN, sell)?;
        Ok(out)
    }
}
