// =============================================================================
// Relative Strength Index (RSI) — simple rolling means
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — Bar-over-bar change: delta_t = close_t - close_{t-1}.  Bar 0 has no
//          previous close, so its delta is undefined.
// Step 2 — gain_t = max(delta_t, 0), loss_t = max(-delta_t, 0).
// Step 3 — Rolling simple mean of gains and losses over `period` deltas.
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// The first `period` bars lack a full window of deltas and are NaN.  When the
// average loss is zero, RSI is pinned to 100.
//
// Thresholds:  RSI > 70 => OVERBOUGHT,  RSI < 30 => OVERSOLD.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::rolling::rolling_mean;
use super::{flag, input_column, Indicator};
use crate::error::{Result, SignalError};
use crate::frame::Frame;

pub const RSI_COLUMN: &str = "RSI";
pub const SIGNAL_COLUMN: &str = "RSI_Signal";
pub const BUY_COLUMN: &str = "RSI_Buy";
pub const SELL_COLUMN: &str = "RSI_Sell";

fn default_period() -> usize {
    14
}

fn default_overbought() -> f64 {
    70.0
}

fn default_oversold() -> f64 {
    30.0
}

fn default_column() -> String {
    "Close".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiParams {
    #[serde(default = "default_period")]
    pub period: usize,

    /// RSI strictly above this is overbought (sell side).
    #[serde(default = "default_overbought")]
    pub overbought: f64,

    /// RSI strictly below this is oversold (buy side).
    #[serde(default = "default_oversold")]
    pub oversold: f64,

    #[serde(default = "default_column")]
    pub column: String,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: default_period(),
            overbought: default_overbought(),
            oversold: default_oversold(),
            column: default_column(),
        }
    }
}

/// Compute the RSI series for `closes` over `period`.
///
/// One output per input; the first `period` values are NaN.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 {
        return Vec::new();
    }

    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
        let delta = if i == 0 {
            f64::NAN
        } else {
            closes[i] - closes[i - 1]
        };
        if delta.is_nan() {
            gains.push(f64::NAN);
            losses.push(f64::NAN);
        } else {
            gains.push(delta.max(0.0));
            losses.push((-delta).max(0.0));
        }
    }

    let avg_gain = rolling_mean(&gains, period);
    let avg_loss = rolling_mean(&losses, period);

    avg_gain
        .iter()
        .zip(avg_loss.iter())
        .map(|(&g, &l)| rsi_from_averages(g, l))
        .collect()
}

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - Undefined averages give NaN.
/// - Zero average loss gives 100.0, including the no-movement case.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        return f64::NAN;
    }
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// RSI oscillator indicator.
///
/// Appends `RSI`, `RSI_Signal` (overbought or oversold), `RSI_Buy`
/// (oversold) and `RSI_Sell` (overbought).
#[derive(Debug, Clone)]
pub struct Rsi {
    params: RsiParams,
}

impl Rsi {
    pub fn new(params: RsiParams) -> Result<Self> {
        if params.period == 0 {
            return Err(SignalError::invalid("RSI", "period must be at least 1"));
        }
        if !(params.oversold < params.overbought) {
            return Err(SignalError::invalid(
                "RSI",
                format!(
                    "oversold level {} must be below overbought level {}",
                    params.oversold, params.overbought
                ),
            ));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &RsiParams {
        &self.params
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &'static str {
        "RSI"
    }

    fn signal_column(&self) -> &'static str {
        SIGNAL_COLUMN
    }

    fn calculate(&self, data: &Frame) -> Result<Frame> {
        let closes = input_column(data, &self.params.column)?;
        let rsi = calculate_rsi(closes, self.params.period);

        let overbought: Vec<bool> = rsi.iter().map(|&v| v > self.params.overbought).collect();
        let oversold: Vec<bool> = rsi.iter().map(|&v| v < self.params.oversold).collect();

        let signal = overbought
            .iter()
            .zip(&oversold)
            .map(|(&ob, &os)| flag(ob || os))
            .collect();
        let buy = oversold.iter().map(|&os| flag(os)).collect();
        let sell = overbought.iter().map(|&ob| flag(ob)).collect();

        let mut out = data.clone();
        out.insert_column(RSI_COLUMN, rsi)?;
        out.insert_column(SIGNAL_COLUMN, signal)?;
        out.insert_column(BUY_COLUMN, buy)?;
        out.insert_column(SELL_COLUMN, sell)?;
        Ok(out)
    }
}
