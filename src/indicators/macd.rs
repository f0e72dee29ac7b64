// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   EMA_short   = EMA(price, short_window)
//   EMA_long    = EMA(price, long_window)
//   MACD        = EMA_short - EMA_long
//   Signal_Line = EMA(MACD, signal_window)
//   Histogram   = MACD - Signal_Line
//
// Level signal: 1 while MACD is strictly above its signal line.
// Crossover flags: buy on the bar MACD crosses above the signal line, sell on
// the bar it crosses below.  Bar 0 has no previous state and never flags.
// =============================================================================

use serde::{Deserialize, Serialize};

use super::ema::calculate_ema;
use super::{flag, input_column, Indicator};
use crate::error::{Result, SignalError};
use crate::frame::Frame;

pub const EMA_SHORT_COLUMN: &str = "EMA_short";
pub const EMA_LONG_COLUMN: &str = "EMA_long";
pub const MACD_COLUMN: &str = "MACD";
pub const SIGNAL_LINE_COLUMN: &str = "Signal_Line";
pub const HISTOGRAM_COLUMN: &str = "MACD_Histogram";
pub const SIGNAL_COLUMN: &str = "MACD_Signal";
pub const BUY_COLUMN: &str = "MACD_Buy";
pub const SELL_COLUMN: &str = "MACD_Sell";

fn default_short_window() -> usize {
    12
}

fn default_long_window() -> usize {
    26
}

fn default_signal_window() -> usize {
    9
}

fn default_column() -> String {
    "Close".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacdParams {
    #[serde(default = "default_short_window")]
    pub short_window: usize,

    #[serde(default = "default_long_window")]
    pub long_window: usize,

    #[serde(default = "default_signal_window")]
    pub signal_window: usize,

    /// Price column the averages are taken over.
    #[serde(default = "default_column")]
    pub column: String,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            short_window: default_short_window(),
            long_window: default_long_window(),
            signal_window: default_signal_window(),
            column: default_column(),
        }
    }
}

/// Full set of MACD series, one value per input bar.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub ema_short: Vec<f64>,
    pub ema_long: Vec<f64>,
    pub macd: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Compute all MACD series for `prices`.
pub fn calculate_macd(prices: &[f64], params: &MacdParams) -> MacdSeries {
    let ema_short = calculate_ema(prices, params.short_window);
    let ema_long = calculate_ema(prices, params.long_window);
    let macd: Vec<f64> = ema_short
        .iter()
        .zip(&ema_long)
        .map(|(s, l)| s - l)
        .collect();
    let signal_line = calculate_ema(&macd, params.signal_window);
    let histogram = macd.iter().zip(&signal_line).map(|(m, s)| m - s).collect();

    MacdSeries {
        ema_short,
        ema_long,
        macd,
        signal_line,
        histogram,
    }
}

/// Crossover flags `(buy, sell)` for a MACD line against its signal line.
pub fn crossovers(macd: &[f64], signal_line: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = macd.len().min(signal_line.len());
    let mut buy = vec![0.0; n];
    let mut sell = vec![0.0; n];
    for i in 1..n {
        let (prev_m, prev_s) = (macd[i - 1], signal_line[i - 1]);
        let (m, s) = (macd[i], signal_line[i]);
        buy[i] = flag(prev_m <= prev_s && m > s);
        sell[i] = flag(prev_m >= prev_s && m < s);
    }
    (buy, sell)
}

/// MACD trend indicator.
#[derive(Debug, Clone)]
pub struct Macd {
    params: MacdParams,
}

impl Macd {
    pub fn new(params: MacdParams) -> Result<Self> {
        if params.short_window == 0 || params.long_window == 0 || params.signal_window == 0 {
            return Err(SignalError::invalid("MACD", "windows must be at least 1"));
        }
        if params.short_window >= params.long_window {
            return Err(SignalError::invalid(
                "MACD",
                format!(
                    "short window {} must be shorter than long window {}",
                    params.short_window, params.long_window
                ),
            ));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &MacdParams {
        &self.params
    }
}

impl Indicator for Macd {
    fn name(&self) -> &'static str {
        "MACD"
    }

    fn signal_column(&self) -> &'static str {
        SIGNAL_COLUMN
    }

    fn calculate(&self, data: &Frame) -> Result<Frame> {
        let prices = input_column(data, &self.params.column)?;
        let series = calculate_macd(prices, &self.params);

        let level = series
            .macd
            .iter()
            .zip(&series.signal_line)
            .map(|(m, s)| flag(m > s))
            .collect();
        let (buy, sell) = crossovers(&series.macd, &series.signal_line);

        let mut out = data.clone();
        out.insert_column(EMA_SHORT_COLUMN, series.ema_short)?;
        out.insert_column(EMA_LONG_COLUMN, series.ema_long)?;
        out.insert_column(MACD_COLUMN, series.macd)?;
        out.insert_column(SIGNAL_LINE_COLUMN, series.signal_line)?;
        out.insert_column(HISTOGRAM_COLUMN, series.histogram)?;
        out.insert_column(SIGNAL_COLUMN, level)?;
        out.insert_column(BUY_COLUMN, buy)?;
        out.insert_column(SELL_COLUMN, sell)?;
        Ok(out)
    }
}
