// =============================================================================
// Core error taxonomy
// =============================================================================
//
// Every failure the indicator calculators and the signal registry can raise.
// Orchestration and configuration code wraps these in `anyhow` at the I/O
// boundary; the core itself only ever returns `crate::Result`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SignalError {
    /// One or more weight keys have no registered signal. `names` is sorted
    /// and lists every missing key.
    #[error("missing signal(s): {}", .names.join(", "))]
    MissingSignals { names: Vec<String> },

    #[error("column `{column}` not found in indicator output")]
    MissingColumn { column: String },

    #[error("signal `{name}` is not aligned with the registry index: {reason}")]
    IndexMismatch { name: String, reason: String },

    /// The name is taken by a column the composite output adds itself.
    #[error("signal name `{name}` is reserved")]
    ReservedName { name: String },

    #[error("column length mismatch: expected {expected} rows, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("invalid {indicator} parameter: {reason}")]
    InvalidParameter {
        indicator: &'static str,
        reason: String,
    },
}

impl SignalError {
    pub(crate) fn invalid(indicator: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            indicator,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SignalError>;
