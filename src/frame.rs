// =============================================================================
// Frame & TimeSeries — timestamp-indexed columnar tables
// =============================================================================
//
// A `Frame` is the table every indicator reads from and appends to: one shared
// timestamp index plus insertion-ordered, equally long `f64` columns.
// Undefined cells (indicator warm-up) are stored as `f64::NAN`.

use chrono::{DateTime, Utc};

use crate::error::{Result, SignalError};
use crate::types::{Bar, PriceField};

/// A single value column paired with the index it is aligned to.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    index: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(index: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if index.len() != values.len() {
            return Err(SignalError::LengthMismatch {
                expected: index.len(),
                actual: values.len(),
            });
        }
        Ok(Self { index, values })
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Most recent value, if any.
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    values: Vec<f64>,
}

/// Timestamp-indexed table of named `f64` columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    index: Vec<DateTime<Utc>>,
    columns: Vec<Column>,
}

impl Frame {
    /// An empty-columned frame over `index`.
    pub fn new(index: Vec<DateTime<Utc>>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Build `Open`, `High`, `Low`, `Close` and `Volume` columns from bars,
    /// preserving their order.
    pub fn from_bars(bars: &[Bar]) -> Self {
        let mut frame = Self::new(bars.iter().map(|b| b.timestamp).collect());
        for field in PriceField::ALL {
            frame.columns.push(Column {
                name: field.column().to_string(),
                values: bars.iter().map(|b| field.of(b)).collect(),
            });
        }
        frame
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Copy a column out together with the frame index.
    pub fn series(&self, name: &str) -> Option<TimeSeries> {
        self.column(name).map(|values| TimeSeries {
            index: self.index.clone(),
            values: values.to_vec(),
        })
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Append a column, or replace an existing one of the same name in place.
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        if values.len() != self.index.len() {
            return Err(SignalError::LengthMismatch {
                expected: self.index.len(),
                actual: values.len(),
            });
        }
        let name = name.into();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column { name, values }),
        }
        Ok(())
    }

    /// Iterate rows as `(timestamp, [(column, value), ...])`.
    pub fn rows(&self) -> impl Iterator<Item = (DateTime<Utc>, Vec<(&str, f64)>)> + '_ {
        self.index.iter().enumerate().map(move |(i, ts)| {
            let cells = self
                .columns
                .iter()
                .map(|c| (c.name.as_str(), c.values[i]))
                .collect();
            (*ts, cells)
        })
    }
}
