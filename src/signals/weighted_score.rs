// =============================================================================
// Weighted Composite — per-bar weighted sum of registered signals
// =============================================================================

use std::collections::btree_map;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::frame::Frame;
use crate::types::Decision;

/// Name of the column holding the weighted sum.
pub const COMPOSITE_COLUMN: &str = "Composite_Signal";

/// Signal name -> weight.  Weights are used as given; they need not sum to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector {
    weights: BTreeMap<String, f64>,
}

impl WeightVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(name.into(), weight);
        self
    }

    /// Insert or replace a weight, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, weight: f64) -> Option<f64> {
        self.weights.insert(name.into(), weight)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.weights.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weights in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, f64> {
        self.weights.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for WeightVector {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            weights: iter.into_iter().map(|(k, w)| (k.into(), w)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a WeightVector {
    type Item = (&'a String, &'a f64);
    type IntoIter = btree_map::Iter<'a, String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.weights.iter()
    }
}

/// Sum `weight * values[row]` over every `(values, weight)` pair, row by row.
///
/// Every slice must be `len` long.  Undefined (NaN) values are skipped, so a
/// row whose terms are all undefined sums to 0.0.
pub fn weighted_sum<'a>(len: usize, terms: impl IntoIterator<Item = (&'a [f64], f64)>) -> Vec<f64> {
    let mut total = vec![0.0; len];
    for (values, weight) in terms {
        for (acc, v) in total.iter_mut().zip(values) {
            if !v.is_nan() {
                *acc += weight * v;
            }
        }
    }
    total
}

/// The registered signal columns plus their weighted sum.
///
/// Columns appear in registration order, followed by `Composite_Signal`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeResult {
    frame: Frame,
}

impl CompositeResult {
    pub(crate) fn new(frame: Frame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn into_frame(self) -> Frame {
        self.frame
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        self.frame.index()
    }

    pub fn composite(&self) -> &[f64] {
        self.frame.column(COMPOSITE_COLUMN).unwrap_or(&[])
    }

    /// Registered signal names, in registration order.
    pub fn signal_names(&self) -> Vec<&str> {
        self.frame
            .column_names()
            .into_iter()
            .filter(|n| *n != COMPOSITE_COLUMN)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Composite value of the most recent bar.
    pub fn latest(&self) -> Option<f64> {
        self.composite().last().copied()
    }

    /// Map every composite value to a [`Decision`] against `threshold`.
    pub fn decisions(&self, threshold: f64) -> Vec<Decision> {
        self.composite()
            .iter()
            .map(|&v| Decision::from_score(v, threshold))
            .collect()
    }

    pub fn latest_decision(&self, threshold: f64) -> Option<Decision> {
        self.latest().map(|v| Decision::from_score(v, threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_vector_collects_and_orders_by_name() {
        let weights: WeightVector = [("rsi", 0.3), ("macd", 0.5)].into_iter().collect();
        assert_eq!(weights.names().collect::<Vec<_>>(), vec!["macd", "rsi"]);
        assert_eq!(weights.get("rsi"), Some(0.3));
        assert_eq!(weights.get("volume"), None);
    }

    #[test]
    fn weight_vector_json_is_a_plain_map() {
        let weights = WeightVector::new().with("MACD_Signal", 0.4).with("RSI_Signal", 0.6);
        let json = serde_json::to_string(&weights).unwrap();
        assert_eq!(json, r#"{"MACD_Signal":0.4,"RSI_Signal":0.6}"#);
        let back: WeightVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, weights);
    }

    #[test]
    fn weighted_sum_rows() {
        let a = [1.0, 0.0, 1.0];
        let b = [0.0, 1.0, 1.0];
        let total = weighted_sum(3, [(&a[..], 2.0), (&b[..], -1.0)]);
        assert_eq!(total, vec![2.0, -1.0, 1.0]);
    }

    #[test]
    fn weighted_sum_skips_undefined_values() {
        let a = [f64::NAN, 2.0, f64::NAN];
        let b = [1.0, f64::NAN, f64::NAN];
        let total = weighted_sum(3, [(&a[..], 0.5), (&b[..], 3.0)]);
        assert_eq!(total, vec![3.0, 1.0, 0.0]);
    }

    #[test]
    fn weighted_sum_without_terms_is_zero() {
        assert_eq!(weighted_sum(2, Vec::<(&[f64], f64)>::new()), vec![0.0, 0.0]);
    }

    #[test]
    fn decisions_from_composite() {
        let mut frame = Frame::new(vec![Utc::now(); 3]);
        frame
            .insert_column(COMPOSITE_COLUMN, vec![0.9, 0.0, -0.9])
            .unwrap();
        let result = CompositeResult::new(frame);
        assert_eq!(
            result.decisions(0.5),
            vec![Decision::Buy, Decision::Hold, Decision::Sell]
        );
        assert_eq!(result.latest_decision(0.5), Some(Decision::Sell));
        assert!(result.signal_names().is_empty());
    }
}
