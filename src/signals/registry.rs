// =============================================================================
// Signal Registry — one aggregation session's named signals
// =============================================================================
//
// States:
//   empty     — nothing registered; `composite` fails for any weight key.
//   populated — at least one signal; `composite` succeeds iff every weight key
//               is registered.
//
// All registered signals share one timestamp index, fixed by the first
// registration.  `composite` never writes back into the store: the composite
// column lives only in the returned `CompositeResult`.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::weighted_score::{weighted_sum, CompositeResult, WeightVector, COMPOSITE_COLUMN};
use crate::error::{Result, SignalError};
use crate::frame::{Frame, TimeSeries};
use crate::indicators::{Indicator, IndicatorSpec};

#[derive(Debug, Clone, Default)]
pub struct SignalRegistry {
    index: Option<Vec<DateTime<Utc>>>,
    signals: Vec<(String, Vec<f64>)>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// The shared index, once a signal has been registered.
    pub fn index(&self) -> Option<&[DateTime<Utc>]> {
        self.index.as_deref()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.signals.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.signals.iter().any(|(n, _)| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.signals
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Store `series` under `name`, replacing any signal already registered
    /// under that name.
    ///
    /// The series must carry exactly the registry's index.  The only exception
    /// is overwriting the sole registered signal, which re-bases the index.
    /// `Composite_Signal` is reserved for the composite output.
    pub fn register(&mut self, name: impl Into<String>, series: TimeSeries) -> Result<()> {
        let name = name.into();
        if name == COMPOSITE_COLUMN {
            return Err(SignalError::ReservedName { name });
        }
        let rebases = self.signals.is_empty()
            || (self.signals.len() == 1 && self.signals[0].0 == name);

        if !rebases {
            if let Some(index) = &self.index {
                check_alignment(&name, index, series.index())?;
            }
        }

        let len = series.len();
        let values = series.values().to_vec();
        if rebases {
            self.index = Some(series.index().to_vec());
        }

        match self.signals.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = values,
            None => self.signals.push((name.clone(), values)),
        }

        debug!(signal = %name, rows = len, total = self.signals.len(), "signal registered");
        Ok(())
    }

    /// Register column `column` of `data` under `name`.
    pub fn register_column(&mut self, data: &Frame, column: &str, name: impl Into<String>) -> Result<()> {
        let series = data.series(column).ok_or_else(|| SignalError::MissingColumn {
            column: column.to_string(),
        })?;
        self.register(name, series)
    }

    /// Remove a signal.  Removing the last one returns the registry to empty.
    pub fn remove(&mut self, name: &str) -> Option<Vec<f64>> {
        let pos = self.signals.iter().position(|(n, _)| n == name)?;
        let (_, values) = self.signals.remove(pos);
        if self.signals.is_empty() {
            self.index = None;
        }
        Some(values)
    }

    /// Weighted sum of the signals named in `weights`, alongside every
    /// registered signal column.
    ///
    /// Fails with [`SignalError::MissingSignals`] listing every weight key that
    /// has no registered signal.  Calling it repeatedly on the same state gives
    /// identical results.
    pub fn composite(&self, weights: &WeightVector) -> Result<CompositeResult> {
        let missing: Vec<String> = weights
            .names()
            .filter(|name| !self.contains(name))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(SignalError::MissingSignals { names: missing });
        }

        let index = self.index.clone().unwrap_or_default();
        let rows = index.len();

        let terms = weights.iter().filter_map(|(name, &w)| self.get(name).map(|v| (v, w)));
        let total = weighted_sum(rows, terms);

        let mut frame = Frame::new(index);
        for (name, values) in &self.signals {
            frame.insert_column(name.clone(), values.clone())?;
        }
        frame.insert_column(COMPOSITE_COLUMN, total)?;

        debug!(
            rows,
            signals = self.signals.len(),
            weighted = weights.len(),
            "composite computed"
        );
        Ok(CompositeResult::new(frame))
    }

    /// Run `indicator` over `data`, register its `signal_column` under `name`
    /// and return the indicator's full output.
    ///
    /// Nothing is registered when the column is absent from the output.
    pub fn register_with(
        &mut self,
        indicator: &dyn Indicator,
        data: &Frame,
        signal_column: &str,
        name: impl Into<String>,
    ) -> Result<Frame> {
        let output = indicator.calculate(data)?;
        let series = output
            .series(signal_column)
            .ok_or_else(|| SignalError::MissingColumn {
                column: signal_column.to_string(),
            })?;
        self.register(name, series)?;
        debug!(indicator = indicator.name(), column = signal_column, "indicator computed");
        Ok(output)
    }

    /// Build the indicator described by `spec`, run it over `data`, register
    /// `signal_column` of its output under `name`, and return the output.
    pub fn register_and_compute(
        &mut self,
        spec: &IndicatorSpec,
        data: &Frame,
        signal_column: &str,
        name: impl Into<String>,
    ) -> Result<Frame> {
        let indicator = spec.build()?;
        self.register_with(indicator.as_ref(), data, signal_column, name)
    }

    /// [`register_and_compute`](Self::register_and_compute) with the
    /// indicator's designated signal column, registered under its own name.
    pub fn register_indicator(&mut self, spec: &IndicatorSpec, data: &Frame) -> Result<Frame> {
        let column = spec.signal_column();
        self.register_and_compute(spec, data, column, column)
    }
}

fn check_alignment(name: &str, expected: &[DateTime<Utc>], actual: &[DateTime<Utc>]) -> Result<()> {
    if expected.len() != actual.len() {
        return Err(SignalError::IndexMismatch {
            name: name.to_string(),
            reason: format!("expected {} rows, got {}", expected.len(), actual.len()),
        });
    }
    if let Some(row) = expected.iter().zip(actual).position(|(a, b)| a != b) {
        return Err(SignalError::IndexMismatch {
            name: name.to_string(),
            reason: format!(
                "timestamp {} at row {row} does not match {}",
                actual[row], expected[row]
            ),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{MacdParams, RsiParams, VolumeParams};
    use crate::types::Bar;
    use chrono::TimeZone;

    fn index(n: usize) -> Vec<DateTime<Utc>> {
        (0..n)
            .map(|i| Utc.timestamp_opt(1_700_000_000 + 86_400 * i as i64, 0).unwrap())
            .collect()
    }

    fn series(values: &[f64]) -> TimeSeries {
        TimeSeries::new(index(values.len()), values.to_vec()).unwrap()
    }

    fn sample_registry() -> SignalRegistry {
        let mut reg = SignalRegistry::new();
        reg.register("sig1", series(&[1.0, 0.0, 1.0])).unwrap();
        reg.register("sig2", series(&[0.0, 1.0, 0.0])).unwrap();
        reg.register("sig3", series(&[1.0, 1.0, 0.0])).unwrap();
        reg
    }

    fn sample_weights() -> WeightVector {
        WeightVector::new()
            .with("sig1", 0.5)
            .with("sig2", 0.3)
            .with("sig3", 0.2)
    }

    fn bars(n: usize) -> Vec<Bar> {
        index(n)
            .into_iter()
            .enumerate()
            .map(|(i, ts)| {
                let close = 100.0 + 5.0 * ((i as f64) / 4.0).sin();
                Bar {
                    timestamp: ts,
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: if i % 9 == 0 { 5_000.0 } else { 1_000.0 },
                }
            })
            .collect()
    }

    /// An indicator whose output lacks the column it claims to designate.
    struct Misconfigured;

    impl Indicator for Misconfigured {
        fn name(&self) -> &'static str {
            "misconfigured"
        }

        fn signal_column(&self) -> &'static str {
            "Nope_Signal"
        }

        fn calculate(&self, data: &Frame) -> Result<Frame> {
            Ok(data.clone())
        }
    }

    // ---- composite -------------------------------------------------------

    #[test]
    fn composite_weighted_sum() {
        let result = sample_registry().composite(&sample_weights()).unwrap();
        let expected = [0.7, 0.5, 0.5];
        assert_eq!(result.len(), 3);
        for (a, b) in result.composite().iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12, "got {a}, expected {b}");
        }
    }

    #[test]
    fn composite_passes_through_every_signal() {
        let reg = sample_registry();
        let weights = WeightVector::new().with("sig2", 1.0);
        let result = reg.composite(&weights).unwrap();
        assert_eq!(
            result.frame().column_names(),
            vec!["sig1", "sig2", "sig3", "Composite_Signal"]
        );
        assert_eq!(result.frame().column("sig1").unwrap(), &[1.0, 0.0, 1.0]);
        assert_eq!(result.composite(), &[0.0, 1.0, 0.0]);
        assert_eq!(result.index(), reg.index().unwrap());
    }

    #[test]
    fn composite_is_idempotent_and_does_not_mutate() {
        let reg = sample_registry();
        let first = reg.composite(&sample_weights()).unwrap();
        let second = reg.composite(&sample_weights()).unwrap();
        let bits = |r: &CompositeResult| r.composite().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first), bits(&second));
        assert_eq!(first, second);
        assert_eq!(reg.names(), vec!["sig1", "sig2", "sig3"]);
    }

    #[test]
    fn composite_names_single_missing_signal() {
        let weights = sample_weights().with("sig4", 0.1);
        let err = sample_registry().composite(&weights).unwrap_err();
        assert_eq!(
            err,
            SignalError::MissingSignals {
                names: vec!["sig4".into()]
            }
        );
        assert!(err.to_string().contains("sig4"));
    }

    #[test]
    fn composite_names_every_missing_signal() {
        let weights = sample_weights().with("sig5", 0.1).with("sig4", 0.1);
        match sample_registry().composite(&weights) {
            Err(SignalError::MissingSignals { names }) => {
                assert_eq!(names, vec!["sig4".to_string(), "sig5".to_string()]);
            }
            other => panic!("expected MissingSignals, got {other:?}"),
        }
    }

    #[test]
    fn empty_registry_fails_for_any_weight() {
        let reg = SignalRegistry::new();
        let err = reg.composite(&WeightVector::new().with("x", 1.0)).unwrap_err();
        assert!(matches!(err, SignalError::MissingSignals { .. }));
    }

    #[test]
    fn empty_registry_with_no_weights_is_zero_rows() {
        let result = SignalRegistry::new().composite(&WeightVector::new()).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.latest(), None);
    }

    #[test]
    fn empty_weights_give_zero_composite() {
        let result = sample_registry().composite(&WeightVector::new()).unwrap();
        assert_eq!(result.composite(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn zero_row_signals_give_zero_row_composite() {
        let mut reg = SignalRegistry::new();
        reg.register("a", series(&[])).unwrap();
        let result = reg.composite(&WeightVector::new().with("a", 1.0)).unwrap();
        assert!(result.is_empty());
        assert!(result.frame().has_column("a"));
    }

    // ---- register --------------------------------------------------------

    #[test]
    fn register_rejects_length_mismatch() {
        let mut reg = sample_registry();
        let err = reg.register("short", series(&[1.0, 0.0])).unwrap_err();
        assert!(matches!(err, SignalError::IndexMismatch { ref name, .. } if name == "short"));
        assert!(!reg.contains("short"));
    }

    #[test]
    fn register_rejects_shifted_timestamps() {
        let mut reg = sample_registry();
        let shifted = TimeSeries::new(index(4)[1..].to_vec(), vec![1.0, 1.0, 1.0]).unwrap();
        assert!(matches!(
            reg.register("shifted", shifted),
            Err(SignalError::IndexMismatch { .. })
        ));
    }

    #[test]
    fn register_rejects_composite_column_name() {
        let mut reg = SignalRegistry::new();
        reg.register("a", series(&[1.0, 1.0])).unwrap();
        let err = reg
            .register(COMPOSITE_COLUMN, series(&[5.0, 6.0]))
            .unwrap_err();
        assert_eq!(
            err,
            SignalError::ReservedName {
                name: COMPOSITE_COLUMN.into()
            }
        );
        assert_eq!(reg.names(), vec!["a"]);

        let result = reg.composite(&WeightVector::new().with("a", 1.0)).unwrap();
        assert_eq!(result.signal_names(), vec!["a"]);
        assert_eq!(result.composite(), &[1.0, 1.0]);
    }

    #[test]
    fn register_column_rejects_composite_column_name() {
        let mut frame = Frame::new(index(2));
        frame.insert_column("x", vec![1.0, 0.0]).unwrap();
        let mut reg = SignalRegistry::new();
        assert!(matches!(
            reg.register_column(&frame, "x", COMPOSITE_COLUMN),
            Err(SignalError::ReservedName { .. })
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn continuous_signal_warm_up_does_not_blank_composite() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + (i % 3) as f64).collect();
        let bars: Vec<Bar> = index(20)
            .into_iter()
            .zip(&closes)
            .map(|(ts, &close)| Bar {
                timestamp: ts,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect();
        let frame = Frame::from_bars(&bars);

        let mut reg = SignalRegistry::new();
        let out = reg
            .register_and_compute(&IndicatorSpec::Rsi(RsiParams::default()), &frame, "RSI", "rsi")
            .unwrap();
        reg.register_column(&frame, "Close", "close").unwrap();

        let weights = WeightVector::new().with("rsi", 0.01).with("close", 1.0);
        let result = reg.composite(&weights).unwrap();
        let rsi = out.column("RSI").unwrap();
        for (i, &v) in result.composite().iter().enumerate() {
            let expected = if rsi[i].is_nan() {
                closes[i]
            } else {
                0.01 * rsi[i] + closes[i]
            };
            assert!((v - expected).abs() < 1e-9, "row {i}: got {v}, expected {expected}");
        }
        // undefined cells still pass through unchanged
        assert!(result.frame().column("rsi").unwrap()[0].is_nan());
    }

    #[test]
    fn register_overwrites_in_place() {
        let mut reg = sample_registry();
        reg.register("sig1", series(&[0.0, 0.0, 0.0])).unwrap();
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.names(), vec!["sig1", "sig2", "sig3"]);
        assert_eq!(reg.get("sig1").unwrap(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn overwriting_sole_signal_rebases_index() {
        let mut reg = SignalRegistry::new();
        reg.register("only", series(&[1.0, 2.0])).unwrap();
        reg.register("only", series(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(reg.index().unwrap().len(), 3);
    }

    #[test]
    fn removing_last_signal_empties_registry() {
        let mut reg = SignalRegistry::new();
        reg.register("a", series(&[1.0])).unwrap();
        assert_eq!(reg.remove("a"), Some(vec![1.0]));
        assert!(reg.is_empty());
        assert!(reg.index().is_none());
        reg.register("b", series(&[1.0, 2.0])).unwrap();
        assert_eq!(reg.len(), 1);
    }

    // ---- register_and_compute --------------------------------------------

    #[test]
    fn register_and_compute_returns_full_output() {
        let frame = Frame::from_bars(&bars(40));
        let mut reg = SignalRegistry::new();
        let out = reg
            .register_and_compute(
                &IndicatorSpec::Macd(MacdParams::default()),
                &frame,
                "MACD_Signal",
                "trend",
            )
            .unwrap();
        assert!(out.has_column("EMA_short"));
        assert!(out.has_column("Signal_Line"));
        assert!(out.has_column("Close"));
        assert_eq!(reg.names(), vec!["trend"]);
        assert_eq!(reg.get("trend").unwrap(), out.column("MACD_Signal").unwrap());
    }

    #[test]
    fn register_and_compute_missing_column() {
        let frame = Frame::from_bars(&bars(20));
        let mut reg = SignalRegistry::new();
        let err = reg
            .register_and_compute(
                &IndicatorSpec::Rsi(RsiParams::default()),
                &frame,
                "MACD_Signal",
                "MACD_Signal",
            )
            .unwrap_err();
        assert_eq!(
            err,
            SignalError::MissingColumn {
                column: "MACD_Signal".into()
            }
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn register_with_misconfigured_indicator() {
        let frame = Frame::from_bars(&bars(5));
        let mut reg = SignalRegistry::new();
        let indicator = Misconfigured;
        let err = reg
            .register_with(&indicator, &frame, indicator.signal_column(), "x")
            .unwrap_err();
        assert!(matches!(err, SignalError::MissingColumn { .. }));
    }

    #[test]
    fn three_indicators_end_to_end() {
        let frame = Frame::from_bars(&bars(60));
        let mut reg = SignalRegistry::new();
        for spec in [
            IndicatorSpec::Macd(MacdParams::default()),
            IndicatorSpec::Rsi(RsiParams::default()),
            IndicatorSpec::VolumeSpike(VolumeParams::default()),
        ] {
            reg.register_indicator(&spec, &frame).unwrap();
        }
        let weights = WeightVector::new()
            .with("MACD_Signal", 0.4)
            .with("RSI_Signal", 0.3)
            .with("Volume_Signal", 0.3);
        let result = reg.composite(&weights).unwrap();
        assert_eq!(result.len(), 60);
        for &v in result.composite() {
            assert!((0.0..=1.0 + 1e-12).contains(&v), "composite {v} out of range");
        }
    }

    #[test]
    fn empty_data_registers_zero_rows() {
        let frame = Frame::from_bars(&[]);
        let mut reg = SignalRegistry::new();
        let out = reg
            .register_indicator(&IndicatorSpec::Rsi(RsiParams::default()), &frame)
            .unwrap();
        assert!(out.is_empty());
        let result = reg.composite(&WeightVector::new().with("RSI_Signal", 1.0)).unwrap();
        assert!(result.is_empty());
    }
}
