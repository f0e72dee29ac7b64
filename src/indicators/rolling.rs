// =============================================================================
// Rolling Simple Mean
// =============================================================================
//
// Trailing window mean including the current bar:
//   mean_t = (x_{t-window+1} + ... + x_t) / window
//
// Bars with fewer than `window` observations behind them are undefined and
// come out as NaN.  A NaN anywhere inside a window makes that window NaN too.

/// Rolling mean of `values` over `window` bars, one output per input.
///
/// Returns an empty vec when `window == 0`.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }

    let w = window as f64;
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                f64::NAN
            } else {
                values[i + 1 - window..=i].iter().sum::<f64>() / w
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warm_up_bars_are_nan() {
        let mean = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(mean[0].is_nan());
        assert!(mean[1].is_nan());
        assert!((mean[2] - 2.0).abs() < 1e-10);
        assert!((mean[3] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn nan_inside_window_propagates() {
        let mean = rolling_mean(&[f64::NAN, 2.0, 4.0, 6.0], 2);
        assert!(mean[1].is_nan());
        assert!((mean[2] - 3.0).abs() < 1e-10);
        assert!((mean[3] - 5.0).abs() < 1e-10);
    }

    #[test]
    fn window_longer_than_input() {
        let mean = rolling_mean(&[1.0, 2.0], 5);
        assert_eq!(mean.len(), 2);
        assert!(mean.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn zero_window_or_empty_input() {
        assert!(rolling_mean(&[1.0], 0).is_empty());
        assert!(rolling_mean(&[], 3).is_empty());
    }
}
