// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_0      = value_0
//   EMA_t      = value_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// Seeding from the first value means the series has no warm-up gap: every bar,
// including bar 0, carries a defined EMA.
// =============================================================================

/// Smoothing factor for a `period`-bar EMA.
pub fn ema_multiplier(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// Compute the EMA series for `values` over look-back `period`.
///
/// The output has exactly one element per input element.
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - empty input => empty vec
/// - A non-finite input poisons every later value; it is not skipped.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.is_empty() {
        return Vec::new();
    }

    let multiplier = ema_multiplier(period);
    let mut result = Vec::with_capacity(values.len());
    let mut prev = values[0];
    result.push(prev);

    for &value in &values[1..] {
        prev = value * multiplier + prev * (1.0 - multiplier);
        result.push(prev);
    }

    result
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_empty_input() {
        assert!(calculate_ema(&[], 5).is_empty());
    }

    #[test]
    fn ema_period_zero() {
        assert!(calculate_ema(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn ema_seeds_from_first_value() {
        let ema = calculate_ema(&[42.0, 43.0, 44.0], 12);
        assert_eq!(ema.len(), 3);
        assert_eq!(ema[0], 42.0);
        assert!(ema.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn ema_known_values() {
        // multiplier for period 3 = 0.5
        let ema = calculate_ema(&[2.0, 4.0, 8.0, 8.0], 3);
        let expected = [2.0, 3.0, 5.5, 6.75];
        for (a, b) in ema.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-10, "got {a}, expected {b}");
        }
    }

    #[test]
    fn ema_of_flat_series_is_flat() {
        let ema = calculate_ema(&[100.0; 30], 9);
        for &v in &ema {
            assert!((v - 100.0).abs() < 1e-10);
        }
    }

    #[test]
    fn ema_period_one_tracks_input() {
        let values = [1.0, 5.0, 3.0];
        assert_eq!(calculate_ema(&values, 1), values.to_vec());
    }
}
