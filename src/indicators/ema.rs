//! Moving averages.
//!
//! `ewm` is the single exponential smoothing primitive. It backs the price
//! EMA, the signal line, and the Wilder gain/loss averages:
//!
//! ```text
//! y[0] = x[0]
//! y[t] = alpha * x[t] + (1 - alpha) * y[t-1]
//! ```
//!
//! An EMA with span `n` uses `alpha = 2 / (n + 1)`; Wilder smoothing uses
//! `alpha = 1 / n`.

/// Exponentially weighted mean with smoothing factor `alpha`.
///
/// Leading non-finite inputs yield NaN until the first finite value seeds
/// the recurrence. A non-finite input after that carries the previous
/// average forward.
pub fn ewm(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut result = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &x in values {
        let next = match (prev, x.is_finite()) {
            (None, true) => Some(x),
            (None, false) => None,
            (Some(p), true) => Some(alpha * x + (1.0 - alpha) * p),
            (Some(p), false) => Some(p),
        };
        result.push(next.unwrap_or(f64::NAN));
        prev = next;
    }

    result
}

/// EMA with span `length`, one output per input.
///
/// Returns an empty vec for `length == 0`.
pub fn ema(values: &[f64], length: usize) -> Vec<f64> {
    if length == 0 {
        return Vec::new();
    }
    ewm(values, 2.0 / (length as f64 + 1.0))
}

/// Simple rolling mean over `length` values, one output per input.
///
/// The first `length - 1` outputs are NaN, as is any output whose window
/// contains a non-finite value.
pub fn sma(values: &[f64], length: usize) -> Vec<f64> {
    if length == 0 {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    let mut bad = 0usize;

    for (i, &x) in values.iter().enumerate() {
        if x.is_finite() {
            sum += x;
        } else {
            bad += 1;
        }

        if i >= length {
            let old = values[i - length];
            if old.is_finite() {
                sum -= old;
            } else {
                bad -= 1;
            }
        }

        if i + 1 >= length && bad == 0 {
            result.push(sum / length as f64);
        } else {
            result.push(f64::NAN);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_empty_input() {
        assert!(ema(&[], 5).is_empty());
    }

    #[test]
    fn test_ema_length_zero() {
        assert!(ema(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn test_ema_seeds_with_first_value() {
        let out = ema(&[10.0, 20.0, 30.0], 3);
        assert_eq!(out.len(), 3);
        assert!((out[0] - 10.0).abs() < 1e-12);
        // alpha = 0.5
        assert!((out[1] - 15.0).abs() < 1e-12);
        assert!((out[2] - 22.5).abs() < 1e-12);
    }

    #[test]
    fn test_ema_length_one_is_identity() {
        let closes = vec![100.0, 105.0, 103.0, 108.0, 107.0];
        assert_eq!(ema(&closes, 1), closes);
    }

    #[test]
    fn test_ema_known_values() {
        let closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let out = ema(&closes, 5);

        let alpha = 2.0 / 6.0;
        let mut expected = closes[0];
        for (i, &c) in closes.iter().enumerate().skip(1) {
            expected = alpha * c + (1.0 - alpha) * expected;
            assert!((out[i] - expected).abs() < 1e-10, "index {i}: got {}, expected {expected}", out[i]);
        }
    }

    #[test]
    fn test_ewm_skips_leading_nan_and_carries_gaps() {
        let out = ewm(&[f64::NAN, f64::NAN, 4.0, f64::NAN, 8.0], 0.5);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert_eq!(out[2], 4.0);
        assert_eq!(out[3], 4.0);
        assert_eq!(out[4], 6.0);
    }

    #[test]
    fn test_sma_warm_up_is_nan() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert!((out[2] - 2.0).abs() < 1e-12);
        assert!((out[3] - 3.0).abs() < 1e-12);
        assert!((out[4] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_sma_shorter_than_window() {
        let out = sma(&[1.0, 2.0], 50);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_sma_window_with_nan() {
        let out = sma(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert!(out[1].is_nan());
        assert!(out[2].is_nan());
        assert!((out[3] - 3.5).abs() < 1e-12);
    }
}
