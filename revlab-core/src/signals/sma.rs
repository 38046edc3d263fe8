//! Rolling arithmetic mean over close prices.
//!
//! Output is aligned to the input: indices before the window fills are NaN,
//! and any window containing a NaN close yields NaN (missing data never
//! contributes silently to a mean).

/// Rolling mean of `values` over `window`. Output length equals input
/// length; the first `window - 1` entries are NaN.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    assert!(window >= 1, "window must be >= 1");

    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < window {
        return result;
    }

    let mut sum = 0.0;
    let mut nan_in_window = false;
    for &v in values.iter().take(window) {
        if v.is_nan() {
            nan_in_window = true;
        }
        sum += v;
    }
    if !nan_in_window {
        result[window - 1] = sum / window as f64;
    }

    for i in window..n {
        let leaving = values[i - window];
        let entering = values[i];
        sum = sum - leaving + entering;

        // A rolled sum is poisoned once NaN enters it; rescan the window
        // whenever NaN is (or was) involved.
        if entering.is_nan() || leaving.is_nan() || nan_in_window {
            nan_in_window = false;
            sum = 0.0;
            for &v in &values[(i + 1 - window)..=i] {
                if v.is_nan() {
                    nan_in_window = true;
                }
                sum += v;
            }
            if nan_in_window {
                continue;
            }
        }

        result[i] = sum / window as f64;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn rolling_mean_basic() {
        let values = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0];
        let result = rolling_mean(&values, 5);

        assert_eq!(result.len(), 7);
        for v in &result[..4] {
            assert!(v.is_nan());
        }
        assert_approx(result[4], 12.0, DEFAULT_EPSILON);
        assert_approx(result[5], 13.0, DEFAULT_EPSILON);
        assert_approx(result[6], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn window_one_is_identity() {
        let values = [100.0, 200.0, 300.0];
        let result = rolling_mean(&values, 1);
        assert_eq!(result, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn nan_poisons_only_its_windows() {
        let mut values = vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0];
        values[2] = f64::NAN;
        let result = rolling_mean(&values, 3);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
        assert_approx(result[5], 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn short_input_is_all_nan() {
        let result = rolling_mean(&[10.0, 11.0], 5);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn mean_matches_naive_slice_mean() {
        let values: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64) * 0.7).collect();
        let window = 21;
        let result = rolling_mean(&values, window);
        for i in (window - 1)..values.len() {
            let naive: f64 =
                values[i + 1 - window..=i].iter().sum::<f64>() / window as f64;
            assert_approx(result[i], naive, 1e-9);
        }
    }
}
