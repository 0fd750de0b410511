//! Order-sensitive reductions over the most recent values of a stream.
//!
//! These look at the tail of a row sequence (insertion order), so they only
//! make sense on a table, group or window whose order is the arrival order.

/// How many trailing values `rate_of_change` and `detect_spike` inspect.
pub const RECENT_VALUES: usize = 10;

fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mean of the last `window` values; 0 when there are none.
pub fn moving_average(values: &[f64], window: usize) -> f64 {
    mean(tail(values, window)).unwrap_or(0.0)
}

/// `(last - first) / len` over the last ten values; 0 with fewer than two.
pub fn rate_of_change(values: &[f64]) -> f64 {
    let recent = tail(values, RECENT_VALUES);
    if recent.len() < 2 {
        return 0.0;
    }
    (recent[recent.len() - 1] - recent[0]) / recent.len() as f64
}

/// True when the last value exceeds `threshold` times the mean of the
/// (up to nine) values before it.
///
/// Needs at least three values and a positive baseline mean.
pub fn detect_spike(values: &[f64], threshold: f64) -> bool {
    let recent = tail(values, RECENT_VALUES);
    if recent.len() < 3 {
        return false;
    }
    let (current, baseline) = match recent.split_last() {
        Some((current, baseline)) => (*current, baseline),
        None => return false,
    };
    match mean(baseline) {
        Some(avg) if avg > 0.0 => current > avg * threshold,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moving_average() {
        assert_eq!(moving_average(&[], 5), 0.0);
        assert_eq!(moving_average(&[1.0, 2.0, 3.0], 5), 2.0);
        assert_eq!(moving_average(&[100.0, 1.0, 2.0, 3.0], 3), 2.0);
    }

    #[test]
    fn test_rate_of_change() {
        assert_eq!(rate_of_change(&[5.0]), 0.0);
        assert_eq!(rate_of_change(&[10.0, 20.0]), 5.0);

        // Only the last ten values count
        let mut values = vec![1000.0];
        values.extend((0..10).map(|i| i as f64));
        assert_eq!(rate_of_change(&values), 0.9);
    }

    #[test]
    fn test_detect_spike() {
        assert!(!detect_spike(&[10.0, 50.0], 2.0));
        assert!(detect_spike(&[10.0, 10.0, 10.0, 50.0], 2.0));
        assert!(!detect_spike(&[10.0, 10.0, 10.0, 15.0], 2.0));
        assert!(!detect_spike(&[0.0, 0.0, 50.0], 2.0));
    }
}
