//! Crossover signal detection over two optional-valued series.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Bullish,
    Bearish,
    Hold,
}

/// Crossover of `fast` against `slow` at bar `i`.
///
/// Both bars `i-1` and `i` must be defined in both series; anything missing
/// (warm-up, index out of range, `i == 0`) is `Hold`.
pub fn crossover_at(fast: &[Option<f64>], slow: &[Option<f64>], i: usize) -> Signal {
    if i == 0 {
        return Signal::Hold;
    }
    let values = (
        fast.get(i - 1).copied().flatten(),
        slow.get(i - 1).copied().flatten(),
        fast.get(i).copied().flatten(),
        slow.get(i).copied().flatten(),
    );
    let (Some(fast_prev), Some(slow_prev), Some(fast_cur), Some(slow_cur)) = values else {
        return Signal::Hold;
    };

    if fast_prev <= slow_prev && fast_cur > slow_cur {
        Signal::Bullish
    } else if fast_prev >= slow_prev && fast_cur < slow_cur {
        Signal::Bearish
    } else {
        Signal::Hold
    }
}

/// Signal for every bar; the result is as long as the shorter input.
pub fn crossover_signals(fast: &[Option<f64>], slow: &[Option<f64>]) -> Vec<Signal> {
    let len = fast.len().min(slow.len());
    (0..len).map(|i| crossover_at(fast, slow, i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defined(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn bullish_cross() {
        let fast = defined(&[1.0, 3.0]);
        let slow = defined(&[2.0, 2.0]);
        assert_eq!(crossover_at(&fast, &slow, 1), Signal::Bullish);
    }

    #[test]
    fn bearish_cross() {
        let fast = defined(&[3.0, 1.0]);
        let slow = defined(&[2.0, 2.0]);
        assert_eq!(crossover_at(&fast, &slow, 1), Signal::Bearish);
    }

    #[test]
    fn touching_then_crossing_counts() {
        let fast = defined(&[2.0, 2.5]);
        let slow = defined(&[2.0, 2.0]);
        assert_eq!(crossover_at(&fast, &slow, 1), Signal::Bullish);
        let fast = defined(&[2.0, 1.5]);
        assert_eq!(crossover_at(&fast, &slow, 1), Signal::Bearish);
    }

    #[test]
    fn equal_after_is_hold() {
        let fast = defined(&[1.0, 2.0]);
        let slow = defined(&[2.0, 2.0]);
        assert_eq!(crossover_at(&fast, &slow, 1), Signal::Hold);
    }

    #[test]
    fn first_bar_and_out_of_range_hold() {
        let fast = defined(&[1.0, 3.0]);
        let slow = defined(&[2.0, 2.0]);
        assert_eq!(crossover_at(&fast, &slow, 0), Signal::Hold);
        assert_eq!(crossover_at(&fast, &slow, 5), Signal::Hold);
    }

    #[test]
    fn undefined_values_hold() {
        let fast = vec![None, Some(3.0)];
        let slow = defined(&[2.0, 2.0]);
        assert_eq!(crossover_at(&fast, &slow, 1), Signal::Hold);
    }

    #[test]
    fn sustained_divergence_fires_once() {
        let fast = defined(&[1.0, 3.0, 4.0, 5.0, 6.0]);
        let slow = defined(&[2.0, 2.0, 2.0, 2.0, 2.0]);
        let signals = crossover_signals(&fast, &slow);
        assert_eq!(
            signals,
            vec![Signal::Hold, Signal::Bullish, Signal::Hold, Signal::Hold, Signal::Hold]
        );
    }

    #[test]
    fn signals_length_follows_shorter_input() {
        let fast = defined(&[1.0, 2.0, 3.0]);
        let slow = defined(&[1.0, 2.0]);
        assert_eq!(crossover_signals(&fast, &slow).len(), 2);
    }
}
