//! Volatility regime operators.

use super::{ADX, ATR, ATR_SMA, BB_WIDTH, ConditionFn};
use crate::domain::series::value_at;

/// Minimum number of finite ATR samples before a percentile rank is trusted.
pub const MIN_ATR_SAMPLES: usize = 20;

/// `width_col` at `idx` is the tightest value in the trailing `lookback` window.
pub fn squeeze(width_col: String, lookback: usize) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        if idx < lookback {
            return false;
        }
        let Some(current) = value_at(bars, idx, &width_col) else {
            return false;
        };
        ((idx + 1 - lookback)..idx)
            .all(|i| matches!(value_at(bars, i, &width_col), Some(w) if w >= current))
    })
}

/// `bb_width` has strictly increased on each of the last `n` bars.
pub fn bb_width_increasing(n: usize) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        if idx < n {
            return false;
        }
        ((idx + 1 - n)..=idx).all(|i| {
            matches!(
                (value_at(bars, i, BB_WIDTH), value_at(bars, i - 1, BB_WIDTH)),
                (Some(curr), Some(prev)) if curr > prev
            )
        })
    })
}

/// `adx_14` within `[low, high]`, inclusive.
pub fn adx_in_range(low: f64, high: f64) -> ConditionFn {
    ConditionFn::new(move |bars, idx| match value_at(bars, idx, ADX) {
        Some(adx) => adx >= low && adx <= high,
        None => false,
    })
}

/// Current ATR ranks at or above the `pct` percentile of the trailing
/// `lookback` window. Needs at least [`MIN_ATR_SAMPLES`] finite samples.
pub fn atr_not_bottom_pct(pct: f64, lookback: usize) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        if idx < lookback {
            return false;
        }
        let Some(current) = value_at(bars, idx, ATR) else {
            return false;
        };
        let samples: Vec<f64> = ((idx + 1 - lookback)..=idx)
            .filter_map(|i| value_at(bars, i, ATR))
            .collect();
        if samples.len() < MIN_ATR_SAMPLES {
            return false;
        }
        let below = samples.iter().filter(|v| **v < current).count();
        let percentile = below as f64 / samples.len() as f64 * 100.0;
        percentile >= pct
    })
}

/// `atr_14 < factor * atr_sma_50`.
pub fn atr_below_contracted_sma(factor: f64) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        match (value_at(bars, idx, ATR), value_at(bars, idx, ATR_SMA)) {
            (Some(atr), Some(sma)) => atr < factor * sma,
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn squeeze_at_window_minimum() {
        let bars = column("bb_width", &[10.0, 8.0, 6.0, 4.0]);
        let f = squeeze("bb_width".into(), 3);
        assert!(f.eval(&bars, 3));
        assert!(!f.eval(&bars, 2));
    }

    #[test]
    fn squeeze_not_minimum() {
        let bars = column("bb_width", &[10.0, 3.0, 6.0, 4.0]);
        assert!(!squeeze("bb_width".into(), 3).eval(&bars, 3));
        // the 3 at idx 1 falls outside a 2-bar window
        assert!(squeeze("bb_width".into(), 2).eval(&bars, 3));
    }

    #[test]
    fn bb_width_increasing_monotonic() {
        let bars = column("bb_width", &[4.0, 5.0, 6.0, 5.5, 7.0]);
        assert!(bb_width_increasing(2).eval(&bars, 2));
        assert!(!bb_width_increasing(2).eval(&bars, 4));
        assert!(bb_width_increasing(1).eval(&bars, 4));
        assert!(!bb_width_increasing(3).eval(&bars, 2));
    }

    #[test]
    fn adx_inclusive_bounds() {
        let bars = column("adx_14", &[20.0, 25.0, 30.0, 31.0]);
        let f = adx_in_range(20.0, 30.0);
        assert!(f.eval(&bars, 0));
        assert!(f.eval(&bars, 1));
        assert!(f.eval(&bars, 2));
        assert!(!f.eval(&bars, 3));
    }

    #[test]
    fn atr_percentile_rank() {
        let values: Vec<f64> = (1..=25).map(f64::from).collect();
        let bars = column("atr_14", &values);
        // window idx 4..=24 holds 5..=25; 20 of 21 samples sit below 25
        assert!(atr_not_bottom_pct(50.0, 21).eval(&bars, 24));
        let mut falling = values.clone();
        falling.reverse();
        let bars = column("atr_14", &falling);
        assert!(!atr_not_bottom_pct(20.0, 21).eval(&bars, 24));
    }

    #[test]
    fn atr_percentile_needs_samples() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let bars = column("atr_14", &values);
        assert!(!atr_not_bottom_pct(10.0, 5).eval(&bars, 9));
    }

    #[test]
    fn atr_contracted() {
        let bars = vec![with(bar(100.0, 101.0, 99.0, 100.0), &[("atr_14", 1.5), ("atr_sma_50", 2.5)])];
        assert!(atr_below_contracted_sma(0.8).eval(&bars, 0));
        assert!(!atr_below_contracted_sma(0.5).eval(&bars, 0));
    }
}
