//! Directional and state-holding operators.

use super::{ConditionFn, Side, crossed};
use crate::domain::series::{BarData, value_at};

/// Every one of the `n` steps ending at `idx` moves strictly in `side`'s direction.
fn strictly_moving(bars: &[BarData], idx: usize, col: &str, n: usize, side: Side) -> bool {
    if idx < n {
        return false;
    }
    ((idx + 1 - n)..=idx).all(|i| {
        match (value_at(bars, i, col), value_at(bars, i - 1, col)) {
            (Some(curr), Some(prev)) => match side {
                Side::Up => curr > prev,
                Side::Down => curr < prev,
            },
            _ => false,
        }
    })
}

/// `col` strictly rising (Up) or falling (Down) over the last `n` bars.
pub fn directional(col: String, n: usize, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| strictly_moving(bars, idx, &col, n, side))
}

/// Close strictly higher (Up) or lower (Down) for `n` consecutive bars.
pub fn consecutive_closes(n: usize, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| strictly_moving(bars, idx, "close", n, side))
}

/// `col` strictly above (Up) or below (Down) `threshold` on each of the last `n` bars.
pub fn held(col: String, threshold: f64, n: usize, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        if idx + 1 < n {
            return false;
        }
        ((idx + 1 - n)..=idx).all(|i| match value_at(bars, i, &col) {
            Some(v) => match side {
                Side::Up => v > threshold,
                Side::Down => v < threshold,
            },
            None => false,
        })
    })
}

/// Side::Up: `col` was below `threshold` within the lookback and crosses above it now.
/// Side::Down: was above, crosses below.
pub fn was_then_crosses(col: String, threshold: f64, lookback: usize, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        if idx < lookback || idx < 1 {
            return false;
        }
        let (Some(curr), Some(prev)) = (value_at(bars, idx, &col), value_at(bars, idx - 1, &col))
        else {
            return false;
        };
        if !crossed(side, prev, threshold, curr, threshold) {
            return false;
        }
        ((idx - lookback)..idx).any(|i| match value_at(bars, i, &col) {
            Some(v) => match side {
                Side::Up => v < threshold,
                Side::Down => v > threshold,
            },
            None => false,
        })
    })
}

/// `|col| <= epsilon`: a slope column close to zero.
pub fn flat_slope(col: String, epsilon: f64) -> ConditionFn {
    ConditionFn::new(move |bars, idx| match value_at(bars, idx, &col) {
        Some(slope) => slope.abs() <= epsilon,
        None => false,
    })
}
