//! Comparison and cross operators.

use super::{ConditionFn, Operand, Side, crossed};
use crate::domain::series::value_at;

/// `col > operand` (Up) or `col < operand` (Down) at the current bar.
pub fn compare(col: String, operand: Operand, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        let Some(v) = value_at(bars, idx, &col) else {
            return false;
        };
        let Some(r) = operand.resolve(bars, idx) else {
            return false;
        };
        match side {
            Side::Up => v > r,
            Side::Down => v < r,
        }
    })
}

/// `col` crosses `operand` between `idx - 1` and `idx`.
pub fn crosses(col: String, operand: Operand, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        if idx < 1 {
            return false;
        }
        let (Some(curr_a), Some(prev_a)) = (value_at(bars, idx, &col), value_at(bars, idx - 1, &col))
        else {
            return false;
        };
        let (Some(curr_b), Some(prev_b)) = (operand.resolve(bars, idx), operand.resolve(bars, idx - 1))
        else {
            return false;
        };
        crossed(side, prev_a, prev_b, curr_a, curr_b)
    })
}

/// Close crosses the named level column.
pub fn breaks_level(level_col: String, side: Side) -> ConditionFn {
    crosses("close".to_string(), Operand::Column(level_col), side)
}
