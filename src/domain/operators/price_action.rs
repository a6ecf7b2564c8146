//! Bar-shape operators: pullbacks, candle patterns, gaps and range position.

use super::{ATR, ConditionFn, Side};
use crate::domain::series::value_at;

/// Side::Up (`pullback_to`): the low dips to within `tol * atr` of the level
/// and the bar closes back above it.
/// Side::Down (`pullback_below`): the high reaches to within `tol * atr` of
/// the level and the bar closes back below it.
pub fn pullback(level_col: String, tolerance_atr_mult: f64, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        let (Some(level), Some(atr)) = (value_at(bars, idx, &level_col), value_at(bars, idx, ATR))
        else {
            return false;
        };
        let tolerance = tolerance_atr_mult * atr;
        match side {
            Side::Up => match (value_at(bars, idx, "low"), value_at(bars, idx, "close")) {
                (Some(low), Some(close)) => low <= level + tolerance && close > level,
                _ => false,
            },
            Side::Down => match (value_at(bars, idx, "high"), value_at(bars, idx, "close")) {
                (Some(high), Some(close)) => high >= level - tolerance && close < level,
                _ => false,
            },
        }
    })
}

/// Pattern column positive (Up, bullish) or negative (Down, bearish).
pub fn candle(pattern_col: String, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| match value_at(bars, idx, &pattern_col) {
        Some(v) => match side {
            Side::Up => v > 0.0,
            Side::Down => v < 0.0,
        },
        None => false,
    })
}

/// Open gaps beyond the prior close by more than `atr_mult * atr`.
pub fn gap(atr_mult: f64, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        if idx < 1 {
            return false;
        }
        let (Some(open), Some(prev_close), Some(atr)) = (
            value_at(bars, idx, "open"),
            value_at(bars, idx - 1, "close"),
            value_at(bars, idx, ATR),
        ) else {
            return false;
        };
        match side {
            Side::Up => open > prev_close + atr_mult * atr,
            Side::Down => open < prev_close - atr_mult * atr,
        }
    })
}

/// Close sits in the top (Up) or bottom (Down) `pct` fraction of the bar's range.
pub fn in_pct_of_range(pct: f64, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        let (Some(high), Some(low), Some(close)) = (
            value_at(bars, idx, "high"),
            value_at(bars, idx, "low"),
            value_at(bars, idx, "close"),
        ) else {
            return false;
        };
        if high == low {
            return false;
        }
        let position = (close - low) / (high - low);
        match side {
            Side::Up => position >= 1.0 - pct,
            Side::Down => position <= pct,
        }
    })
}

/// Current bar's high-low range is the smallest of the trailing `lookback` bars.
pub fn narrowest_range(lookback: usize) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        if idx + 1 < lookback {
            return false;
        }
        let range = |i: usize| Some(value_at(bars, i, "high")? - value_at(bars, i, "low")?);
        let Some(current) = range(idx) else {
            return false;
        };
        ((idx + 1 - lookback)..idx).all(|i| matches!(range(i), Some(r) if r >= current))
    })
}

/// Bar range exceeds `multiplier * atr`.
pub fn range_exceeds_atr(multiplier: f64) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        let (Some(high), Some(low), Some(atr)) = (
            value_at(bars, idx, "high"),
            value_at(bars, idx, "low"),
            value_at(bars, idx, ATR),
        ) else {
            return false;
        };
        high - low > multiplier * atr
    })
}
