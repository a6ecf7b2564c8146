//! ATR-scaled channel operators: fixed channels, SMA envelopes, EMA ribbons,
//! deviation and mean reversion.

use super::{ATR, ConditionFn, EMA_FAST, EMA_SLOW, Side, crossed};
use crate::domain::series::{BarData, value_at};

/// `(ref_col - col)` (Down) or `(col - ref_col)` (Up) exceeds `atr_mult * atr`.
pub fn deviation(col: String, ref_col: String, atr_mult: f64, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        let (Some(v), Some(r), Some(atr)) = (
            value_at(bars, idx, &col),
            value_at(bars, idx, &ref_col),
            value_at(bars, idx, ATR),
        ) else {
            return false;
        };
        let spread = match side {
            Side::Up => v - r,
            Side::Down => r - v,
        };
        spread > atr_mult * atr
    })
}

/// Close beyond `col ± multiplier * atr` at the current bar.
pub fn close_outside_channel(col: String, multiplier: f64, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        let (Some(close), Some(mid), Some(atr)) = (
            value_at(bars, idx, "close"),
            value_at(bars, idx, &col),
            value_at(bars, idx, ATR),
        ) else {
            return false;
        };
        match side {
            Side::Up => close > mid + multiplier * atr,
            Side::Down => close < mid - multiplier * atr,
        }
    })
}

fn envelope(bars: &[BarData], idx: usize, col: &str, multiplier: f64, side: Side) -> Option<f64> {
    let mid = value_at(bars, idx, col)?;
    let atr = value_at(bars, idx, ATR)?;
    Some(match side {
        Side::Up => mid + multiplier * atr,
        Side::Down => mid - multiplier * atr,
    })
}

/// Close crosses the `col ± multiplier * atr` envelope between `idx - 1` and `idx`.
pub fn breaks_envelope(col: String, multiplier: f64, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        if idx < 1 {
            return false;
        }
        let (Some(close), Some(prev_close)) =
            (value_at(bars, idx, "close"), value_at(bars, idx - 1, "close"))
        else {
            return false;
        };
        let (Some(band), Some(prev_band)) = (
            envelope(bars, idx, &col, multiplier, side),
            envelope(bars, idx - 1, &col, multiplier, side),
        ) else {
            return false;
        };
        crossed(side, prev_close, prev_band, close, band)
    })
}

struct Ribbon {
    fast: f64,
    slow: f64,
    atr: f64,
}

impl Ribbon {
    fn at(bars: &[BarData], idx: usize) -> Option<Self> {
        Some(Self {
            fast: value_at(bars, idx, EMA_FAST)?,
            slow: value_at(bars, idx, EMA_SLOW)?,
            atr: value_at(bars, idx, ATR)?,
        })
    }

    fn upper(&self, multiplier: f64) -> f64 {
        self.fast.max(self.slow) + multiplier * self.atr
    }

    fn lower(&self, multiplier: f64) -> f64 {
        self.fast.min(self.slow) - multiplier * self.atr
    }
}

/// EMA-20/EMA-50 gap stays under `multiplier * atr` on each of the last `lookback` bars.
fn ribbon_compressed(bars: &[BarData], idx: usize, lookback: usize, multiplier: f64) -> bool {
    if idx + 1 < lookback {
        return false;
    }
    ((idx + 1 - lookback)..=idx).all(|i| match Ribbon::at(bars, i) {
        Some(r) => (r.fast - r.slow).abs() < multiplier * r.atr,
        None => false,
    })
}

fn clears_ribbon(bars: &[BarData], idx: usize, multiplier: f64, side: Side) -> bool {
    let (Some(close), Some(ribbon)) = (value_at(bars, idx, "close"), Ribbon::at(bars, idx)) else {
        return false;
    };
    match side {
        Side::Up => close > ribbon.upper(multiplier),
        Side::Down => close < ribbon.lower(multiplier),
    }
}

/// Compressed ribbon, then close clears it in `side`'s direction.
pub fn ribbon_break(lookback: usize, multiplier: f64, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        ribbon_compressed(bars, idx, lookback, multiplier) && clears_ribbon(bars, idx, multiplier, side)
    })
}

/// Exit a position on `side`: close clears the ribbon against it.
pub fn ribbon_exit(multiplier: f64, side: Side) -> ConditionFn {
    let against = match side {
        Side::Up => Side::Down,
        Side::Down => Side::Up,
    };
    ConditionFn::new(move |bars, idx| clears_ribbon(bars, idx, multiplier, against))
}

/// Side::Up (`mean_rev_long`): close stretched below `ref_col` by more than
/// `multiplier * atr`. Side::Down (`mean_rev_short`): stretched above.
pub fn mean_reversion(ref_col: String, multiplier: f64, side: Side) -> ConditionFn {
    let stretch = match side {
        Side::Up => Side::Down,
        Side::Down => Side::Up,
    };
    deviation("close".to_string(), ref_col, multiplier, stretch)
}
