//! Oscillator operators: divergence, TRIX signal cross, Bollinger double taps
//! and the three-way majority vote.

use super::{BB_LOWER, BB_UPPER, ConditionFn, EMA_FAST, EMA_SLOW, MACD_HIST, RSI, Side, TRIX, crossed};
use crate::domain::series::{BarData, value_at};

/// Period of the TRIX signal line.
pub const TRIX_SIGNAL_PERIOD: usize = 9;
/// `majority_bull` RSI vote: strictly above this level.
pub const MAJORITY_RSI_BULL: f64 = 55.0;
/// `majority_bear` RSI vote: strictly below this level.
pub const MAJORITY_RSI_BEAR: f64 = 45.0;

/// Side::Up (bullish): lower low than `lookback` bars ago with a higher
/// indicator reading. Side::Down (bearish): higher high with a lower reading.
pub fn divergence(indicator_col: String, lookback: usize, side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        if idx < lookback {
            return false;
        }
        let then = idx - lookback;
        let price_col = match side {
            Side::Up => "low",
            Side::Down => "high",
        };
        let (Some(price_now), Some(price_then), Some(ind_now), Some(ind_then)) = (
            value_at(bars, idx, price_col),
            value_at(bars, then, price_col),
            value_at(bars, idx, &indicator_col),
            value_at(bars, then, &indicator_col),
        ) else {
            return false;
        };
        match side {
            Side::Up => price_now < price_then && ind_now > ind_then,
            Side::Down => price_now > price_then && ind_now < ind_then,
        }
    })
}

fn trix_signal(bars: &[BarData], idx: usize) -> Option<f64> {
    if idx + 1 < TRIX_SIGNAL_PERIOD {
        return None;
    }
    let mut sum = 0.0;
    for i in (idx + 1 - TRIX_SIGNAL_PERIOD)..=idx {
        sum += value_at(bars, i, TRIX)?;
    }
    Some(sum / TRIX_SIGNAL_PERIOD as f64)
}

/// `trix_15` crosses its 9-bar simple average.
pub fn trix_cross(side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        if idx < TRIX_SIGNAL_PERIOD + 1 {
            return false;
        }
        let (Some(curr), Some(prev), Some(curr_sma), Some(prev_sma)) = (
            value_at(bars, idx, TRIX),
            value_at(bars, idx - 1, TRIX),
            trix_signal(bars, idx),
            trix_signal(bars, idx - 1),
        ) else {
            return false;
        };
        crossed(side, prev, prev_sma, curr, curr_sma)
    })
}

/// At least two closes in `[idx - lookback, idx)` beyond the lower (Down) or
/// upper (Up) Bollinger band. Bars without a band value are skipped.
pub fn double_tap(lookback: usize, side: Side) -> ConditionFn {
    let band = match side {
        Side::Up => BB_UPPER,
        Side::Down => BB_LOWER,
    };
    ConditionFn::new(move |bars, idx| {
        if idx < lookback {
            return false;
        }
        let taps = ((idx - lookback)..idx)
            .filter(|&i| match (value_at(bars, i, "close"), value_at(bars, i, band)) {
                (Some(close), Some(b)) => match side {
                    Side::Up => close > b,
                    Side::Down => close < b,
                },
                _ => false,
            })
            .count();
        taps >= 2
    })
}

/// Two of three votes agree: EMA-20 vs EMA-50, RSI vs its majority level,
/// and the MACD histogram sign. Any missing input is `false`.
pub fn majority(side: Side) -> ConditionFn {
    ConditionFn::new(move |bars, idx| {
        let (Some(fast), Some(slow), Some(rsi), Some(hist)) = (
            value_at(bars, idx, EMA_FAST),
            value_at(bars, idx, EMA_SLOW),
            value_at(bars, idx, RSI),
            value_at(bars, idx, MACD_HIST),
        ) else {
            return false;
        };
        let votes = match side {
            Side::Up => [fast > slow, rsi > MAJORITY_RSI_BULL, hist > 0.0],
            Side::Down => [fast < slow, rsi < MAJORITY_RSI_BEAR, hist < 0.0],
        };
        votes.iter().filter(|v| **v).count() >= 2
    })
}
