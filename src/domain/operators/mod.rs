//! Operator library: pure predicate constructors over a bar series.
//!
//! Every constructor returns a [`ConditionFn`], a stateless closure evaluated
//! as `f(bars, idx)`. Operators read only `bars[..=idx]`, and any missing,
//! non-finite, or out-of-history input makes the predicate `false`.
//!
//! Families:
//! - [`comparison`]: above/below and cross operators
//! - [`trend`]: rising/falling, consecutive closes, held and was-then-crosses
//! - [`price_action`]: pullbacks, candles, gaps, range position
//! - [`volatility`]: squeeze, band width, ADX and ATR regimes
//! - [`channel`]: ATR channels, envelopes, ribbons, deviation, mean reversion
//! - [`oscillator`]: divergence, TRIX cross, double taps, majority vote

pub mod channel;
pub mod comparison;
pub mod oscillator;
pub mod price_action;
pub mod trend;
pub mod volatility;

use crate::domain::series::{BarData, value_at};
use std::fmt;
use std::sync::Arc;

pub const ATR: &str = "atr_14";
pub const ATR_SMA: &str = "atr_sma_50";
pub const ADX: &str = "adx_14";
pub const BB_WIDTH: &str = "bb_width";
pub const BB_UPPER: &str = "bb_upper";
pub const BB_LOWER: &str = "bb_lower";
pub const EMA_FAST: &str = "ema_20";
pub const EMA_SLOW: &str = "ema_50";
pub const RSI: &str = "rsi_14";
pub const MACD_HIST: &str = "macd_hist";
pub const TRIX: &str = "trix_15";

type Predicate = dyn Fn(&[BarData], usize) -> bool + Send + Sync;

/// A compiled condition. Cheap to clone and safe to share across threads.
#[derive(Clone)]
pub struct ConditionFn(Arc<Predicate>);

impl ConditionFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[BarData], usize) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Evaluates at `idx`; an index past the end of the series is `false`.
    pub fn eval(&self, bars: &[BarData], idx: usize) -> bool {
        idx < bars.len() && (self.0)(bars, idx)
    }
}

impl fmt::Debug for ConditionFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConditionFn")
    }
}

/// Direction of a mirrored operator pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Up,
    Down,
}

/// Resolved comparand: a column lookup or a numeric constant.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(String),
    Constant(f64),
}

impl Operand {
    pub fn resolve(&self, bars: &[BarData], idx: usize) -> Option<f64> {
        match self {
            Operand::Column(col) => value_at(bars, idx, col),
            Operand::Constant(v) => bars.get(idx).and(v.is_finite().then_some(*v)),
        }
    }
}

/// True when `a` moves from at-or-below `b` to strictly above it (or the mirror).
pub(crate) fn crossed(side: Side, prev_a: f64, prev_b: f64, curr_a: f64, curr_b: f64) -> bool {
    match side {
        Side::Up => prev_a <= prev_b && curr_a > curr_b,
        Side::Down => prev_a >= prev_b && curr_a < curr_b,
    }
}

/// True when every child holds at `idx`. Short-circuits on the first `false`.
pub fn all_of(children: Vec<ConditionFn>) -> ConditionFn {
    ConditionFn::new(move |bars, idx| children.iter().all(|c| c.eval(bars, idx)))
}

/// True when at least one child holds at `idx`. Short-circuits on the first `true`.
pub fn any_of(children: Vec<ConditionFn>) -> ConditionFn {
    ConditionFn::new(move |bars, idx| children.iter().any(|c| c.eval(bars, idx)))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::series::{Bar, BarData, IndicatorRow};

    pub fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            open,
            high,
            low,
            close,
            volume: 1000.0,
            ..Bar::default()
        }
    }

    pub fn with(bar: Bar, indicators: &[(&str, f64)]) -> BarData {
        BarData::new(bar, indicators.iter().map(|(k, v)| (*k, *v)).collect())
    }

    pub fn closes(values: &[f64]) -> Vec<BarData> {
        values
            .iter()
            .map(|c| BarData::new(bar(c - 0.5, c + 1.0, c - 1.0, *c), IndicatorRow::new()))
            .collect()
    }

    /// One indicator column over flat bars.
    pub fn column(col: &str, values: &[f64]) -> Vec<BarData> {
        values
            .iter()
            .map(|v| with(bar(100.0, 101.0, 99.0, 100.0), &[(col, *v)]))
            .collect()
    }
}
