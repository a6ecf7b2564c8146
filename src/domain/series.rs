//! Bar series representation: OHLCV bars paired with their indicator rows.
//!
//! A series is an oldest-first slice of [`BarData`]. Operators read it through
//! [`value_at`], which treats missing and non-finite values uniformly as absent.

use chrono::NaiveDateTime;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// high - low
    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

impl Default for Bar {
    fn default() -> Self {
        Self {
            timestamp: NaiveDateTime::default(),
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
            volume: 0.0,
        }
    }
}

/// Indicator values computed upstream for one bar, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorRow(HashMap<String, f64>);

impl IndicatorRow {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.0.insert(key.into(), value);
    }

    /// Returns the value only when present and finite.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied().filter(|v| v.is_finite())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for IndicatorRow {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarData {
    pub bar: Bar,
    pub indicators: IndicatorRow,
}

impl BarData {
    pub fn new(bar: Bar, indicators: IndicatorRow) -> Self {
        Self { bar, indicators }
    }

    /// Resolves a column: OHLCV fields first, then the indicator row.
    pub fn value(&self, col: &str) -> Option<f64> {
        let v = match col {
            "open" => self.bar.open,
            "high" => self.bar.high,
            "low" => self.bar.low,
            "close" => self.bar.close,
            "volume" => self.bar.volume,
            _ => return self.indicators.get(col),
        };
        v.is_finite().then_some(v)
    }
}

/// Column value at `idx`, or `None` when out of range, missing, or non-finite.
pub fn value_at(bars: &[BarData], idx: usize, col: &str) -> Option<f64> {
    bars.get(idx).and_then(|b| b.value(col))
}
