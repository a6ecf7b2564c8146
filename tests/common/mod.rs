#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use stratcond::domain::error::StratcondError;
use stratcond::domain::series::{Bar, BarData, IndicatorRow};
use stratcond::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<BarData>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<BarData>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(&self, symbol: &str) -> Result<Vec<BarData>, StratcondError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(StratcondError::Data {
                reason: reason.clone(),
            });
        }
        self.data
            .get(symbol)
            .cloned()
            .ok_or_else(|| StratcondError::Data {
                reason: format!("no series for {symbol}"),
            })
    }

    fn list_symbols(&self) -> Result<Vec<String>, StratcondError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn day(offset: i64) -> NaiveDateTime {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    start + Duration::days(offset)
}

pub fn bar(offset: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar {
        timestamp: day(offset),
        open,
        high,
        low,
        close,
        volume: 10_000.0,
    }
}

pub fn bar_with(bar: Bar, indicators: &[(&str, f64)]) -> BarData {
    BarData::new(bar, indicators.iter().map(|(k, v)| (*k, *v)).collect())
}

/// Daily bars closing at `values`, each spanning close +/- 1.
pub fn closes(values: &[f64]) -> Vec<BarData> {
    values
        .iter()
        .enumerate()
        .map(|(i, c)| BarData::new(bar(i as i64, *c, c + 1.0, c - 1.0, *c), IndicatorRow::new()))
        .collect()
}

/// One indicator column over flat bars.
pub fn column(col: &str, values: &[f64]) -> Vec<BarData> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| bar_with(bar(i as i64, 100.0, 101.0, 99.0, 100.0), &[(col, *v)]))
        .collect()
}

/// Indicator columns carried by [`rich_series`].
pub const RICH_COLUMNS: [&str; 11] = [
    "atr_14",
    "atr_sma_50",
    "adx_14",
    "bb_width",
    "bb_upper",
    "bb_lower",
    "ema_20",
    "ema_50",
    "rsi_14",
    "macd_hist",
    "trix_15",
];

/// A trending series that carries every column the built-in operators read.
pub fn rich_series(len: usize) -> Vec<BarData> {
    (0..len)
        .map(|i| {
            let t = i as f64;
            let close = 100.0 + (t * 0.7).sin() * 5.0 + t * 0.2;
            let b = bar(i as i64, close - 0.4, close + 1.5, close - 1.5, close);
            bar_with(
                b,
                &[
                    ("atr_14", 2.0 + (t * 0.3).cos() * 0.5),
                    ("atr_sma_50", 2.2),
                    ("adx_14", 20.0 + (t * 0.2).sin() * 10.0),
                    ("bb_width", 4.0 + (t * 0.4).sin() * 2.0),
                    ("bb_upper", close + 3.0),
                    ("bb_lower", close - 3.0),
                    ("ema_20", close - (t * 0.5).sin()),
                    ("ema_50", close - 1.0),
                    ("rsi_14", 50.0 + (t * 0.9).sin() * 25.0),
                    ("macd_hist", (t * 0.6).sin()),
                    ("trix_15", (t * 0.25).sin() * 0.1),
                ],
            )
        })
        .collect()
}

pub fn write_temp_file(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn write_csv(dir: &Path, symbol: &str, content: &str) {
    std::fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}
