//! CSV bar series adapter.
//!
//! Reads `<base_path>/<SYMBOL>.csv`. The header must name `timestamp` (or
//! `date`), `open`, `high`, `low`, `close` and `volume`, in any order and
//! case. Every other column is loaded as an indicator; empty or non-numeric
//! indicator cells are left missing.

use crate::domain::error::StratcondError;
use crate::domain::series::{Bar, BarData, IndicatorRow};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const OHLCV: [&str; 5] = ["open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

/// Column positions resolved from the header row.
struct Layout {
    timestamp: usize,
    ohlcv: [usize; 5],
    indicators: Vec<(usize, String)>,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, StratcondError> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |wanted: &str| names.iter().position(|n| n == wanted);

        let timestamp = find("timestamp")
            .or_else(|| find("date"))
            .ok_or_else(|| StratcondError::Data {
                reason: "missing timestamp column".into(),
            })?;
        let mut ohlcv = [0usize; 5];
        for (slot, col) in ohlcv.iter_mut().zip(OHLCV) {
            *slot = find(col).ok_or_else(|| StratcondError::Data {
                reason: format!("missing {col} column"),
            })?;
        }
        let indicators = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != timestamp && !ohlcv.contains(i))
            .map(|(i, name)| (i, name.trim().to_string()))
            .collect();
        Ok(Self {
            timestamp,
            ohlcv,
            indicators,
        })
    }
}

/// Accepts RFC 3339, `%Y-%m-%d %H:%M:%S`, `%Y-%m-%dT%H:%M:%S` or a bare date.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }

    fn parse_record(
        layout: &Layout,
        record: &csv::StringRecord,
        line: usize,
    ) -> Result<BarData, StratcondError> {
        let raw_ts = record.get(layout.timestamp).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| StratcondError::Data {
            reason: format!("line {line}: invalid timestamp {raw_ts:?}"),
        })?;

        let mut values = [0.0f64; 5];
        for ((value, idx), col) in values.iter_mut().zip(layout.ohlcv).zip(OHLCV) {
            let cell = record.get(idx).unwrap_or_default().trim();
            *value = cell.parse().map_err(|e| StratcondError::Data {
                reason: format!("line {line}: invalid {col} value {cell:?}: {e}"),
            })?;
        }
        let [open, high, low, close, volume] = values;

        let mut indicators = IndicatorRow::new();
        for (idx, name) in &layout.indicators {
            let cell = record.get(*idx).unwrap_or_default().trim();
            if let Some(v) = cell.parse::<f64>().ok().filter(|v| v.is_finite()) {
                indicators.insert(name.as_str(), v);
            }
        }

        Ok(BarData::new(
            Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume,
            },
            indicators,
        ))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_series(&self, symbol: &str) -> Result<Vec<BarData>, StratcondError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| StratcondError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| StratcondError::Data {
            reason: format!("CSV header error: {e}"),
        })?;
        let layout = Layout::from_headers(headers)?;

        let mut bars = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| StratcondError::Data {
                reason: format!("CSV parse error: {e}"),
            })?;
            bars.push(Self::parse_record(&layout, &record, i + 2)?);
        }

        bars.sort_by_key(|b| b.bar.timestamp);
        debug!(
            symbol,
            bars = bars.len(),
            indicators = layout.indicators.len(),
            "loaded series"
        );
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, StratcondError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| StratcondError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StratcondError::Data {
                reason: format!("directory entry error: {e}"),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
