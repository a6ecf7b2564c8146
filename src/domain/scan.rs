//! Bar-by-bar signal scan over a series.
//!
//! Tracks one flat/long/short position and emits entry and exit signals in
//! order. There are no fills, prices or P&L here; the scan only answers
//! "where would this strategy have fired".

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::domain::error::StratcondError;
use crate::domain::series::BarData;
use crate::domain::strategy::{PositionState, Signal, StrategyConditions};
use crate::ports::config_port::ConfigPort;

/// `[scan]` section options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOptions {
    /// Bars skipped before the first signal may fire.
    pub warmup: usize,
    /// Fail instead of warning when a required column is absent.
    pub require_features: bool,
}

impl ScanOptions {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StratcondError> {
        let warmup = config.get_int("scan", "warmup", 0);
        if warmup < 0 {
            return Err(StratcondError::ConfigInvalid {
                section: "scan".to_string(),
                key: "warmup".to_string(),
                reason: "warmup must be non-negative".to_string(),
            });
        }
        Ok(Self {
            warmup: warmup as usize,
            require_features: config.get_bool("scan", "require_features", false),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanEvent {
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub signal: Signal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub bars: usize,
    pub events: Vec<ScanEvent>,
    /// Required columns no bar carries.
    pub missing_features: Vec<String>,
    pub final_state: PositionState,
}

/// Required columns absent from every bar. OHLCV columns are always present.
pub fn missing_features(required: &[String], bars: &[BarData]) -> Vec<String> {
    required
        .iter()
        .filter(|col| !matches!(col.as_str(), "open" | "high" | "low" | "close" | "volume"))
        .filter(|col| !bars.iter().any(|b| b.indicators.contains(col)))
        .cloned()
        .collect()
}

fn next_state(signal: Signal) -> PositionState {
    match signal {
        Signal::EntryLong => PositionState::Long,
        Signal::EntryShort => PositionState::Short,
        Signal::ExitLong | Signal::ExitShort => PositionState::Flat,
    }
}

/// Walks `bars` from the first index, one signal at most per bar.
pub fn scan(strategy: &StrategyConditions, bars: &[BarData]) -> ScanReport {
    let missing = missing_features(strategy.required_features(), bars);
    run(strategy, bars, 0, missing)
}

/// Like [`scan`], honoring warmup and, when `require_features` is set,
/// failing on absent columns.
pub fn scan_with(
    strategy: &StrategyConditions,
    bars: &[BarData],
    options: &ScanOptions,
) -> Result<ScanReport, StratcondError> {
    let missing = missing_features(strategy.required_features(), bars);
    if options.require_features && !missing.is_empty() {
        return Err(StratcondError::Data {
            reason: format!("series lacks required features: {}", missing.join(", ")),
        });
    }
    Ok(run(strategy, bars, options.warmup, missing))
}

fn run(
    strategy: &StrategyConditions,
    bars: &[BarData],
    warmup: usize,
    missing: Vec<String>,
) -> ScanReport {
    if !missing.is_empty() {
        warn!(
            strategy = %strategy.name,
            missing = ?missing,
            "series lacks required features; conditions reading them never fire"
        );
    }

    let mut state = PositionState::Flat;
    let mut events = Vec::new();
    for (idx, bar) in bars.iter().enumerate().skip(warmup) {
        if let Some(signal) = strategy.signal_at(bars, idx, state) {
            events.push(ScanEvent {
                index: idx,
                timestamp: bar.bar.timestamp,
                signal,
            });
            state = next_state(signal);
        }
    }

    info!(
        strategy = %strategy.name,
        bars = bars.len(),
        signals = events.len(),
        "scan complete"
    );
    ScanReport {
        bars: bars.len(),
        events,
        missing_features: missing,
        final_state: state,
    }
}
