//! Strategy condition sets and per-bar signal evaluation.
//!
//! A strategy carries four condition sets (long/short entries and exits), each
//! a JSON condition array compiled independently. Entries require every
//! condition in the set; exits fire on any single condition.

use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::domain::compiler::parse_and_compile;
use crate::domain::condition::parse_nodes;
use crate::domain::error::StratcondError;
use crate::domain::features::extract_required_features;
use crate::domain::operators::ConditionFn;
use crate::domain::series::BarData;
use crate::domain::validate::validate_json;
use crate::ports::config_port::ConfigPort;

pub const ENTRY_LONG: &str = "entry_long";
pub const ENTRY_SHORT: &str = "entry_short";
pub const EXIT_LONG: &str = "exit_long";
pub const EXIT_SHORT: &str = "exit_short";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    LongShort,
    LongOnly,
    ShortOnly,
}

impl Direction {
    pub fn allows_long(self) -> bool {
        matches!(self, Direction::LongShort | Direction::LongOnly)
    }

    pub fn allows_short(self) -> bool {
        matches!(self, Direction::LongShort | Direction::ShortOnly)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::LongShort => "long_short",
            Direction::LongOnly => "long_only",
            Direction::ShortOnly => "short_only",
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "long_short" | "both" => Ok(Direction::LongShort),
            "long_only" | "long" => Ok(Direction::LongOnly),
            "short_only" | "short" => Ok(Direction::ShortOnly),
            other => Err(format!(
                "unknown direction {other:?} (expected long_short, long_only or short_only)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    EntryLong,
    EntryShort,
    ExitLong,
    ExitShort,
}

impl Signal {
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::EntryLong => ENTRY_LONG,
            Signal::EntryShort => ENTRY_SHORT,
            Signal::ExitLong => EXIT_LONG,
            Signal::ExitShort => EXIT_SHORT,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position the caller is in when asking for a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Long,
    Short,
}

/// Raw JSON of the four condition sets, as written in the strategy file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionSources {
    pub entry_long: String,
    pub entry_short: String,
    pub exit_long: String,
    pub exit_short: String,
}

impl ConditionSources {
    /// `(set name, raw JSON)` for each set, in a fixed order.
    pub fn sets(&self) -> [(&'static str, &str); 4] {
        [
            (ENTRY_LONG, self.entry_long.as_str()),
            (ENTRY_SHORT, self.entry_short.as_str()),
            (EXIT_LONG, self.exit_long.as_str()),
            (EXIT_SHORT, self.exit_short.as_str()),
        ]
    }

    /// Union of the columns every set reads, sorted.
    pub fn required_features(&self) -> Result<Vec<String>, StratcondError> {
        let mut nodes = Vec::new();
        for (set, raw) in self.sets() {
            let parsed = parse_nodes(raw).map_err(|source| StratcondError::Condition {
                set: set.to_string(),
                source,
            })?;
            nodes.extend(parsed);
        }
        Ok(extract_required_features(&nodes))
    }
}

/// Validates all four sets, prefixing each problem with its set name.
pub fn validate_strategy_json(sources: &ConditionSources) -> Vec<String> {
    sources
        .sets()
        .into_iter()
        .flat_map(|(set, raw)| {
            validate_json(raw)
                .into_iter()
                .map(move |problem| format!("{set}: {problem}"))
        })
        .collect()
}

/// A strategy with its four condition sets compiled.
#[derive(Debug, Clone)]
pub struct StrategyConditions {
    pub name: String,
    pub direction: Direction,
    pub entry_long: Vec<ConditionFn>,
    pub entry_short: Vec<ConditionFn>,
    pub exit_long: Vec<ConditionFn>,
    pub exit_short: Vec<ConditionFn>,
    pub sources: ConditionSources,
    required: Vec<String>,
}

fn compile_set(set: &str, raw: &str) -> Result<Vec<ConditionFn>, StratcondError> {
    parse_and_compile(raw).map_err(|source| StratcondError::Condition {
        set: set.to_string(),
        source,
    })
}

/// Every condition holds. An empty set never fires.
fn all_hold(set: &[ConditionFn], bars: &[BarData], idx: usize) -> bool {
    !set.is_empty() && set.iter().all(|f| f.eval(bars, idx))
}

fn any_holds(set: &[ConditionFn], bars: &[BarData], idx: usize) -> bool {
    set.iter().any(|f| f.eval(bars, idx))
}

impl StrategyConditions {
    /// Compiles all four sets. The first compile error names its set.
    pub fn compile(
        name: impl Into<String>,
        direction: Direction,
        sources: ConditionSources,
    ) -> Result<Self, StratcondError> {
        let entry_long = compile_set(ENTRY_LONG, &sources.entry_long)?;
        let entry_short = compile_set(ENTRY_SHORT, &sources.entry_short)?;
        let exit_long = compile_set(EXIT_LONG, &sources.exit_long)?;
        let exit_short = compile_set(EXIT_SHORT, &sources.exit_short)?;
        let required = sources.required_features()?;
        let strategy = Self {
            name: name.into(),
            direction,
            entry_long,
            entry_short,
            exit_long,
            exit_short,
            sources,
            required,
        };
        info!(
            name = %strategy.name,
            direction = strategy.direction.as_str(),
            entry_long = strategy.entry_long.len(),
            entry_short = strategy.entry_short.len(),
            exit_long = strategy.exit_long.len(),
            exit_short = strategy.exit_short.len(),
            "compiled strategy"
        );
        Ok(strategy)
    }

    /// Columns the four sets read, resolved at compile time.
    pub fn required_features(&self) -> &[String] {
        &self.required
    }

    /// The signal at `idx` given the current position, if any.
    ///
    /// Flat: long entry is checked before short entry, and sides the direction
    /// disallows are skipped. In a position: any exit condition of that side fires.
    pub fn signal_at(&self, bars: &[BarData], idx: usize, state: PositionState) -> Option<Signal> {
        match state {
            PositionState::Flat => {
                if self.direction.allows_long() && all_hold(&self.entry_long, bars, idx) {
                    Some(Signal::EntryLong)
                } else if self.direction.allows_short() && all_hold(&self.entry_short, bars, idx) {
                    Some(Signal::EntryShort)
                } else {
                    None
                }
            }
            PositionState::Long => {
                any_holds(&self.exit_long, bars, idx).then_some(Signal::ExitLong)
            }
            PositionState::Short => {
                any_holds(&self.exit_short, bars, idx).then_some(Signal::ExitShort)
            }
        }
    }
}

/// Reads the `[strategy]` section into raw sources plus name and direction.
pub fn strategy_sources(
    config: &dyn ConfigPort,
) -> Result<(String, Direction, ConditionSources), StratcondError> {
    let name = config.require_string("strategy", "name")?;
    let direction = config
        .get_string("strategy", "direction")
        .unwrap_or_default()
        .parse::<Direction>()
        .map_err(|reason| StratcondError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "direction".to_string(),
            reason,
        })?;
    let set = |key: &str| config.get_string("strategy", key).unwrap_or_default();
    let sources = ConditionSources {
        entry_long: set(ENTRY_LONG),
        entry_short: set(ENTRY_SHORT),
        exit_long: set(EXIT_LONG),
        exit_short: set(EXIT_SHORT),
    };

    let has_entry = (direction.allows_long() && !sources.entry_long.trim().is_empty())
        || (direction.allows_short() && !sources.entry_short.trim().is_empty());
    if !has_entry {
        let key = if direction.allows_long() {
            ENTRY_LONG
        } else {
            ENTRY_SHORT
        };
        return Err(StratcondError::ConfigMissing {
            section: "strategy".to_string(),
            key: key.to_string(),
        });
    }
    Ok((name, direction, sources))
}

/// Reads and compiles the strategy described by the `[strategy]` section.
pub fn build_strategy(config: &dyn ConfigPort) -> Result<StrategyConditions, StratcondError> {
    let (name, direction, sources) = strategy_sources(config)?;
    StrategyConditions::compile(name, direction, sources)
}
