//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::condition::parse_nodes;
use crate::domain::error::StratcondError;
use crate::domain::features::extract_required_features;
use crate::domain::registry::{self, Family};
use crate::domain::scan::{ScanOptions, scan_with};
use crate::domain::strategy::{build_strategy, strategy_sources, validate_strategy_json};
use crate::domain::validate::validate_json;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

/// Exit status for condition trees that fail validation.
const EXIT_INVALID: u8 = 4;

#[derive(Parser, Debug)]
#[command(name = "stratcond", about = "Condition DSL engine for trading strategies")]
pub struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a JSON condition array and report every problem
    Validate {
        #[arg(short, long)]
        conditions: PathBuf,
    },
    /// Print the indicator columns a JSON condition array reads
    Features {
        #[arg(short, long)]
        conditions: PathBuf,
    },
    /// List the registered operators by family
    Ops,
    /// Validate every condition set of a strategy file
    Check {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Scan a symbol's series and print where the strategy fires
    Scan {
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(long)]
        symbol: String,
        /// Directory of <SYMBOL>.csv files (defaults to [data] base_path)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// List the symbols available in a data directory
    Symbols {
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Validate { conditions } => run_validate(&conditions),
        Command::Features { conditions } => run_features(&conditions),
        Command::Ops => run_ops(),
        Command::Check { strategy } => run_check(&strategy),
        Command::Scan {
            strategy,
            symbol,
            data,
        } => run_scan(&strategy, &symbol, data.as_deref()),
        Command::Symbols { data } => run_symbols(&data),
    }
}

fn report(err: StratcondError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(report)
}

fn read_conditions(path: &Path) -> Result<String, ExitCode> {
    fs::read_to_string(path).map_err(|e| report(StratcondError::Io(e)))
}

fn print_problems(problems: &[String]) -> ExitCode {
    for problem in problems {
        println!("{problem}");
    }
    eprintln!("{} problem(s) found", problems.len());
    ExitCode::from(EXIT_INVALID)
}

fn run_validate(path: &Path) -> ExitCode {
    let raw = match read_conditions(path) {
        Ok(raw) => raw,
        Err(code) => return code,
    };
    let problems = validate_json(&raw);
    if !problems.is_empty() {
        return print_problems(&problems);
    }
    eprintln!("{}: ok", path.display());
    ExitCode::SUCCESS
}

fn run_features(path: &Path) -> ExitCode {
    let raw = match read_conditions(path) {
        Ok(raw) => raw,
        Err(code) => return code,
    };
    let nodes = match parse_nodes(&raw) {
        Ok(nodes) => nodes,
        Err(source) => {
            return report(StratcondError::Condition {
                set: path.display().to_string(),
                source,
            });
        }
    };
    for feature in extract_required_features(&nodes) {
        println!("{feature}");
    }
    ExitCode::SUCCESS
}

fn run_ops() -> ExitCode {
    let mut by_family: BTreeMap<Family, Vec<&registry::OpSpec>> = BTreeMap::new();
    for spec in registry::operators() {
        by_family.entry(spec.family).or_default().push(spec);
    }
    for (family, specs) in by_family {
        println!("{family}:");
        for spec in specs {
            let required: Vec<&str> = spec.required.iter().map(|f| f.name()).collect();
            if required.is_empty() {
                println!("  {}", spec.name);
            } else {
                println!("  {} ({})", spec.name, required.join(", "));
            }
        }
    }
    ExitCode::SUCCESS
}

fn run_check(strategy_path: &Path) -> ExitCode {
    eprintln!("Checking strategy: {}", strategy_path.display());
    let adapter = match load_config(strategy_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let (name, direction, sources) = match strategy_sources(&adapter) {
        Ok(parts) => parts,
        Err(e) => return report(e),
    };

    let problems = validate_strategy_json(&sources);
    if !problems.is_empty() {
        return print_problems(&problems);
    }

    let features = match sources.required_features() {
        Ok(features) => features,
        Err(e) => return report(e),
    };
    println!("name: {name}");
    println!("direction: {}", direction.as_str());
    println!("features: {}", features.join(", "));
    ExitCode::SUCCESS
}

fn data_dir(adapter: &dyn ConfigPort, override_dir: Option<&Path>) -> Result<PathBuf, StratcondError> {
    if let Some(dir) = override_dir {
        return Ok(dir.to_path_buf());
    }
    adapter.require_string("data", "base_path").map(PathBuf::from)
}

fn run_scan(strategy_path: &Path, symbol: &str, data: Option<&Path>) -> ExitCode {
    let adapter = match load_config(strategy_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let strategy = match build_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => return report(e),
    };
    let options = match ScanOptions::from_config(&adapter) {
        Ok(o) => o,
        Err(e) => return report(e),
    };
    let base_path = match data_dir(&adapter, data) {
        Ok(p) => p,
        Err(e) => return report(e),
    };

    let bars = match CsvAdapter::new(base_path).fetch_series(symbol) {
        Ok(bars) => bars,
        Err(e) => return report(e),
    };
    let result = match scan_with(&strategy, &bars, &options) {
        Ok(r) => r,
        Err(e) => return report(e),
    };

    for event in &result.events {
        println!("{}\t{}\t{}", event.index, event.timestamp, event.signal);
    }
    if !result.missing_features.is_empty() {
        eprintln!("missing features: {}", result.missing_features.join(", "));
    }
    eprintln!(
        "{}: {} signal(s) over {} bar(s)",
        strategy.name,
        result.events.len(),
        result.bars
    );
    ExitCode::SUCCESS
}

fn run_symbols(data: &Path) -> ExitCode {
    match CsvAdapter::new(data.to_path_buf()).list_symbols() {
        Ok(symbols) => {
            for symbol in symbols {
                println!("{symbol}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => report(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scan_with_global_verbose() {
        let cli = Cli::try_parse_from([
            "stratcond", "scan", "--strategy", "s.ini", "--symbol", "BHP", "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Scan { symbol, data, .. } => {
                assert_eq!(symbol, "BHP");
                assert!(data.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn validate_requires_conditions() {
        assert!(Cli::try_parse_from(["stratcond", "validate"]).is_err());
    }

    #[test]
    fn data_dir_prefers_override() {
        let adapter = FileConfigAdapter::from_string("[data]\nbase_path = ./data\n").unwrap();
        assert_eq!(
            data_dir(&adapter, Some(Path::new("/tmp/bars"))).unwrap(),
            PathBuf::from("/tmp/bars")
        );
        assert_eq!(data_dir(&adapter, None).unwrap(), PathBuf::from("./data"));
        let empty = FileConfigAdapter::from_string("[strategy]\nname = x\n").unwrap();
        assert!(matches!(
            data_dir(&empty, None),
            Err(StratcondError::ConfigMissing { .. })
        ));
    }
}
