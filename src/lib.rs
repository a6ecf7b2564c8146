//! stratcond: JSON condition DSL engine for trading strategies.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], the command line in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;

pub use domain::compiler::{compile, parse_and_compile};
pub use domain::condition::{ConditionNode, Ref};
pub use domain::error::{ConditionError, StratcondError};
pub use domain::features::extract_required_features;
pub use domain::operators::ConditionFn;
pub use domain::series::{Bar, BarData, IndicatorRow};
pub use domain::validate::{validate_conditions, validate_json};
