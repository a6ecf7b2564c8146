//! Core domain: the condition AST, operator library, compiler, validator,
//! feature extractor and strategy signal evaluation.

pub mod series;
pub mod condition;
pub mod operators;
pub mod registry;
pub mod compiler;
pub mod features;
pub mod validate;
pub mod strategy;
pub mod scan;
pub mod error;
