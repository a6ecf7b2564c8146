//! Concrete implementations of the [`crate::ports`] traits.

pub mod csv_adapter;
pub mod file_config_adapter;
