//! Typed access to the strategy file's `[section] key` values.

use crate::domain::error::StratcondError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Falls back to `default` when the key is absent or not an integer.
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// A value that must be present and non-blank.
    fn require_string(&self, section: &str, key: &str) -> Result<String, StratcondError> {
        self.get_string(section, key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| StratcondError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            })
    }
}
