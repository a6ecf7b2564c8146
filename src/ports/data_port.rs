//! Bar series access port.

use crate::domain::error::StratcondError;
use crate::domain::series::BarData;

/// Supplies bar series with their indicator columns already computed.
pub trait DataPort {
    /// Full series for `symbol`, oldest bar first.
    fn fetch_series(&self, symbol: &str) -> Result<Vec<BarData>, StratcondError>;

    fn list_symbols(&self) -> Result<Vec<String>, StratcondError>;
}
