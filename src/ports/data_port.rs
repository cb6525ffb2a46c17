//! Bar data access port trait.

use crate::domain::bar::Bar;
use crate::domain::error::AlloctraderError;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` in ascending timestamp order, optionally limited to
    /// the inclusive `[start, end]` date range.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Bar>, AlloctraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, AlloctraderError>;
}
