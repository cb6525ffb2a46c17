//! Report generation port trait.

use std::path::Path;

use crate::domain::error::AlloctraderError;
use crate::domain::metrics::{CombinedSummary, Metrics};
use crate::domain::strategy::StrategyConfig;

/// One symbol's slice of a report.
pub struct SymbolReport<'a> {
    pub symbol: &'a str,
    pub metrics: &'a Metrics,
}

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(
        &self,
        strategy: &StrategyConfig,
        symbols: &[SymbolReport<'_>],
        combined: &CombinedSummary,
        output_path: &Path,
    ) -> Result<(), AlloctraderError>;
}
