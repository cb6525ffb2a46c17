//! JSON results report.

use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::domain::error::AlloctraderError;
use crate::domain::metrics::{CombinedSummary, Metrics};
use crate::domain::strategy::StrategyConfig;
use crate::ports::report_port::{ReportPort, SymbolReport};

#[derive(Serialize)]
struct ReportDocument<'a> {
    strategy: &'a StrategyConfig,
    symbols: Vec<SymbolEntry<'a>>,
    combined: &'a CombinedSummary,
}

#[derive(Serialize)]
struct SymbolEntry<'a> {
    symbol: &'a str,
    metrics: &'a Metrics,
}

#[derive(Debug, Default)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        JsonReportAdapter
    }

    pub fn render(
        &self,
        strategy: &StrategyConfig,
        symbols: &[SymbolReport<'_>],
        combined: &CombinedSummary,
    ) -> Result<String, AlloctraderError> {
        let doc = ReportDocument {
            strategy,
            symbols: symbols
                .iter()
                .map(|s| SymbolEntry {
                    symbol: s.symbol,
                    metrics: s.metrics,
                })
                .collect(),
            combined,
        };
        serde_json::to_string_pretty(&doc).map_err(|e| AlloctraderError::Data {
            reason: format!("failed to serialise report: {e}"),
        })
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(
        &self,
        strategy: &StrategyConfig,
        symbols: &[SymbolReport<'_>],
        combined: &CombinedSummary,
        output_path: &Path,
    ) -> Result<(), AlloctraderError> {
        let json = self.render(strategy, symbols, combined)?;
        fs::write(output_path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{run_multi, BacktestConfig};
    use crate::domain::bar::Bar;
    use crate::domain::engine::SignalGenerator;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample() -> (StrategyConfig, Vec<(String, Metrics)>, CombinedSummary) {
        let strategy = StrategyConfig::default();
        let generator = SignalGenerator::new(strategy.clone()).unwrap();
        let bars = vec![
            Bar::new(Utc.with_ymd_and_hms(2024, 1, 31, 23, 0, 0).unwrap(), 100.0),
            Bar::new(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(), 120.0),
        ];
        let series = vec![("BTC-USD".to_string(), bars)];
        let results = run_multi(&generator, &series, &BacktestConfig::default()).unwrap();
        let metrics = results
            .iter()
            .map(|r| (r.symbol.clone(), Metrics::compute(&r.result, 252.0)))
            .collect();
        let combined = CombinedSummary::compute(&results, 252.0);
        (strategy, metrics, combined)
    }

    #[test]
    fn writes_parseable_json() {
        let (strategy, metrics, combined) = sample();
        let reports: Vec<SymbolReport<'_>> = metrics
            .iter()
            .map(|(symbol, m)| SymbolReport { symbol, metrics: m })
            .collect();

        let dir = TempDir::new().unwrap();
        let out = dir.path().join("results.json");
        JsonReportAdapter::new()
            .write(&strategy, &reports, &combined, &out)
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(value["symbols"][0]["symbol"], "BTC-USD");
        assert_eq!(value["strategy"]["ema_long_period"], 200);
        assert_eq!(value["symbols"][0]["metrics"]["sell_fills"], 1);
        assert!(value["combined"]["total_return"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn write_to_missing_dir_is_io_error() {
        let (strategy, _, combined) = sample();
        let err = JsonReportAdapter::new()
            .write(
                &strategy,
                &[],
                &combined,
                Path::new("/nonexistent/dir/results.json"),
            )
            .unwrap_err();
        assert!(matches!(err, AlloctraderError::Io(_)));
    }
}
