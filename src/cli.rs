//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::{read_bars, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::json_state::{load_state, save_state};
use crate::domain::backtest::{run_multi, BacktestConfig, SymbolResult};
use crate::domain::bar::Bar;
use crate::domain::config_validation::{validate_backtest_config, validate_strategy_config};
use crate::domain::engine::{EngineState, SignalGenerator};
use crate::domain::error::AlloctraderError;
use crate::domain::metrics::{CombinedSummary, Metrics};
use crate::domain::signal::Action;
use crate::domain::strategy::{self, StrategyConfig};
use crate::domain::universe::{load_universe, parse_symbols};
use crate::logging::{init_logging, LogFormat};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::{ReportPort, SymbolReport};

#[derive(Parser, Debug)]
#[command(name = "alloctrader", about = "Adaptive allocation trend strategy engine")]
pub struct Cli {
    /// Log level or RUST_LOG-style directives
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over the configured symbols
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Run a single symbol instead of [backtest] symbols
        #[arg(long)]
        symbol: Option<String>,
        /// Write a JSON results document
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the engine bar by bar over a CSV file and print each signal
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        data: PathBuf,
        /// State snapshot to resume from and write back
        #[arg(short, long)]
        state: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in the configured data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(&cli.log_level, cli.log_format);

    let outcome = match cli.command {
        Command::Backtest {
            config,
            symbol,
            output,
        } => run_backtest(&config, symbol.as_deref(), output.as_deref()),
        Command::Signals {
            config,
            data,
            state,
        } => run_signals(&config, &data, state.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, AlloctraderError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

fn read_count(adapter: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, AlloctraderError> {
    let value = adapter.get_int("strategy", key, default as i64);
    usize::try_from(value)
        .map_err(|_| AlloctraderError::invalid_config(key, format!("{key} must be non-negative")))
}

/// Reads `[strategy]`, applying defaults for absent keys, and validates it.
pub fn build_strategy_config(adapter: &dyn ConfigPort) -> Result<StrategyConfig, AlloctraderError> {
    let defaults = StrategyConfig::default();
    let ema_long_period = read_count(adapter, "ema_long_period", defaults.ema_long_period)?;
    let history_capacity = read_count(
        adapter,
        "history_capacity",
        strategy::DEFAULT_HISTORY_CAPACITY.max(ema_long_period),
    )?;

    let config = StrategyConfig {
        name: adapter
            .get_string("strategy", "name")
            .unwrap_or(defaults.name),
        ema_long_period,
        target_allocation_pct: adapter.get_double(
            "strategy",
            "target_allocation_pct",
            defaults.target_allocation_pct,
        ),
        min_notional: adapter.get_double("strategy", "min_notional", defaults.min_notional),
        hard_stop_loss_pct: adapter.get_double(
            "strategy",
            "hard_stop_loss_pct",
            defaults.hard_stop_loss_pct,
        ),
        trailing_stop_pct: adapter.get_double(
            "strategy",
            "trailing_stop_pct",
            defaults.trailing_stop_pct,
        ),
        trend_floor_pct: adapter.get_double("strategy", "trend_floor_pct", defaults.trend_floor_pct),
        enable_monthly_rebalance: adapter.get_bool(
            "strategy",
            "enable_monthly_rebalance",
            defaults.enable_monthly_rebalance,
        ),
        history_capacity,
    };

    validate_strategy_config(&config)?;
    Ok(config)
}

fn parse_date(adapter: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, AlloctraderError> {
    match adapter.get_string("backtest", key) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                AlloctraderError::invalid_config(key, "invalid date format (expected YYYY-MM-DD)")
            }),
    }
}

/// Reads `[backtest]`, applying defaults for absent keys, and validates it.
pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, AlloctraderError> {
    let defaults = BacktestConfig::default();
    let config = BacktestConfig {
        initial_capital: adapter.get_double("backtest", "initial_capital", defaults.initial_capital),
        commission_pct: adapter.get_double("backtest", "commission_pct", defaults.commission_pct),
        periods_per_year: adapter.get_double(
            "backtest",
            "periods_per_year",
            defaults.periods_per_year,
        ),
        start_date: parse_date(adapter, "start_date")?,
        end_date: parse_date(adapter, "end_date")?,
    };

    validate_backtest_config(&config)?;
    Ok(config)
}

pub fn resolve_data_dir(adapter: &dyn ConfigPort) -> Result<PathBuf, AlloctraderError> {
    adapter
        .get_string("backtest", "data_dir")
        .map(PathBuf::from)
        .ok_or_else(|| AlloctraderError::ConfigMissing {
            section: "backtest".into(),
            key: "data_dir".into(),
        })
}

/// `--symbol` wins over `[backtest] symbols`.
pub fn resolve_symbols(
    symbol_override: Option<&str>,
    adapter: &dyn ConfigPort,
) -> Result<Vec<String>, AlloctraderError> {
    let raw = match symbol_override {
        Some(s) => s.to_string(),
        None => adapter
            .get_string("backtest", "symbols")
            .ok_or_else(|| AlloctraderError::ConfigMissing {
                section: "backtest".into(),
                key: "symbols".into(),
            })?,
    };
    Ok(parse_symbols(&raw)?)
}

fn run_backtest(
    config_path: &Path,
    symbol_override: Option<&str>,
    output_path: Option<&Path>,
) -> Result<(), AlloctraderError> {
    let adapter = load_config(config_path)?;
    let strategy = build_strategy_config(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;
    let symbols = resolve_symbols(symbol_override, &adapter)?;
    let data_port = CsvAdapter::new(resolve_data_dir(&adapter)?);

    let generator = SignalGenerator::new(strategy)?;
    let results = run_backtest_pipeline(&data_port, &generator, &bt_config, &symbols)?;
    let combined = CombinedSummary::compute(&results, bt_config.periods_per_year);

    let metrics: Vec<(String, Metrics)> = results
        .iter()
        .map(|r| {
            (
                r.symbol.clone(),
                Metrics::compute(&r.result, bt_config.periods_per_year),
            )
        })
        .collect();

    print_summary(&metrics, &combined);

    if let Some(output) = output_path {
        let reports: Vec<SymbolReport<'_>> = metrics
            .iter()
            .map(|(symbol, m)| SymbolReport { symbol, metrics: m })
            .collect();
        JsonReportAdapter::new().write(generator.config(), &reports, &combined, output)?;
        eprintln!("\nResults written to: {}", output.display());
    }

    Ok(())
}

/// Loads every symbol through `data_port` and backtests them independently.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    generator: &SignalGenerator,
    bt_config: &BacktestConfig,
    symbols: &[String],
) -> Result<Vec<SymbolResult>, AlloctraderError> {
    let universe = load_universe(data_port, symbols, bt_config.start_date, bt_config.end_date)?;
    for skipped in &universe.skipped {
        warn!(symbol = %skipped.symbol, reason = ?skipped.reason, "skipping symbol");
    }

    info!(
        symbols = universe.series.len(),
        capital = bt_config.initial_capital,
        commission_pct = bt_config.commission_pct,
        "running backtest"
    );
    run_multi(generator, &universe.series, bt_config)
}

fn print_summary(metrics: &[(String, Metrics)], combined: &CombinedSummary) {
    for (symbol, m) in metrics {
        eprintln!("\n=== {} ===", symbol);
        eprintln!("Final Equity:     ${:.2}", m.final_equity);
        eprintln!("Total Return:     {:+.2}%", m.total_return * 100.0);
        eprintln!("Max Drawdown:     {:.2}%", m.max_drawdown * 100.0);
        eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
        eprintln!(
            "Fills:            {} ({} buy / {} sell)",
            m.total_fills, m.buy_fills, m.sell_fills
        );
        eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
        eprintln!("Commission:       ${:.2}", m.total_commission);
        eprintln!("Peak Allocation:  {:.1}%", m.peak_allocation * 100.0);
    }

    eprintln!("\n=== Combined ===");
    eprintln!("Starting Capital: ${:.2}", combined.initial_capital);
    eprintln!("Final Equity:     ${:.2}", combined.final_equity);
    eprintln!("Total P&L:        ${:+.2}", combined.total_pnl);
    eprintln!("Total Return:     {:+.2}%", combined.total_return * 100.0);
    eprintln!("Max Drawdown:     {:.2}%", combined.max_drawdown * 100.0);
    eprintln!("Win Rate:         {:.1}%", combined.win_rate * 100.0);
    eprintln!("Total Fills:      {}", combined.total_fills);
    eprintln!("Avg Sharpe:       {:.2}", combined.avg_sharpe);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub bars: usize,
    pub buys: usize,
    pub sells: usize,
    pub rejected: usize,
}

/// Feeds `bars` through the engine, writing one CSV line per accepted bar:
/// `timestamp,action,size,reason,price,cash,quantity,allocation,unrealized_pnl`.
/// Rejected bars leave
/// the state untouched and are only counted.
pub fn run_signal_stream<W: Write>(
    generator: &SignalGenerator,
    state: &mut EngineState,
    bars: &[Bar],
    out: &mut W,
) -> Result<StreamStats, AlloctraderError> {
    let mut stats = StreamStats::default();
    writeln!(
        out,
        "timestamp,action,size,reason,price,cash,quantity,allocation,unrealized_pnl"
    )?;

    for bar in bars {
        stats.bars += 1;
        let signal = match generator.on_bar(state, bar) {
            Ok(s) => s,
            Err(e) => {
                warn!(ts = %bar.timestamp, error = %e, "bar rejected");
                stats.rejected += 1;
                continue;
            }
        };

        match signal.action {
            Action::Buy => stats.buys += 1,
            Action::Sell => stats.sells += 1,
            Action::Hold => {}
        }

        let action = match signal.action {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        };
        let unrealized = state
            .portfolio
            .position
            .as_ref()
            .map_or(0.0, |p| p.unrealized_pnl(bar.price));
        writeln!(
            out,
            "{},{},{:.8},{},{},{:.2},{:.8},{:.4},{:.2}",
            bar.timestamp.to_rfc3339(),
            action,
            signal.size,
            signal.reason,
            bar.price,
            state.portfolio.cash,
            state.portfolio.quantity(),
            state.portfolio.allocation(bar.price),
            unrealized,
        )?;
    }

    Ok(stats)
}

fn run_signals(
    config_path: &Path,
    data_path: &Path,
    state_path: Option<&Path>,
) -> Result<(), AlloctraderError> {
    let adapter = load_config(config_path)?;
    let strategy = build_strategy_config(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;
    let generator = SignalGenerator::new(strategy)?;

    let mut state = match state_path {
        Some(path) => match load_state(path)? {
            Some(state) => {
                info!(path = %path.display(), "resuming from state snapshot");
                generator.resume(state)
            }
            None => generator.initial_state(bt_config.initial_capital),
        },
        None => generator.initial_state(bt_config.initial_capital),
    };

    let bars = read_bars(data_path, bt_config.start_date, bt_config.end_date)?;
    let stdout = std::io::stdout();
    let stats = run_signal_stream(&generator, &mut state, &bars, &mut stdout.lock())?;

    eprintln!(
        "{} bars: {} buys, {} sells, {} rejected",
        stats.bars, stats.buys, stats.sells, stats.rejected
    );

    if let Some(path) = state_path {
        save_state(&state, path)?;
        info!(path = %path.display(), "state snapshot written");
    }

    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), AlloctraderError> {
    let adapter = load_config(config_path)?;
    let strategy = build_strategy_config(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;

    eprintln!("Strategy: {}", strategy.name);
    eprintln!("  ema_long_period:          {}", strategy.ema_long_period);
    eprintln!("  target_allocation_pct:    {}", strategy.target_allocation_pct);
    eprintln!("  min_notional:             {}", strategy.min_notional);
    eprintln!("  hard_stop_loss_pct:       {}", strategy.hard_stop_loss_pct);
    eprintln!("  trailing_stop_pct:        {}", strategy.trailing_stop_pct);
    eprintln!("  trend_floor_pct:          {}", strategy.trend_floor_pct);
    eprintln!("  enable_monthly_rebalance: {}", strategy.enable_monthly_rebalance);
    eprintln!("  history_capacity:         {}", strategy.history_capacity);
    eprintln!("Backtest:");
    eprintln!("  initial_capital:          {}", bt_config.initial_capital);
    eprintln!("  commission_pct:           {}", bt_config.commission_pct);

    if adapter.has_key("backtest", "symbols") {
        let symbols = resolve_symbols(None, &adapter)?;
        eprintln!("  symbols:                  {}", symbols.join(", "));
    }

    eprintln!("\nConfiguration is valid");
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), AlloctraderError> {
    let adapter = load_config(config_path)?;
    let data_port = CsvAdapter::new(resolve_data_dir(&adapter)?);
    let symbols = data_port.list_symbols()?;

    if symbols.is_empty() {
        eprintln!("No symbols found");
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}
