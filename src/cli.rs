//! CLI definition and dispatch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{BacktestReport, RunStatus, run_crossover, run_rules};
use crate::domain::candle::CandleSeries;
use crate::domain::config_validation::{
    DataSource, build_workspace, load_crossover_config, load_data_source, load_indicator_specs,
    load_rule_run_config, load_strategy, validate_config,
};
use crate::domain::error::EngineError;
use crate::domain::indicator::{IndicatorRegistry, ParamKind};
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::rule_eval::IndicatorResults;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "stratbench",
    version,
    about = "Indicator engine and strategy backtester for candle series"
)]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over one symbol
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [data] symbol
        #[arg(long)]
        symbol: Option<String>,
        /// Write the JSON report here (`-` for stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Compute the configured indicators and write them as JSON
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long, default_value = "-")]
        output: String,
    },
    /// List registered indicators with their parameters and plots
    ListIndicators,
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file without loading data
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Install the stderr subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed when running inside tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(&cli.log_level);

    let result = match cli.command {
        Command::Backtest {
            config,
            symbol,
            output,
        } => run_backtest(&config, symbol.as_deref(), output.as_deref()),
        Command::Indicators {
            config,
            symbol,
            output,
        } => run_indicators(&config, symbol.as_deref(), &output),
        Command::ListIndicators => {
            run_list_indicators();
            Ok(())
        }
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, EngineError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn resolve_symbol(source: &DataSource, symbol: Option<&str>) -> Result<String, EngineError> {
    symbol
        .map(str::to_string)
        .or_else(|| source.symbol.clone())
        .ok_or_else(|| EngineError::ConfigMissing {
            section: "data".into(),
            key: "symbol".into(),
        })
}

fn load_candles(source: &DataSource, symbol: &str) -> Result<CandleSeries, EngineError> {
    let candles = CsvAdapter::new(&source.dir).fetch_candles(symbol)?;
    eprintln!("Loaded {} candles for {}", candles.len(), symbol);
    Ok(candles)
}

fn run_backtest(
    config_path: &Path,
    symbol: Option<&str>,
    output_path: Option<&str>,
) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let registry = IndicatorRegistry::with_builtins();
    validate_config(&config, &registry)?;

    let source = load_data_source(&config)?;
    let symbol = resolve_symbol(&source, symbol)?;
    let candles = load_candles(&source, &symbol)?;

    let specs = load_indicator_specs(&config, &registry)?;
    let report = match load_strategy(&config, &specs, &registry)? {
        Some(strategy) => {
            let run_config = load_rule_run_config(&config)?;
            let workspace = build_workspace(&specs, &registry)?;
            let results: IndicatorResults = workspace
                .recalculate(&registry, &candles)
                .into_iter()
                .filter_map(|run| run.outcome.ok().map(|result| (run.instance_id, result)))
                .collect();
            eprintln!("Strategy:");
            eprintln!("  bullish: {}", strategy.bullish);
            eprintln!("  bearish: {}", strategy.bearish);
            run_rules(
                &candles,
                &strategy,
                &results,
                run_config.initial_capital,
                run_config.liquidate_at_end,
            )?
        }
        None => {
            let crossover = load_crossover_config(&config)?;
            eprintln!(
                "Strategy: SMA({}) / SMA({}) crossover",
                crossover.fast_period, crossover.slow_period
            );
            run_crossover(&candles, &crossover)?
        }
    };

    print_report(&symbol, &report);

    if let Some(output) = output_path {
        JsonReportAdapter::new().write_backtest(&symbol, &report, output)?;
        if output != "-" {
            eprintln!("\nReport written to: {}", output);
        }
    }
    Ok(())
}

/// Profit factor for display: N/A without trades or losses to compare, ∞
/// when every closed trade won.
pub fn format_profit_factor(metrics: &PerformanceMetrics) -> String {
    if metrics.total_trades == 0 {
        return "N/A".to_string();
    }
    if metrics.gross_loss == 0.0 {
        return if metrics.gross_profit > 0.0 {
            "∞".to_string()
        } else {
            "N/A".to_string()
        };
    }
    format!("{:.2}", metrics.profit_factor)
}

/// Unix seconds as `YYYY-MM-DD HH:MM` UTC, falling back to the raw number.
pub fn format_timestamp(time: i64) -> String {
    DateTime::<Utc>::from_timestamp(time, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| time.to_string())
}

fn print_report(symbol: &str, report: &BacktestReport) {
    eprintln!("\n=== Backtest: {} ===", symbol);
    if let RunStatus::InsufficientData { bars, required } = report.status {
        eprintln!(
            "Insufficient data: {} bars, strategy needs at least {}",
            bars, required
        );
        return;
    }

    let m = &report.metrics;
    if let (Some(first), Some(last)) = (report.equity_curve.first(), report.equity_curve.last()) {
        eprintln!(
            "Period:           {} -> {}",
            format_timestamp(first.time),
            format_timestamp(last.time)
        );
    }
    eprintln!("Initial Capital:  {:.2}", report.initial_capital);
    eprintln!("Final Balance:    {:.2}", report.final_balance);
    eprintln!(
        "Net Profit:       {:.2} ({:.2}%)",
        m.net_profit, m.net_profit_percent
    );
    eprintln!(
        "Max Drawdown:     -{:.2} ({:.1}%)",
        m.max_drawdown, m.max_drawdown_percent
    );
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!("Win Rate:         {:.1}%", m.win_rate);
    eprintln!("Profit Factor:    {}", format_profit_factor(m));
    if let Some((price, time)) = report.open_position.entry() {
        let side = report
            .open_position
            .side()
            .map(|s| s.to_string())
            .unwrap_or_default();
        eprintln!(
            "Open Position:    {} since {} @ {:.2} (unrealized {:+.2})",
            side,
            format_timestamp(time),
            price,
            report.unrealized_pnl
        );
    }

    if !report.ledger.is_empty() {
        eprintln!("\n=== Trades ===");
        for trade in &report.ledger {
            eprintln!(
                "  {:<5} {} @ {:>10.2} -> {} @ {:>10.2}  {:>+10.2} ({:+.2}%)",
                trade.side.to_string(),
                format_timestamp(trade.entry_time),
                trade.entry_price,
                format_timestamp(trade.exit_time),
                trade.exit_price,
                trade.pnl,
                trade.pnl_percent
            );
        }
    }
}

fn run_indicators(
    config_path: &Path,
    symbol: Option<&str>,
    output_path: &str,
) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let registry = IndicatorRegistry::with_builtins();
    let source = load_data_source(&config)?;
    let specs = load_indicator_specs(&config, &registry)?;
    let workspace = build_workspace(&specs, &registry)?;
    if workspace.is_empty() {
        eprintln!("No [indicator.<id>] sections configured");
    }

    let symbol = resolve_symbol(&source, symbol)?;
    let candles = load_candles(&source, &symbol)?;
    let runs = workspace.recalculate(&registry, &candles);

    for run in &runs {
        match &run.outcome {
            Ok(result) => eprintln!("  ok      {} ({} plots)", run.instance_id, result.plots.len()),
            Err(e) => eprintln!("  failed  {}: {}", run.instance_id, e),
        }
    }

    JsonReportAdapter::new().write_indicators(&symbol, workspace.instances(), &runs, output_path)
}

fn run_list_indicators() {
    let registry = IndicatorRegistry::with_builtins();
    for definition in registry.definitions() {
        let placement = if definition.overlay { "overlay" } else { "panel" };
        println!("{} - {} [{}]", definition.id, definition.label, placement);
        for param in &definition.params {
            let range = match (param.kind, param.min, param.max) {
                (ParamKind::Boolean, _, _) => String::new(),
                (_, Some(min), Some(max)) => format!(" in [{}, {}]", min, max),
                _ => String::new(),
            };
            println!(
                "    param {} ({:?}) default {}{}",
                param.name, param.kind, param.default, range
            );
        }
        let plots: Vec<&str> = definition.plots.iter().map(|p| p.id.as_str()).collect();
        println!("    plots {}", plots.join(", "));
    }
}

fn run_list_symbols(config_path: &Path) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let source = load_data_source(&config)?;
    let symbols = CsvAdapter::new(&source.dir).list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found in {}", source.dir);
        return Ok(());
    }
    for symbol in &symbols {
        println!("{}", symbol);
    }
    eprintln!("{} symbols found", symbols.len());
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let registry = IndicatorRegistry::with_builtins();
    validate_config(&config, &registry)?;

    let specs = load_indicator_specs(&config, &registry)?;
    if !specs.is_empty() {
        eprintln!("\nIndicators:");
        for spec in &specs {
            let params: Vec<String> = spec
                .params
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            eprintln!(
                "  {} = {}({})",
                spec.instance_id,
                spec.indicator_id,
                params.join(", ")
            );
        }
    }

    match load_strategy(&config, &specs, &registry)? {
        Some(strategy) => {
            eprintln!("\nStrategy rules (parsed):");
            eprintln!("  bullish: {}", strategy.bullish);
            eprintln!("  bearish: {}", strategy.bearish);
        }
        None => {
            let crossover = load_crossover_config(&config)?;
            eprintln!(
                "\nStrategy: SMA({}) / SMA({}) crossover",
                crossover.fast_period, crossover.slow_period
            );
        }
    }

    eprintln!("\nConfig validated successfully");
    Ok(())
}
