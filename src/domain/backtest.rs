//! Backtest orchestration: configuration, runs and reports.

use rayon::prelude::*;
use serde::Serialize;

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::position::{Position, Trade};
use crate::domain::rule_eval::IndicatorResults;
use crate::domain::signal::crossover_signals;
use crate::domain::simulation::{EquityPoint, SimulationResult, simulate};
use crate::domain::strategy::RuleStrategy;

/// Moving-average crossover run parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrossoverConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub initial_capital: f64,
    /// Close any open position at the last bar's close.
    pub liquidate_at_end: bool,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            fast_period: 5,
            slow_period: 10,
            initial_capital: 10_000.0,
            liquidate_at_end: false,
        }
    }
}

impl CrossoverConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.fast_period == 0 {
            return Err(EngineError::invalid_parameter("fast_period", "must be positive"));
        }
        if self.slow_period <= self.fast_period {
            return Err(EngineError::invalid_parameter(
                "slow_period",
                format!(
                    "{} must exceed fast_period {}",
                    self.slow_period, self.fast_period
                ),
            ));
        }
        validate_capital(self.initial_capital)
    }
}

fn validate_capital(initial_capital: f64) -> Result<(), EngineError> {
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(EngineError::invalid_parameter(
            "initial_capital",
            format!("must be a positive amount, got {}", initial_capital),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// The series is shorter than the strategy warm-up; nothing was simulated.
    InsufficientData { bars: usize, required: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestReport {
    pub status: RunStatus,
    /// Net profit in percent of initial capital.
    pub total_pnl: f64,
    /// Percent of closed trades with positive PnL.
    pub win_rate: f64,
    /// Closed trade count.
    pub trades: usize,
    pub equity_curve: Vec<EquityPoint>,
    pub ledger: Vec<Trade>,
    pub metrics: PerformanceMetrics,
    pub open_position: Position,
    /// PnL of `open_position` marked at the last close; 0 when flat.
    /// Not included in `total_pnl`.
    pub unrealized_pnl: f64,
    pub initial_capital: f64,
    pub final_balance: f64,
}

/// The compact `{ total_pnl, win_rate, trades, equity_curve }` result shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestSummary {
    pub total_pnl: f64,
    pub win_rate: f64,
    pub trades: usize,
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestReport {
    fn insufficient(bars: usize, required: usize, initial_capital: f64) -> Self {
        tracing::info!(bars, required, "insufficient data, nothing simulated");
        Self {
            status: RunStatus::InsufficientData { bars, required },
            total_pnl: 0.0,
            win_rate: 0.0,
            trades: 0,
            equity_curve: Vec::new(),
            ledger: Vec::new(),
            metrics: PerformanceMetrics::default(),
            open_position: Position::Flat,
            unrealized_pnl: 0.0,
            initial_capital,
            final_balance: initial_capital,
        }
    }

    fn from_simulation(sim: SimulationResult, candles: &CandleSeries) -> Self {
        let unrealized_pnl = candles
            .last()
            .map(|bar| sim.open_position.unrealized_pnl(bar.close, sim.final_balance))
            .unwrap_or(0.0);
        let metrics =
            PerformanceMetrics::compute(&sim.trades, &sim.equity_curve, sim.initial_capital);
        tracing::info!(
            trades = metrics.total_trades,
            net_profit_percent = metrics.net_profit_percent,
            win_rate = metrics.win_rate,
            bars = sim.equity_curve.len(),
            "backtest complete"
        );
        Self {
            status: RunStatus::Completed,
            total_pnl: metrics.net_profit_percent,
            win_rate: metrics.win_rate,
            trades: metrics.total_trades,
            equity_curve: sim.equity_curve,
            ledger: sim.trades,
            metrics,
            open_position: sim.open_position,
            unrealized_pnl,
            initial_capital: sim.initial_capital,
            final_balance: sim.final_balance,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn summary(&self) -> BacktestSummary {
        BacktestSummary {
            total_pnl: self.total_pnl,
            win_rate: self.win_rate,
            trades: self.trades,
            equity_curve: self.equity_curve.clone(),
        }
    }
}

/// SMA(fast)/SMA(slow) crossover backtest on closes.
///
/// Simulation starts at bar `slow_period`, so the equity curve has
/// `len(candles) - slow_period` points. A series shorter than `slow_period`
/// yields `RunStatus::InsufficientData`.
pub fn run_crossover(
    candles: &CandleSeries,
    config: &CrossoverConfig,
) -> Result<BacktestReport, EngineError> {
    config.validate()?;
    let bars = candles.len();
    if bars < config.slow_period {
        return Ok(BacktestReport::insufficient(
            bars,
            config.slow_period,
            config.initial_capital,
        ));
    }

    let fast = calculate_sma(candles, config.fast_period);
    let slow = calculate_sma(candles, config.slow_period);
    let signals = crossover_signals(&fast, &slow);
    tracing::debug!(
        fast = config.fast_period,
        slow = config.slow_period,
        bars,
        "running crossover backtest"
    );

    let sim = simulate(
        candles,
        &signals,
        config.initial_capital,
        config.slow_period,
        config.liquidate_at_end,
    );
    Ok(BacktestReport::from_simulation(sim, candles))
}

/// Backtest a rule strategy over precomputed indicator results, starting at
/// the strategy's warm-up bar (see [`RuleStrategy::warmup`]).
pub fn run_rules(
    candles: &CandleSeries,
    strategy: &RuleStrategy,
    results: &IndicatorResults,
    initial_capital: f64,
    liquidate_at_end: bool,
) -> Result<BacktestReport, EngineError> {
    validate_capital(initial_capital)?;
    strategy.check_refs(results)?;

    let bars = candles.len();
    let Some(start) = strategy.warmup(results).filter(|&w| w < bars) else {
        return Ok(BacktestReport::insufficient(bars, bars + 1, initial_capital));
    };

    let signals = strategy.signals(candles, results);
    let sim = simulate(candles, &signals, initial_capital, start, liquidate_at_end);
    Ok(BacktestReport::from_simulation(sim, candles))
}

/// Run independent crossover configurations in parallel. Results keep the
/// input order and carry their run id.
pub fn run_batch(
    candles: &CandleSeries,
    runs: &[(String, CrossoverConfig)],
) -> Vec<(String, Result<BacktestReport, EngineError>)> {
    runs.par_iter()
        .map(|(id, config)| (id.clone(), run_crossover(candles, config)))
        .collect()
}
