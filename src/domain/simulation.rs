//! Bar-by-bar position simulation.
//!
//! State machine, starting `Flat`:
//!
//! | Current | Signal  | Action                                      |
//! |---------|---------|---------------------------------------------|
//! | Flat    | Bullish | open Long at close                          |
//! | Flat    | Bearish | open Short at close                         |
//! | Long    | Bearish | close Long (record trade), open Short       |
//! | Short   | Bullish | close Short (record trade), open Long       |
//! | other   |         | no change                                   |
//!
//! PnL compounds on the running balance `B`: a closed trade realizes
//! `return * B` and `B += pnl`. Every simulated bar records `(time, B)`.

use serde::Serialize;

use crate::domain::candle::{Candle, CandleSeries};
use crate::domain::position::{Position, Side, Trade};
use crate::domain::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub time: i64,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub initial_capital: f64,
    pub final_balance: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Position still open after the last simulated bar.
    pub open_position: Position,
}

/// Stepwise simulator. Hosts that need cancellation drive it bar by bar and
/// simply drop it to abandon a run.
#[derive(Debug, Clone)]
pub struct Simulator {
    initial_capital: f64,
    balance: f64,
    position: Position,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
}

impl Simulator {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            balance: initial_capital,
            position: Position::Flat,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Apply the transition for `signal` at `candle`'s close without
    /// recording an equity point. Returns the trade closed by a reversal.
    pub fn apply_signal(&mut self, candle: &Candle, signal: Signal) -> Option<Trade> {
        let target = match (self.position.side(), signal) {
            (None, Signal::Bullish) | (Some(Side::Short), Signal::Bullish) => Side::Long,
            (None, Signal::Bearish) | (Some(Side::Long), Signal::Bearish) => Side::Short,
            _ => return None,
        };
        let closed = self.close(candle);
        self.position = Position::open(target, candle.close, candle.time);
        tracing::trace!(side = %target, price = candle.close, time = candle.time, "position opened");
        closed
    }

    /// Close any open position at `candle`'s close, leaving the simulator flat.
    pub fn liquidate(&mut self, candle: &Candle) -> Option<Trade> {
        let closed = self.close(candle);
        self.position = Position::Flat;
        closed
    }

    /// Record `(time, balance)` on the equity curve.
    pub fn mark(&mut self, time: i64) {
        self.equity_curve.push(EquityPoint {
            time,
            equity: self.balance,
        });
    }

    /// One full bar: transition, then mark.
    pub fn step(&mut self, candle: &Candle, signal: Signal) -> Option<Trade> {
        let closed = self.apply_signal(candle, signal);
        self.mark(candle.time);
        closed
    }

    pub fn finish(self) -> SimulationResult {
        SimulationResult {
            initial_capital: self.initial_capital,
            final_balance: self.balance,
            trades: self.trades,
            equity_curve: self.equity_curve,
            open_position: self.position,
        }
    }

    fn close(&mut self, candle: &Candle) -> Option<Trade> {
        let side = self.position.side()?;
        let (entry_price, entry_time) = self.position.entry()?;
        let ret = self.position.return_at(candle.close);
        let pnl = ret * self.balance;
        self.balance += pnl;

        let trade = Trade {
            side,
            entry_time,
            entry_price,
            exit_time: candle.time,
            exit_price: candle.close,
            pnl,
            pnl_percent: ret * 100.0,
        };
        tracing::debug!(
            side = %side,
            entry = entry_price,
            exit = candle.close,
            pnl,
            balance = self.balance,
            "trade closed"
        );
        self.trades.push(trade.clone());
        self.position = Position::Flat;
        Some(trade)
    }
}

/// Simulate `signals` over `candles` from bar `start` to the end.
///
/// With `liquidate` set, any position open on the last bar is closed at its
/// close before that bar's equity point is recorded; the last bar's signal
/// cannot open a new position in that case.
pub fn simulate(
    candles: &CandleSeries,
    signals: &[Signal],
    initial_capital: f64,
    start: usize,
    liquidate: bool,
) -> SimulationResult {
    let mut sim = Simulator::new(initial_capital);
    let bars = candles.candles();
    let last = bars.len().saturating_sub(1);

    for (i, candle) in bars.iter().enumerate().skip(start) {
        let signal = signals.get(i).copied().unwrap_or(Signal::Hold);
        if liquidate && i == last {
            sim.liquidate(candle);
            sim.mark(candle.time);
        } else {
            sim.step(candle, signal);
        }
    }
    sim.finish()
}
