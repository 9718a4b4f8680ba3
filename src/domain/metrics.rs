//! Performance metrics over a trade ledger and equity curve.

use serde::Serialize;

use crate::domain::position::Trade;
use crate::domain::simulation::EquityPoint;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PerformanceMetrics {
    pub net_profit: f64,
    pub net_profit_percent: f64,
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    /// Trades with `pnl <= 0`; break-even counts as a loss.
    pub losing_trades: usize,
    /// Percent, 0 when there are no trades.
    pub win_rate: f64,
    /// `gross_profit / |gross_loss|`, 0 when there is no loss to divide by.
    pub profit_factor: f64,
    pub gross_profit: f64,
    /// Sum of non-positive trade PnL (zero or negative).
    pub gross_loss: f64,
    pub average_win: f64,
    pub average_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
}

impl PerformanceMetrics {
    pub fn compute(trades: &[Trade], equity_curve: &[EquityPoint], initial_capital: f64) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);
        let net_profit = final_equity - initial_capital;
        let net_profit_percent = if initial_capital > 0.0 {
            net_profit / initial_capital * 100.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_percent) = compute_drawdown(equity_curve);

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut gross_profit = 0.0_f64;
        let mut gross_loss = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for trade in trades {
            let pnl = trade.pnl;
            if trade.is_win() {
                winning_trades += 1;
                gross_profit += pnl;
                largest_win = largest_win.max(pnl);
            } else {
                losing_trades += 1;
                gross_loss += pnl;
                largest_loss = largest_loss.min(pnl);
            }
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        let profit_factor = if total_trades > 0 && gross_loss != 0.0 {
            gross_profit / gross_loss.abs()
        } else {
            0.0
        };

        let average_win = if winning_trades > 0 {
            gross_profit / winning_trades as f64
        } else {
            0.0
        };
        let average_loss = if losing_trades > 0 {
            gross_loss / losing_trades as f64
        } else {
            0.0
        };

        PerformanceMetrics {
            net_profit,
            net_profit_percent,
            max_drawdown,
            max_drawdown_percent,
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            profit_factor,
            gross_profit,
            gross_loss,
            average_win,
            average_loss,
            largest_win,
            largest_loss,
        }
    }
}

/// Largest `peak - equity` over a left-to-right scan, and that drawdown as a
/// percentage of the peak it was measured from.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, f64) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0.0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_pct = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
            continue;
        }
        let dd = peak - point.equity;
        if dd > max_dd {
            max_dd = dd;
            max_dd_pct = if peak > 0.0 { dd / peak * 100.0 } else { 0.0 };
        }
    }

    (max_dd, max_dd_pct)
}
