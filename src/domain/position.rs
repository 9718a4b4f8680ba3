//! Position state and closed trades.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn direction(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Position {
    #[default]
    Flat,
    Long { entry_price: f64, entry_time: i64 },
    Short { entry_price: f64, entry_time: i64 },
}

impl Position {
    pub fn open(side: Side, entry_price: f64, entry_time: i64) -> Self {
        match side {
            Side::Long => Position::Long {
                entry_price,
                entry_time,
            },
            Side::Short => Position::Short {
                entry_price,
                entry_time,
            },
        }
    }

    pub fn side(&self) -> Option<Side> {
        match self {
            Position::Flat => None,
            Position::Long { .. } => Some(Side::Long),
            Position::Short { .. } => Some(Side::Short),
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn entry(&self) -> Option<(f64, i64)> {
        match *self {
            Position::Flat => None,
            Position::Long {
                entry_price,
                entry_time,
            }
            | Position::Short {
                entry_price,
                entry_time,
            } => Some((entry_price, entry_time)),
        }
    }

    /// Price return of the open position at `price`, as a fraction.
    pub fn return_at(&self, price: f64) -> f64 {
        match (self.side(), self.entry()) {
            (Some(side), Some((entry, _))) => side.direction() * (price - entry) / entry,
            _ => 0.0,
        }
    }

    /// Unrealized PnL if `balance` were marked at `price`.
    pub fn unrealized_pnl(&self, price: f64, balance: f64) -> f64 {
        self.return_at(price) * balance
    }
}

/// A closed round trip. PnL is absolute currency, `pnl_percent` the price
/// return of the trade in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub side: Side,
    pub entry_time: i64,
    pub entry_price: f64,
    pub exit_time: i64,
    pub exit_price: f64,
    pub pnl: f64,
    pub pnl_percent: f64,
}

impl Trade {
    /// Strictly positive PnL; break-even is a loss.
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}
