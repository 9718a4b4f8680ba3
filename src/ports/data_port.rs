//! Candle data access port.

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;

pub trait DataPort {
    /// Full validated history for `symbol`.
    fn fetch_candles(&self, symbol: &str) -> Result<CandleSeries, EngineError>;

    fn list_symbols(&self) -> Result<Vec<String>, EngineError>;
}
