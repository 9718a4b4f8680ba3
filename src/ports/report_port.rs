//! Report output port.

use crate::domain::backtest::BacktestReport;
use crate::domain::error::EngineError;
use crate::domain::indicator::{IndicatorInstance, IndicatorRun};

pub trait ReportPort {
    fn write_backtest(
        &self,
        symbol: &str,
        report: &BacktestReport,
        output_path: &str,
    ) -> Result<(), EngineError>;

    fn write_indicators(
        &self,
        symbol: &str,
        instances: &[IndicatorInstance],
        runs: &[IndicatorRun],
        output_path: &str,
    ) -> Result<(), EngineError>;
}
