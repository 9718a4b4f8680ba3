//! ROC (Rate of Change) indicator implementation.
//!
//! ROC(n)[i] = ((C[i] - C[i-n]) / C[i-n]) * 100
//! If C[i-n] == 0: ROC = 0
//! Warmup: first n bars undefined.

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;
use crate::domain::indicator::{
    Indicator, IndicatorDefinition, ParamSpec, ParamValues, PlotMap, PlotSpec, PlotValues,
    single_plot,
};

pub const ID: &str = "roc";

pub fn calculate_roc(candles: &CandleSeries, period: usize) -> PlotValues {
    let closes = candles.closes();

    (0..closes.len())
        .map(|i| {
            if period == 0 || i < period {
                return None;
            }
            let prev_close = closes[i - period];
            if prev_close == 0.0 {
                Some(0.0)
            } else {
                Some((closes[i] - prev_close) / prev_close * 100.0)
            }
        })
        .collect()
}

pub struct Roc {
    definition: IndicatorDefinition,
}

impl Roc {
    pub fn new() -> Self {
        Roc {
            definition: IndicatorDefinition::new(ID, "Rate of Change", false)
                .param(ParamSpec::integer("period", 9, 1, 1000))
                .plot(PlotSpec::new("roc", "ROC")),
        }
    }
}

impl Default for Roc {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Roc {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn compute(&self, candles: &CandleSeries, params: &ParamValues) -> Result<PlotMap, EngineError> {
        let period = params.period("period")?;
        Ok(single_plot("roc", calculate_roc(candles, period)))
    }
}
