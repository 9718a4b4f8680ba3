//! Average True Range indicator.
//!
//! TR[0] = high - low, TR[i] = true range against the previous close.
//! Seed with the mean of the first n TR values, then Wilder smoothing:
//! ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n
//! Warmup: first (n-1) bars are undefined.

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;
use crate::domain::indicator::{
    Indicator, IndicatorDefinition, ParamSpec, ParamValues, PlotMap, PlotSpec, PlotValues,
    single_plot,
};

pub const ID: &str = "atr";

pub fn calculate_atr(candles: &CandleSeries, period: usize) -> PlotValues {
    let bars = candles.candles();
    let mut values = vec![None; bars.len()];
    if period == 0 || bars.len() < period {
        return values;
    }

    let tr: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let mut atr = tr[..period].iter().sum::<f64>() / period as f64;
    values[period - 1] = Some(atr);
    for i in period..bars.len() {
        atr = (atr * (period - 1) as f64 + tr[i]) / period as f64;
        values[i] = Some(atr);
    }

    values
}

pub struct Atr {
    definition: IndicatorDefinition,
}

impl Atr {
    pub fn new() -> Self {
        Atr {
            definition: IndicatorDefinition::new(ID, "Average True Range", false)
                .param(ParamSpec::integer("period", 14, 1, 500))
                .plot(PlotSpec::new("atr", "ATR")),
        }
    }
}

impl Default for Atr {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Atr {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn compute(&self, candles: &CandleSeries, params: &ParamValues) -> Result<PlotMap, EngineError> {
        let period = params.period("period")?;
        Ok(single_plot("atr", calculate_atr(candles, period)))
    }
}
