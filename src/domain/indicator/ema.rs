//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are undefined.

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;
use crate::domain::indicator::{
    Indicator, IndicatorDefinition, ParamSpec, ParamValues, PlotMap, PlotSpec, PlotValues,
    single_plot,
};

pub const ID: &str = "ema";

/// EMA over an arbitrary value series. Leading `None`s in the input are
/// skipped: the seed window starts at the first defined value.
pub fn ema_values(values: &[Option<f64>], period: usize) -> PlotValues {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }

    let Some(start) = values.iter().position(|v| v.is_some()) else {
        return out;
    };

    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    let mut sum = 0.0;

    for (offset, value) in values[start..].iter().enumerate() {
        let i = start + offset;
        let Some(v) = *value else {
            return out;
        };
        if offset < period - 1 {
            sum += v;
        } else if offset == period - 1 {
            sum += v;
            ema = sum / period as f64;
            out[i] = Some(ema);
        } else {
            ema = v * k + ema * (1.0 - k);
            out[i] = Some(ema);
        }
    }

    out
}

pub fn calculate_ema(candles: &CandleSeries, period: usize) -> PlotValues {
    let closes: Vec<Option<f64>> = candles.iter().map(|c| Some(c.close)).collect();
    ema_values(&closes, period)
}

pub struct Ema {
    definition: IndicatorDefinition,
}

impl Ema {
    pub fn new() -> Self {
        Ema {
            definition: IndicatorDefinition::new(ID, "Exponential Moving Average", true)
                .param(ParamSpec::integer("period", 20, 1, 1000))
                .plot(PlotSpec::new("ema", "EMA")),
        }
    }
}

impl Default for Ema {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Ema {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn compute(&self, candles: &CandleSeries, params: &ParamValues) -> Result<PlotMap, EngineError> {
        let period = params.period("period")?;
        Ok(single_plot("ema", calculate_ema(candles, period)))
    }
}
