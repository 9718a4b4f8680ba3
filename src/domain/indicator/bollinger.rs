//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are undefined.

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;
use crate::domain::indicator::stddev::window_stats;
use crate::domain::indicator::{
    Indicator, IndicatorDefinition, ParamSpec, ParamValues, PlotMap, PlotSpec, PlotValues,
};

pub const ID: &str = "bollinger";

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub upper: PlotValues,
    pub middle: PlotValues,
    pub lower: PlotValues,
}

pub fn calculate_bollinger(candles: &CandleSeries, period: usize, mult: f64) -> BollingerSeries {
    let closes = candles.closes();
    let mut bands = BollingerSeries {
        upper: vec![None; closes.len()],
        middle: vec![None; closes.len()],
        lower: vec![None; closes.len()],
    };
    if period == 0 {
        return bands;
    }

    for i in (period - 1)..closes.len() {
        let (middle, stddev) = window_stats(&closes[i + 1 - period..=i]);
        bands.upper[i] = Some(middle + mult * stddev);
        bands.middle[i] = Some(middle);
        bands.lower[i] = Some(middle - mult * stddev);
    }

    bands
}

pub struct Bollinger {
    definition: IndicatorDefinition,
}

impl Bollinger {
    pub fn new() -> Self {
        Bollinger {
            definition: IndicatorDefinition::new(ID, "Bollinger Bands", true)
                .param(ParamSpec::integer("period", 20, 1, 1000))
                .param(ParamSpec::float("mult", 2.0, 0.1, 10.0))
                .plot(PlotSpec::new("upper", "Upper"))
                .plot(PlotSpec::new("middle", "Basis"))
                .plot(PlotSpec::new("lower", "Lower")),
        }
    }
}

impl Default for Bollinger {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Bollinger {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn compute(&self, candles: &CandleSeries, params: &ParamValues) -> Result<PlotMap, EngineError> {
        let period = params.period("period")?;
        let mult = params.float("mult")?;
        let bands = calculate_bollinger(candles, period, mult);

        let mut plots = PlotMap::new();
        plots.insert("upper".to_string(), bands.upper);
        plots.insert("middle".to_string(), bands.middle);
        plots.insert("lower".to_string(), bands.lower);
        Ok(plots)
    }
}
