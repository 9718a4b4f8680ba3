//! Standard Deviation indicator.
//!
//! Population standard deviation over n closing prices.
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) bars are undefined.

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;
use crate::domain::indicator::{
    Indicator, IndicatorDefinition, ParamSpec, ParamValues, PlotMap, PlotSpec, PlotValues,
    single_plot,
};

pub const ID: &str = "stddev";

/// Mean and population standard deviation of a window.
pub(crate) fn window_stats(window: &[f64]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

pub fn calculate_stddev(candles: &CandleSeries, period: usize) -> PlotValues {
    let closes = candles.closes();
    if period == 0 {
        return vec![None; closes.len()];
    }

    (0..closes.len())
        .map(|i| {
            if i + 1 < period {
                None
            } else {
                Some(window_stats(&closes[i + 1 - period..=i]).1)
            }
        })
        .collect()
}

pub struct StdDev {
    definition: IndicatorDefinition,
}

impl StdDev {
    pub fn new() -> Self {
        StdDev {
            definition: IndicatorDefinition::new(ID, "Standard Deviation", false)
                .param(ParamSpec::integer("period", 20, 1, 1000))
                .plot(PlotSpec::new("stddev", "StdDev")),
        }
    }
}

impl Default for StdDev {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for StdDev {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn compute(&self, candles: &CandleSeries, params: &ParamValues) -> Result<PlotMap, EngineError> {
        let period = params.period("period")?;
        Ok(single_plot("stddev", calculate_stddev(candles, period)))
    }
}
