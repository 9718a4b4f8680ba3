//! Weighted Moving Average indicator.
//!
//! WMA(n) = (1*P[i-n+1] + 2*P[i-n+2] + ... + n*P[i]) / (n*(n+1)/2)
//! Warmup: first (n-1) bars are undefined.

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;
use crate::domain::indicator::{
    Indicator, IndicatorDefinition, ParamSpec, ParamValues, PlotMap, PlotSpec, PlotValues,
    single_plot,
};

pub const ID: &str = "wma";

pub fn calculate_wma(candles: &CandleSeries, period: usize) -> PlotValues {
    let closes = candles.closes();
    if period == 0 {
        return vec![None; closes.len()];
    }

    let divisor = (period * (period + 1)) as f64 / 2.0;
    (0..closes.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &closes[i + 1 - period..=i];
            let weighted: f64 = window
                .iter()
                .enumerate()
                .map(|(j, c)| (j + 1) as f64 * c)
                .sum();
            Some(weighted / divisor)
        })
        .collect()
}

pub struct Wma {
    definition: IndicatorDefinition,
}

impl Wma {
    pub fn new() -> Self {
        Wma {
            definition: IndicatorDefinition::new(ID, "Weighted Moving Average", true)
                .param(ParamSpec::integer("period", 20, 1, 1000))
                .plot(PlotSpec::new("wma", "WMA")),
        }
    }
}

impl Default for Wma {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Wma {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn compute(&self, candles: &CandleSeries, params: &ParamValues) -> Result<PlotMap, EngineError> {
        let period = params.period("period")?;
        Ok(single_plot("wma", calculate_wma(candles, period)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::series_from_closes;

    #[test]
    fn wma_warmup() {
        let values = calculate_wma(&series_from_closes(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3);
        assert!(values[0].is_none());
        assert!(values[1].is_none());
        assert!(values[2].is_some());
        assert!(values[4].is_some());
    }

    #[test]
    fn wma_period_1() {
        let values = calculate_wma(&series_from_closes(&[10.0, 20.0, 30.0]), 1);
        assert_eq!(values, vec![Some(10.0), Some(20.0), Some(30.0)]);
    }

    #[test]
    fn wma_known_values() {
        let values = calculate_wma(&series_from_closes(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3);
        let divisor = (3.0 * 4.0) / 2.0;

        let expected = (1.0 * 10.0 + 2.0 * 20.0 + 3.0 * 30.0) / divisor;
        assert!((values[2].unwrap() - expected).abs() < f64::EPSILON);

        let expected = (1.0 * 20.0 + 2.0 * 30.0 + 3.0 * 40.0) / divisor;
        assert!((values[3].unwrap() - expected).abs() < f64::EPSILON);

        let expected = (1.0 * 30.0 + 2.0 * 40.0 + 3.0 * 50.0) / divisor;
        assert!((values[4].unwrap() - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn wma_equal_prices() {
        let values = calculate_wma(&series_from_closes(&[100.0, 100.0, 100.0]), 3);
        assert!((values[2].unwrap() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn wma_period_0() {
        let values = calculate_wma(&series_from_closes(&[10.0, 20.0]), 0);
        assert_eq!(values, vec![None, None]);
    }
}
