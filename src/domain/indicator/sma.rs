//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = mean(C[i-n+1 ..= i])
//! Warmup: first (n-1) bars are undefined.
//!
//! Each value is summed from its own window rather than maintained as a
//! running sum, so long series do not accumulate add/subtract drift.

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;
use crate::domain::indicator::{
    Indicator, IndicatorDefinition, ParamSpec, ParamValues, PlotMap, PlotSpec, PlotValues,
    single_plot,
};

pub const ID: &str = "sma";

pub fn sma_values(values: &[f64], period: usize) -> PlotValues {
    if period == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                None
            } else {
                let sum: f64 = values[i + 1 - period..=i].iter().sum();
                Some(sum / period as f64)
            }
        })
        .collect()
}

pub fn calculate_sma(candles: &CandleSeries, period: usize) -> PlotValues {
    sma_values(&candles.closes(), period)
}

pub struct Sma {
    definition: IndicatorDefinition,
}

impl Sma {
    pub fn new() -> Self {
        Sma {
            definition: IndicatorDefinition::new(ID, "Simple Moving Average", true)
                .param(ParamSpec::integer("period", 20, 1, 1000))
                .plot(PlotSpec::new("sma", "SMA")),
        }
    }
}

impl Default for Sma {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Sma {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn compute(&self, candles: &CandleSeries, params: &ParamValues) -> Result<PlotMap, EngineError> {
        let period = params.period("period")?;
        Ok(single_plot("sma", calculate_sma(candles, period)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{ParamValue, series_from_closes};

    #[test]
    fn sma_warmup() {
        let values = sma_values(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert_eq!(values[0], None);
        assert_eq!(values[1], None);
        assert!(values[2].is_some());
        assert!(values[4].is_some());
    }

    #[test]
    fn sma_known_values() {
        let values = sma_values(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert!((values[2].unwrap() - 20.0).abs() < f64::EPSILON);
        assert!((values[3].unwrap() - 30.0).abs() < f64::EPSILON);
        assert!((values[4].unwrap() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sma_period_1_is_close() {
        let values = sma_values(&[7.0, 8.0], 1);
        assert_eq!(values, vec![Some(7.0), Some(8.0)]);
    }

    #[test]
    fn sma_period_longer_than_series() {
        let values = sma_values(&[1.0, 2.0], 5);
        assert_eq!(values, vec![None, None]);
    }

    #[test]
    fn sma_period_0_is_all_undefined() {
        assert_eq!(sma_values(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn sma_constant_prices_are_exact() {
        let values = sma_values(&[100.0; 40], 10);
        for v in values.iter().skip(9) {
            assert_eq!(*v, Some(100.0));
        }
    }

    #[test]
    fn sma_plugin_compute() {
        let series = series_from_closes(&[1.0, 2.0, 3.0, 4.0]);
        let params = ParamValues::new().with("period", ParamValue::Integer(2));
        let plots = Sma::new().compute(&series, &params).unwrap();
        assert_eq!(plots["sma"], vec![None, Some(1.5), Some(2.5), Some(3.5)]);
    }

    #[test]
    fn sma_plugin_requires_period() {
        let series = series_from_closes(&[1.0]);
        assert!(Sma::new().compute(&series, &ParamValues::new()).is_err());
    }
}
