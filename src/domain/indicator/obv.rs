//! OBV (On-Balance Volume) indicator implementation.

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;
use crate::domain::indicator::{
    Indicator, IndicatorDefinition, ParamValues, PlotMap, PlotSpec, PlotValues, single_plot,
};

pub const ID: &str = "obv";

/// Calculate OBV (On-Balance Volume) indicator.
///
/// OBV[0] = volume[0]
/// If close[i] > close[i-1]: OBV[i] = OBV[i-1] + volume[i]
/// If close[i] < close[i-1]: OBV[i] = OBV[i-1] - volume[i]
/// If close[i] == close[i-1]: OBV[i] = OBV[i-1]
///
/// No warmup period; every bar is defined.
pub fn calculate_obv(candles: &CandleSeries) -> PlotValues {
    let mut values = Vec::with_capacity(candles.len());
    let mut obv = 0.0;
    let mut prev_close = None;

    for candle in candles {
        match prev_close {
            None => obv = candle.volume,
            Some(prev) if candle.close > prev => obv += candle.volume,
            Some(prev) if candle.close < prev => obv -= candle.volume,
            Some(_) => {}
        }
        prev_close = Some(candle.close);
        values.push(Some(obv));
    }

    values
}

pub struct Obv {
    definition: IndicatorDefinition,
}

impl Obv {
    pub fn new() -> Self {
        Obv {
            definition: IndicatorDefinition::new(ID, "On-Balance Volume", false)
                .plot(PlotSpec::new("obv", "OBV")),
        }
    }
}

impl Default for Obv {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Obv {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn compute(&self, candles: &CandleSeries, _params: &ParamValues) -> Result<PlotMap, EngineError> {
        Ok(single_plot("obv", calculate_obv(candles)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;

    fn make_series(bars: &[(f64, f64)]) -> CandleSeries {
        let candles = bars
            .iter()
            .enumerate()
            .map(|(i, &(close, volume))| Candle {
                time: i as i64 * 3600,
                open: close,
                high: close,
                low: close,
                close,
                volume,
            })
            .collect();
        CandleSeries::new(candles).unwrap()
    }

    #[test]
    fn obv_first_bar_is_volume() {
        let values = calculate_obv(&make_series(&[(100.0, 5000.0)]));
        assert_eq!(values, vec![Some(5000.0)]);
    }

    #[test]
    fn obv_adds_and_subtracts() {
        let values = calculate_obv(&make_series(&[
            (100.0, 1000.0),
            (105.0, 2000.0),
            (103.0, 500.0),
            (103.0, 700.0),
        ]));
        assert_eq!(
            values,
            vec![Some(1000.0), Some(3000.0), Some(2500.0), Some(2500.0)]
        );
    }

    #[test]
    fn obv_empty() {
        assert!(calculate_obv(&make_series(&[])).is_empty());
    }
}
