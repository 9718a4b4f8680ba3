//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: line from bar slow-1, signal and histogram from bar slow-1 + signal-1.

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;
use crate::domain::indicator::ema::{calculate_ema, ema_values};
use crate::domain::indicator::{
    Indicator, IndicatorDefinition, ParamSpec, ParamValues, PlotMap, PlotSpec, PlotValues,
};

pub const ID: &str = "macd";
pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: PlotValues,
    pub signal: PlotValues,
    pub histogram: PlotValues,
}

pub fn calculate_macd(
    candles: &CandleSeries,
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> MacdSeries {
    let ema_fast = calculate_ema(candles, fast);
    let ema_slow = calculate_ema(candles, slow);

    let line: PlotValues = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let signal = ema_values(&line, signal_period);

    let histogram = line
        .iter()
        .zip(&signal)
        .map(|(l, s)| match (l, s) {
            (Some(l), Some(s)) => Some(l - s),
            _ => None,
        })
        .collect();

    MacdSeries {
        line,
        signal,
        histogram,
    }
}

pub struct Macd {
    definition: IndicatorDefinition,
}

impl Macd {
    pub fn new() -> Self {
        Macd {
            definition: IndicatorDefinition::new(ID, "MACD", false)
                .param(ParamSpec::integer("fast", DEFAULT_FAST as i64, 1, 500))
                .param(ParamSpec::integer("slow", DEFAULT_SLOW as i64, 2, 1000))
                .param(ParamSpec::integer("signal", DEFAULT_SIGNAL as i64, 1, 500))
                .plot(PlotSpec::new("macd", "MACD").with_color("#2962FF"))
                .plot(PlotSpec::new("signal", "Signal").with_color("#FF6D00"))
                .plot(PlotSpec::new("histogram", "Histogram")),
        }
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Macd {
    fn definition(&self) -> &IndicatorDefinition {
        &self.definition
    }

    fn compute(&self, candles: &CandleSeries, params: &ParamValues) -> Result<PlotMap, EngineError> {
        let fast = params.period("fast")?;
        let slow = params.period("slow")?;
        let signal = params.period("signal")?;
        if fast >= slow {
            return Err(EngineError::invalid_parameter(
                "fast",
                format!("fast period {} must be below slow period {}", fast, slow),
            ));
        }

        let series = calculate_macd(candles, fast, slow, signal);
        let mut plots = PlotMap::new();
        plots.insert("macd".to_string(), series.line);
        plots.insert("signal".to_string(), series.signal);
        plots.insert("histogram".to_string(), series.histogram);
        Ok(plots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{ParamValue, series_from_closes};

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + (i as f64 * 0.5).sin() * 5.0 + i as f64 * 0.1)
            .collect()
    }

    #[test]
    fn macd_warmup_default() {
        let series = series_from_closes(&wave(40));
        let macd = calculate_macd(&series, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);

        let line_warmup = DEFAULT_SLOW - 1;
        let signal_warmup = DEFAULT_SLOW - 1 + DEFAULT_SIGNAL - 1;

        assert!(macd.line[line_warmup - 1].is_none());
        assert!(macd.line[line_warmup].is_some());
        assert!(macd.signal[signal_warmup - 1].is_none());
        assert!(macd.signal[signal_warmup].is_some());
        assert!(macd.histogram[signal_warmup - 1].is_none());
        assert!(macd.histogram[signal_warmup].is_some());
    }

    #[test]
    fn macd_histogram_equals_line_minus_signal() {
        let series = series_from_closes(&wave(60));
        let macd = calculate_macd(&series, 5, 10, 4);

        for i in 0..60 {
            if let (Some(l), Some(s), Some(h)) = (macd.line[i], macd.signal[i], macd.histogram[i]) {
                assert!((h - (l - s)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn macd_line_is_ema_fast_minus_ema_slow() {
        let series = series_from_closes(&wave(30));
        let macd = calculate_macd(&series, 3, 6, 3);
        let fast = calculate_ema(&series, 3);
        let slow = calculate_ema(&series, 6);

        for i in 5..30 {
            let expected = fast[i].unwrap() - slow[i].unwrap();
            assert!((macd.line[i].unwrap() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn macd_constant_prices_are_zero() {
        let series = series_from_closes(&[50.0; 30]);
        let macd = calculate_macd(&series, 3, 6, 3);
        for v in macd.histogram.iter().flatten() {
            assert!(v.abs() < 1e-12);
        }
    }

    #[test]
    fn macd_plugin_emits_three_plots() {
        let series = series_from_closes(&wave(40));
        let plots = Macd::new().compute(&series, &defaults()).unwrap();
        assert_eq!(plots.len(), 3);
        assert!(plots.values().all(|p| p.len() == 40));
    }

    #[test]
    fn macd_plugin_rejects_inverted_periods() {
        let series = series_from_closes(&wave(40));
        let params = defaults()
            .with("fast", ParamValue::Integer(30))
            .with("slow", ParamValue::Integer(10));
        let err = Macd::new().compute(&series, &params).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { .. }));
    }

    fn defaults() -> ParamValues {
        ParamValues::new()
            .with("fast", ParamValue::Integer(12))
            .with("slow", ParamValue::Integer(26))
            .with("signal", ParamValue::Integer(9))
    }
}
