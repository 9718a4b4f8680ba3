//! OHLCV candle representation and the validated candle series.

use serde::{Deserialize, Serialize};

use crate::domain::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Unix seconds.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    fn check(&self, index: usize) -> Result<(), EngineError> {
        let prices = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, value) in prices {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::malformed(
                    index,
                    format!("{name} must be a positive finite price, got {value}"),
                ));
            }
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(EngineError::malformed(
                index,
                format!("volume must be non-negative, got {}", self.volume),
            ));
        }
        if self.low > self.open.min(self.close) {
            return Err(EngineError::malformed(
                index,
                format!("low {} above open/close", self.low),
            ));
        }
        if self.high < self.open.max(self.close) {
            return Err(EngineError::malformed(
                index,
                format!("high {} below open/close", self.high),
            ));
        }
        Ok(())
    }
}

/// A time-ascending, gap-tolerant candle sequence.
///
/// Construction validates every bar; once built the series is immutable and
/// every consumer may rely on strictly increasing times and sane OHLC values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Result<Self, EngineError> {
        for (i, candle) in candles.iter().enumerate() {
            candle.check(i)?;
            if i > 0 {
                let prev = candles[i - 1].time;
                if candle.time == prev {
                    return Err(EngineError::malformed(
                        i,
                        format!("duplicate time {}", candle.time),
                    ));
                }
                if candle.time < prev {
                    return Err(EngineError::malformed(
                        i,
                        format!("time {} precedes previous bar {}", candle.time, prev),
                    ));
                }
            }
        }
        Ok(Self { candles })
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn first(&self) -> Option<&Candle> {
        self.candles.first()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn times(&self) -> Vec<i64> {
        self.candles.iter().map(|c| c.time).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }
}

impl<'a> IntoIterator for &'a CandleSeries {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}
