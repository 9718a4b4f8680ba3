#![allow(dead_code)]

use std::collections::HashMap;

use stratbench::domain::candle::{Candle, CandleSeries};
use stratbench::domain::error::EngineError;
use stratbench::ports::data_port::DataPort;

pub const START_TIME: i64 = 1_700_000_000;
pub const BAR_SECONDS: i64 = 3_600;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_candles(&self, symbol: &str) -> Result<CandleSeries, EngineError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(EngineError::Data {
                reason: reason.clone(),
            });
        }
        CandleSeries::new(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Flat bar at `close`, `index` bars after `START_TIME`.
pub fn make_candle(index: usize, close: f64) -> Candle {
    Candle {
        time: START_TIME + index as i64 * BAR_SECONDS,
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 1_000.0 + index as f64,
    }
}

pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_candle(i, close))
        .collect()
}

pub fn series_from_closes(closes: &[f64]) -> CandleSeries {
    CandleSeries::new(candles_from_closes(closes)).unwrap()
}

/// Twelve flat bars, a climb 101..=110, then a fall 109..=90.
pub fn v_shape_closes() -> Vec<f64> {
    let mut closes = vec![100.0; 12];
    closes.extend((101..=110).map(f64::from));
    closes.extend((90..=109).rev().map(f64::from));
    closes
}

/// Smooth oscillation around 100, useful for producing several reversals.
pub fn wave_closes(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| 100.0 + (i as f64 * 0.35).sin() * 12.0 + i as f64 * 0.05)
        .collect()
}

/// CSV text in the on-disk candle format.
pub fn csv_from_closes(closes: &[f64]) -> String {
    let mut out = String::from("time,open,high,low,close,volume\n");
    for candle in candles_from_closes(closes) {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            candle.time, candle.open, candle.high, candle.low, candle.close, candle.volume
        ));
    }
    out
}
