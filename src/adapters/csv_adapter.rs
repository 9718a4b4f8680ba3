//! CSV file candle adapter.
//!
//! One file per symbol, `<dir>/<SYMBOL>.csv`, with the header
//! `time,open,high,low,close,volume` and `time` in Unix seconds.

use std::fs;
use std::path::PathBuf;

use crate::domain::candle::{Candle, CandleSeries};
use crate::domain::error::EngineError;
use crate::ports::data_port::DataPort;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_candles(&self, symbol: &str) -> Result<CandleSeries, EngineError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| EngineError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut candles = Vec::new();
        for (index, row) in rdr.deserialize::<Candle>().enumerate() {
            let candle = row.map_err(|e| EngineError::malformed(index, e.to_string()))?;
            candles.push(candle);
        }

        tracing::debug!(symbol, bars = candles.len(), path = %path.display(), "loaded candles");
        CandleSeries::new(candles)
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| EngineError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                symbols.push(stem.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "time,open,high,low,close,volume\n";

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = format!(
            "{HEADER}\
            1700000000,100.0,110.0,90.0,105.0,50000\n\
            1700000060,105.0,115.0,100.0,110.0,60000.5\n\
            1700000180,110.0,120.0,105.0,115.0,55000\n"
        );

        fs::write(path.join("BTCUSDT.csv"), csv_content).unwrap();
        fs::write(path.join("ETHUSDT.csv"), HEADER).unwrap();
        fs::write(path.join("notes.txt"), "not candles").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_candles_returns_correct_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let series = adapter.fetch_candles("BTCUSDT").unwrap();

        assert_eq!(series.len(), 3);
        let first = series.first().unwrap();
        assert_eq!(first.time, 1_700_000_000);
        assert_eq!(first.open, 100.0);
        assert_eq!(first.high, 110.0);
        assert_eq!(first.low, 90.0);
        assert_eq!(first.close, 105.0);
        assert_eq!(first.volume, 50000.0);
        assert_eq!(series.get(1).unwrap().volume, 60000.5);
        // Gap between 60 and 180 is tolerated.
        assert_eq!(series.times(), vec![1_700_000_000, 1_700_000_060, 1_700_000_180]);
    }

    #[test]
    fn header_only_file_is_empty_series() {
        let (_dir, path) = setup_test_data();
        let series = CsvAdapter::new(path).fetch_candles("ETHUSDT").unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn fetch_candles_errors_for_missing_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let err = adapter.fetch_candles("XYZ").unwrap_err();
        assert!(matches!(err, EngineError::Data { .. }));
    }

    #[test]
    fn unparseable_row_is_malformed() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD.csv"),
            format!("{HEADER}1700000000,100,110,90,105,1\n1700000060,abc,110,90,105,1\n"),
        )
        .unwrap();
        let err = CsvAdapter::new(path).fetch_candles("BAD").unwrap_err();
        assert!(matches!(err, EngineError::MalformedInput { index: 1, .. }));
    }

    #[test]
    fn out_of_order_rows_are_rejected() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("UNSORTED.csv"),
            format!("{HEADER}1700000060,100,110,90,105,1\n1700000000,100,110,90,105,1\n"),
        )
        .unwrap();
        let err = CsvAdapter::new(path).fetch_candles("UNSORTED").unwrap_err();
        assert!(matches!(err, EngineError::MalformedInput { index: 1, .. }));
    }

    #[test]
    fn list_symbols_returns_csv_stems_sorted() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_symbols().unwrap(), vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn list_symbols_errors_for_missing_dir() {
        let adapter = CsvAdapter::new("/nonexistent/candles");
        assert!(matches!(
            adapter.list_symbols(),
            Err(EngineError::Data { .. })
        ));
    }
}
