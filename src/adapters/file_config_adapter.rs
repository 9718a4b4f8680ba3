//! INI file configuration adapter.
//!
//! Section and key names are lowercased by the parser, and `#`/`;` start a
//! comment, so hex colors are written without the leading `#`.

use std::path::Path;

use configparser::ini::Ini;

use crate::domain::error::EngineError;
use crate::ports::config_port::ConfigPort;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| EngineError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        tracing::debug!(file = %path.display(), "config loaded");
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, EngineError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| EngineError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn sections(&self) -> Vec<String> {
        let mut sections = self.config.sections();
        sections.sort();
        sections
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(&section.to_lowercase())
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[data]
dir = ./candles
symbol = BTCUSDT

[backtest]
initial_capital = 10000.0
fast_period = 5

[strategy]
bullish = CROSS_ABOVE(fast.sma, slow.sma)
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "dir"),
            Some("./candles".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "bullish"),
            Some("CROSS_ABOVE(fast.sma, slow.sma)".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ninitial_capital = 100\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn values_are_returned_raw() {
        let content = "[backtest]\ninitial_capital = 10000.5\nliquidate_at_end = yes\n";
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "initial_capital"),
            Some("10000.5".to_string())
        );
        assert_eq!(
            adapter.get_string("backtest", "liquidate_at_end"),
            Some("yes".to_string())
        );
    }

    #[test]
    fn hex_color_without_hash_survives_comment_stripping() {
        let adapter =
            FileConfigAdapter::from_string("[indicator.fast]\ncolor.sma = 2962ff\n").unwrap();
        assert_eq!(
            adapter.get_string("indicator.fast", "color.sma"),
            Some("2962ff".to_string())
        );
    }

    #[test]
    fn sections_and_keys_are_sorted_and_lowercased() {
        let content = "[indicator.Slow]\ntype = sma\nPeriod = 20\n\n[data]\ndir = x\n\n[indicator.fast]\ntype = ema\n";
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.sections(),
            vec!["data", "indicator.fast", "indicator.slow"]
        );
        assert_eq!(adapter.keys("indicator.slow"), vec!["period", "type"]);
        assert_eq!(adapter.keys("INDICATOR.SLOW"), vec!["period", "type"]);
        assert!(adapter.keys("absent").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\ndir = /var/candles\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "dir"),
            Some("/var/candles".to_string())
        );
    }

    #[test]
    fn from_file_returns_config_parse_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(EngineError::ConfigParse { .. })));
    }
}
