//! Domain error type shared by the engine, ports and adapters.

/// Top-level error type for stratbench.
///
/// "Not enough data" is deliberately absent: a series shorter than the
/// strategy warm-up resolves to [`crate::domain::backtest::RunStatus::InsufficientData`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("malformed candle at index {index}: {reason}")]
    MalformedInput { index: usize, reason: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("unknown indicator '{id}'")]
    UnknownIndicator { id: String },

    #[error("indicator {instance_id} failed: {reason}")]
    IndicatorCompute { instance_id: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("rule parse error at position {position}: {message}")]
    RuleParse { position: usize, message: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        EngineError::MalformedInput {
            index,
            reason: reason.into(),
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) | EngineError::Serialize(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. }
            | EngineError::RuleParse { .. } => 2,
            EngineError::Data { .. } | EngineError::MalformedInput { .. } => 3,
            EngineError::InvalidParameter { .. }
            | EngineError::UnknownIndicator { .. }
            | EngineError::IndicatorCompute { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_input_display() {
        let err = EngineError::malformed(3, "duplicate time 1700000000");
        assert_eq!(
            err.to_string(),
            "malformed candle at index 3: duplicate time 1700000000"
        );
    }

    #[test]
    fn invalid_parameter_display() {
        let err = EngineError::invalid_parameter("slow_period", "must exceed fast_period");
        assert_eq!(
            err.to_string(),
            "invalid parameter slow_period: must exceed fast_period"
        );
    }

    #[test]
    fn config_missing_display() {
        let err = EngineError::ConfigMissing {
            section: "backtest".into(),
            key: "fast_period".into(),
        };
        assert_eq!(err.to_string(), "missing config key [backtest] fast_period");
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: EngineError = io.into();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
