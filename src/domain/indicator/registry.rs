//! Indicator catalog keyed by indicator id.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::error::EngineError;
use crate::domain::indicator::atr::Atr;
use crate::domain::indicator::bollinger::Bollinger;
use crate::domain::indicator::ema::Ema;
use crate::domain::indicator::macd::Macd;
use crate::domain::indicator::obv::Obv;
use crate::domain::indicator::roc::Roc;
use crate::domain::indicator::rsi::Rsi;
use crate::domain::indicator::sma::Sma;
use crate::domain::indicator::stddev::StdDev;
use crate::domain::indicator::wma::Wma;
use crate::domain::indicator::{Indicator, IndicatorDefinition};

/// Registry of available indicators, built once at process start and then
/// shared read-only (`Arc` entries make it cheap to hand to worker threads).
#[derive(Clone, Default)]
pub struct IndicatorRegistry {
    indicators: HashMap<String, Arc<dyn Indicator>>,
}

impl IndicatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Sma::new()));
        registry.register(Arc::new(Ema::new()));
        registry.register(Arc::new(Wma::new()));
        registry.register(Arc::new(Rsi::new()));
        registry.register(Arc::new(Macd::new()));
        registry.register(Arc::new(Bollinger::new()));
        registry.register(Arc::new(StdDev::new()));
        registry.register(Arc::new(Roc::new()));
        registry.register(Arc::new(Obv::new()));
        registry.register(Arc::new(Atr::new()));
        registry
    }

    /// Register an indicator under its definition id, replacing any previous
    /// entry with the same id.
    pub fn register(&mut self, indicator: Arc<dyn Indicator>) {
        let id = indicator.definition().id.clone();
        self.indicators.insert(id, indicator);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Indicator>> {
        self.indicators.get(id)
    }

    pub fn lookup(&self, id: &str) -> Result<&Arc<dyn Indicator>, EngineError> {
        self.get(id).ok_or_else(|| EngineError::UnknownIndicator { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.indicators.contains_key(id)
    }

    /// All definitions, sorted by id.
    pub fn definitions(&self) -> Vec<&IndicatorDefinition> {
        let mut defs: Vec<&IndicatorDefinition> =
            self.indicators.values().map(|i| i.definition()).collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }
}

impl std::fmt::Debug for IndicatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<&str> = self.definitions().iter().map(|d| d.id.as_str()).collect();
        f.debug_struct("IndicatorRegistry").field("ids", &ids).finish()
    }
}
