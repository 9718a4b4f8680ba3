//! Technical indicator framework.
//!
//! This module provides the plugin contract and the types shared by every
//! indicator:
//! - `IndicatorDefinition`: static metadata (parameter schema, plots, overlay flag)
//! - `ParamSpec` / `ParamValue` / `ParamValues`: typed, range-checked parameters
//! - `Indicator`: the capability every built-in or third-party indicator implements
//! - `PlotMap`: per-plot output values aligned with the candle series, `None`
//!   during warm-up
//!
//! The registry, instance management and the calculator live in submodules.

pub mod atr;
pub mod bollinger;
pub mod calculator;
pub mod ema;
pub mod instance;
pub mod macd;
pub mod obv;
pub mod registry;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod wma;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;

pub use calculator::{IndicatorPoint, IndicatorResult, IndicatorRun, recalculate};
pub use instance::{
    DEFAULT_PALETTE, IndicatorInstance, IndicatorWorkspace, PaletteCursor, add_indicator,
    normalize_color,
};
pub use registry::IndicatorRegistry;

/// Output values of one plot, index-aligned with the input candles.
pub type PlotValues = Vec<Option<f64>>;

/// Plot id -> values.
pub type PlotMap = BTreeMap<String, PlotValues>;

/// A pluggable indicator.
///
/// `compute` must be a pure function of its inputs and return one entry per
/// declared plot, each exactly as long as the candle series.
pub trait Indicator: Send + Sync {
    fn definition(&self) -> &IndicatorDefinition;

    fn compute(&self, candles: &CandleSeries, params: &ParamValues) -> Result<PlotMap, EngineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Integer,
    Float,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
}

impl ParamValue {
    pub fn kind(&self) -> ParamKind {
        match self {
            ParamValue::Integer(_) => ParamKind::Integer,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Boolean(_) => ParamKind::Boolean,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Boolean(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Boolean(v) => write!(f, "{}", v),
        }
    }
}

/// One entry of an indicator's parameter schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub default: ParamValue,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ParamSpec {
    pub fn integer(name: &str, default: i64, min: i64, max: i64) -> Self {
        ParamSpec {
            name: name.to_string(),
            kind: ParamKind::Integer,
            default: ParamValue::Integer(default),
            min: Some(min as f64),
            max: Some(max as f64),
        }
    }

    pub fn float(name: &str, default: f64, min: f64, max: f64) -> Self {
        ParamSpec {
            name: name.to_string(),
            kind: ParamKind::Float,
            default: ParamValue::Float(default),
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn boolean(name: &str, default: bool) -> Self {
        ParamSpec {
            name: name.to_string(),
            kind: ParamKind::Boolean,
            default: ParamValue::Boolean(default),
            min: None,
            max: None,
        }
    }

    /// Type- and range-check a value, widening integers for float parameters.
    pub fn check(&self, value: ParamValue) -> Result<ParamValue, EngineError> {
        let value = match (self.kind, value) {
            (ParamKind::Float, ParamValue::Integer(v)) => ParamValue::Float(v as f64),
            (kind, v) if kind == v.kind() => v,
            (kind, v) => {
                return Err(EngineError::invalid_parameter(
                    &self.name,
                    format!("expected {:?}, got {}", kind, v).to_lowercase(),
                ));
            }
        };

        if let Some(v) = value.as_f64() {
            if !v.is_finite() {
                return Err(EngineError::invalid_parameter(&self.name, "must be finite"));
            }
            if let Some(min) = self.min {
                if v < min {
                    return Err(EngineError::invalid_parameter(
                        &self.name,
                        format!("{} is below minimum {}", value, min),
                    ));
                }
            }
            if let Some(max) = self.max {
                if v > max {
                    return Err(EngineError::invalid_parameter(
                        &self.name,
                        format!("{} is above maximum {}", value, max),
                    ));
                }
            }
        }
        Ok(value)
    }

    /// Parse a textual value (config files, CLI) according to this spec.
    pub fn parse(&self, raw: &str) -> Result<ParamValue, EngineError> {
        let raw = raw.trim();
        let parsed = match self.kind {
            ParamKind::Integer => raw.parse::<i64>().ok().map(ParamValue::Integer),
            ParamKind::Float => raw.parse::<f64>().ok().map(ParamValue::Float),
            ParamKind::Boolean => match raw.to_lowercase().as_str() {
                "true" | "yes" | "1" => Some(ParamValue::Boolean(true)),
                "false" | "no" | "0" => Some(ParamValue::Boolean(false)),
                _ => None,
            },
        };
        let value = parsed.ok_or_else(|| {
            EngineError::invalid_parameter(&self.name, format!("cannot parse '{}'", raw))
        })?;
        self.check(value)
    }
}

/// One output channel of an indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSpec {
    pub id: String,
    pub label: String,
    /// Author-specified default color; `None` means "take the next palette color".
    pub color: Option<String>,
}

impl PlotSpec {
    pub fn new(id: &str, label: &str) -> Self {
        PlotSpec {
            id: id.to_string(),
            label: label.to_string(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorDefinition {
    pub id: String,
    pub label: String,
    pub params: Vec<ParamSpec>,
    pub plots: Vec<PlotSpec>,
    /// Drawn on the price axis rather than in a separate panel.
    pub overlay: bool,
}

impl IndicatorDefinition {
    pub fn new(id: &str, label: &str, overlay: bool) -> Self {
        IndicatorDefinition {
            id: id.to_string(),
            label: label.to_string(),
            params: Vec::new(),
            plots: Vec::new(),
            overlay,
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn plot(mut self, spec: PlotSpec) -> Self {
        self.plots.push(spec);
        self
    }

    pub fn param_spec(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn has_plot(&self, id: &str) -> bool {
        self.plots.iter().any(|p| p.id == id)
    }
}

/// Concrete parameter values, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamValues(BTreeMap<String, ParamValue>);

impl ParamValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Positive integer parameter, as used for lookback periods.
    pub fn period(&self, name: &str) -> Result<usize, EngineError> {
        match self.get(name) {
            Some(ParamValue::Integer(v)) if v > 0 => Ok(v as usize),
            Some(other) => Err(EngineError::invalid_parameter(
                name,
                format!("expected a positive integer, got {}", other),
            )),
            None => Err(EngineError::invalid_parameter(name, "missing")),
        }
    }

    pub fn float(&self, name: &str) -> Result<f64, EngineError> {
        self.get(name)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| EngineError::invalid_parameter(name, "expected a number"))
    }
}

impl fmt::Display for ParamValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Validate caller-supplied values against a definition's schema.
///
/// Unknown names, type mismatches and out-of-range values are rejected;
/// parameters the caller omitted take their schema default.
pub fn validate_params(
    definition: &IndicatorDefinition,
    raw: &ParamValues,
) -> Result<ParamValues, EngineError> {
    for (name, _) in raw.iter() {
        if definition.param_spec(name).is_none() {
            return Err(EngineError::invalid_parameter(
                name.as_str(),
                format!("not a parameter of {}", definition.id),
            ));
        }
    }

    let mut resolved = ParamValues::new();
    for spec in &definition.params {
        let value = match raw.get(&spec.name) {
            Some(v) => spec.check(v)?,
            None => spec.default,
        };
        resolved.insert(&spec.name, value);
    }
    Ok(resolved)
}

/// Wrap a single output series as a plot map.
pub fn single_plot(id: &str, values: PlotValues) -> PlotMap {
    let mut plots = PlotMap::new();
    plots.insert(id.to_string(), values);
    plots
}

#[cfg(test)]
pub(crate) fn series_from_closes(closes: &[f64]) -> CandleSeries {
    use crate::domain::candle::Candle;

    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            time: 1_700_000_000 + i as i64 * 60,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect();
    CandleSeries::new(candles).unwrap()
}
