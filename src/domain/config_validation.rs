//! Configuration loading and validation.
//!
//! Every value is checked before a run starts. INI layout:
//!
//! ```ini
//! [data]
//! dir = ./data
//! symbol = BTCUSDT
//!
//! [backtest]
//! initial_capital = 10000
//! fast_period = 5
//! slow_period = 10
//! liquidate_at_end = false
//!
//! [indicator.fast]
//! type = sma
//! period = 20
//! color.sma = 2962FF
//! visible = true
//!
//! [strategy]
//! bullish = CROSS_ABOVE(fast.sma, slow.sma)
//! bearish = CROSS_BELOW(fast.sma, slow.sma)
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::domain::backtest::CrossoverConfig;
use crate::domain::error::EngineError;
use crate::domain::indicator::{IndicatorRegistry, IndicatorWorkspace, ParamValues, normalize_color};
use crate::domain::strategy::RuleStrategy;
use crate::ports::config_port::ConfigPort;

const INDICATOR_PREFIX: &str = "indicator.";
const COLOR_PREFIX: &str = "color.";

/// Where candles come from.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub dir: String,
    pub symbol: Option<String>,
}

/// One `[indicator.<id>]` section, validated against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSpec {
    pub instance_id: String,
    pub indicator_id: String,
    pub params: ParamValues,
    pub colors: BTreeMap<String, String>,
    pub visible: bool,
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> EngineError {
    EngineError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> EngineError {
    EngineError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

/// Non-empty trimmed value, if present.
fn get_value(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, EngineError> {
    match get_value(config, section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("cannot parse '{}'", raw))),
    }
}

fn parse_bool(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<bool>, EngineError> {
    match get_value(config, section, key) {
        None => Ok(None),
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            _ => Err(invalid(section, key, format!("expected a boolean, got '{}'", raw))),
        },
    }
}

pub fn load_data_source(config: &dyn ConfigPort) -> Result<DataSource, EngineError> {
    let dir = get_value(config, "data", "dir").ok_or_else(|| missing("data", "dir"))?;
    Ok(DataSource {
        dir,
        symbol: get_value(config, "data", "symbol"),
    })
}

/// `[backtest]` as a crossover configuration. Periods and capital are
/// required; `liquidate_at_end` defaults to false.
pub fn load_crossover_config(config: &dyn ConfigPort) -> Result<CrossoverConfig, EngineError> {
    let section = "backtest";
    let initial_capital: f64 = parse_value(config, section, "initial_capital")?
        .ok_or_else(|| missing(section, "initial_capital"))?;
    let fast_period: usize = parse_value(config, section, "fast_period")?
        .ok_or_else(|| missing(section, "fast_period"))?;
    let slow_period: usize = parse_value(config, section, "slow_period")?
        .ok_or_else(|| missing(section, "slow_period"))?;
    let liquidate_at_end = parse_bool(config, section, "liquidate_at_end")?.unwrap_or(false);

    let crossover = CrossoverConfig {
        fast_period,
        slow_period,
        initial_capital,
        liquidate_at_end,
    };
    crossover.validate().map_err(|e| match e {
        EngineError::InvalidParameter { name, reason } => invalid(section, &name, reason),
        other => other,
    })?;
    Ok(crossover)
}

/// Capital and liquidation settings for a rule strategy run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleRunConfig {
    pub initial_capital: f64,
    pub liquidate_at_end: bool,
}

/// `[backtest]` for a rule strategy: periods are ignored, capital is required.
pub fn load_rule_run_config(config: &dyn ConfigPort) -> Result<RuleRunConfig, EngineError> {
    let section = "backtest";
    let initial_capital: f64 = parse_value(config, section, "initial_capital")?
        .ok_or_else(|| missing(section, "initial_capital"))?;
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(invalid(section, "initial_capital", "must be positive"));
    }
    Ok(RuleRunConfig {
        initial_capital,
        liquidate_at_end: parse_bool(config, section, "liquidate_at_end")?.unwrap_or(false),
    })
}

/// Normalize a hex color to `#RRGGBB`; the leading `#` is optional.
fn parse_color(section: &str, key: &str, raw: &str) -> Result<String, EngineError> {
    normalize_color(raw)
        .ok_or_else(|| invalid(section, key, format!("expected a RRGGBB hex color, got '{}'", raw)))
}

/// Every `[indicator.<id>]` section, in section-name order.
pub fn load_indicator_specs(
    config: &dyn ConfigPort,
    registry: &IndicatorRegistry,
) -> Result<Vec<IndicatorSpec>, EngineError> {
    let mut specs = Vec::new();
    for section in config.sections() {
        let Some(instance_id) = section.strip_prefix(INDICATOR_PREFIX) else {
            continue;
        };
        if instance_id.is_empty() {
            return Err(invalid(&section, "", "indicator section needs a name"));
        }

        let indicator_id =
            get_value(config, &section, "type").ok_or_else(|| missing(&section, "type"))?;
        let indicator = registry
            .get(&indicator_id)
            .ok_or_else(|| invalid(&section, "type", format!("unknown indicator '{}'", indicator_id)))?;
        let definition = indicator.definition();

        let mut params = ParamValues::new();
        let mut colors = BTreeMap::new();
        for key in config.keys(&section) {
            if key == "type" || key == "visible" {
                continue;
            }
            let raw = get_value(config, &section, &key).unwrap_or_default();
            if let Some(plot) = key.strip_prefix(COLOR_PREFIX) {
                if !definition.has_plot(plot) {
                    return Err(invalid(&section, &key, format!("{} has no plot '{}'", indicator_id, plot)));
                }
                colors.insert(plot.to_string(), parse_color(&section, &key, &raw)?);
                continue;
            }
            let spec = definition.param_spec(&key).ok_or_else(|| {
                invalid(&section, &key, format!("not a parameter of {}", indicator_id))
            })?;
            let value = spec.parse(&raw).map_err(|e| invalid(&section, &key, e.to_string()))?;
            params.insert(&key, value);
        }

        specs.push(IndicatorSpec {
            instance_id: instance_id.to_string(),
            indicator_id,
            params,
            colors,
            visible: parse_bool(config, &section, "visible")?.unwrap_or(true),
        });
    }
    Ok(specs)
}

/// Attach every spec to a fresh workspace, applying colors and visibility.
pub fn build_workspace(
    specs: &[IndicatorSpec],
    registry: &IndicatorRegistry,
) -> Result<IndicatorWorkspace, EngineError> {
    let mut workspace = IndicatorWorkspace::new();
    for spec in specs {
        workspace.add_named(registry, &spec.indicator_id, &spec.instance_id, &spec.params)?;
        for (plot, color) in &spec.colors {
            workspace.set_plot_color(&spec.instance_id, plot, color)?;
        }
        workspace.set_visible(&spec.instance_id, spec.visible);
    }
    Ok(workspace)
}

/// `[strategy]` rules, if the section is present. Both rules are required
/// once either is given, and must reference configured indicator plots.
pub fn load_strategy(
    config: &dyn ConfigPort,
    specs: &[IndicatorSpec],
    registry: &IndicatorRegistry,
) -> Result<Option<RuleStrategy>, EngineError> {
    let section = "strategy";
    let bullish = get_value(config, section, "bullish");
    let bearish = get_value(config, section, "bearish");
    let (bullish, bearish) = match (bullish, bearish) {
        (None, None) => return Ok(None),
        (Some(_), None) => return Err(missing(section, "bearish")),
        (None, Some(_)) => return Err(missing(section, "bullish")),
        (Some(b), Some(s)) => (b, s),
    };

    let strategy = RuleStrategy::parse(&bullish, &bearish)?;
    let refs = strategy
        .bullish
        .plot_refs()
        .into_iter()
        .chain(strategy.bearish.plot_refs());
    for (instance_id, plot) in refs {
        let known = specs.iter().any(|s| {
            s.instance_id == instance_id
                && registry
                    .get(&s.indicator_id)
                    .is_some_and(|i| i.definition().has_plot(&plot))
        });
        if !known {
            return Err(invalid(
                section,
                "rule",
                format!("{}.{} is not a configured indicator plot", instance_id, plot),
            ));
        }
    }
    Ok(Some(strategy))
}

/// Validate everything a `backtest` run needs.
pub fn validate_config(
    config: &dyn ConfigPort,
    registry: &IndicatorRegistry,
) -> Result<(), EngineError> {
    load_data_source(config)?;
    let specs = load_indicator_specs(config, registry)?;
    build_workspace(&specs, registry)?;
    if load_strategy(config, &specs, registry)?.is_some() {
        load_rule_run_config(config)?;
    } else {
        load_crossover_config(config)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::ParamValue;
    use std::collections::HashMap;

    struct MapConfig {
        data: HashMap<String, HashMap<String, String>>,
    }

    impl MapConfig {
        fn new(ini: &[(&str, &[(&str, &str)])]) -> Self {
            let data = ini
                .iter()
                .map(|(section, kvs)| {
                    let map = kvs
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect();
                    (section.to_string(), map)
                })
                .collect();
            Self { data }
        }
    }

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.data.get(section)?.get(key).cloned()
        }

        fn sections(&self) -> Vec<String> {
            let mut s: Vec<String> = self.data.keys().cloned().collect();
            s.sort();
            s
        }

        fn keys(&self, section: &str) -> Vec<String> {
            let mut k: Vec<String> = self
                .data
                .get(section)
                .map(|m| m.keys().cloned().collect())
                .unwrap_or_default();
            k.sort();
            k
        }
    }

    const BACKTEST: (&str, &[(&str, &str)]) = (
        "backtest",
        &[
            ("initial_capital", "10000"),
            ("fast_period", "5"),
            ("slow_period", "10"),
        ],
    );

    const DATA: (&str, &[(&str, &str)]) = ("data", &[("dir", "./data"), ("symbol", "BTCUSDT")]);

    fn assert_invalid(err: EngineError, expected_key: &str) {
        match err {
            EngineError::ConfigInvalid { key, .. } => assert_eq!(key, expected_key),
            other => panic!("expected ConfigInvalid for {}, got {:?}", expected_key, other),
        }
    }

    #[test]
    fn loads_crossover_config() {
        let config = MapConfig::new(&[BACKTEST]);
        let c = load_crossover_config(&config).unwrap();
        assert_eq!(c.fast_period, 5);
        assert_eq!(c.slow_period, 10);
        assert_eq!(c.initial_capital, 10_000.0);
        assert!(!c.liquidate_at_end);
    }

    #[test]
    fn missing_period_reported() {
        let config = MapConfig::new(&[("backtest", &[("initial_capital", "100"), ("fast_period", "5")])]);
        assert!(matches!(
            load_crossover_config(&config),
            Err(EngineError::ConfigMissing { ref key, .. }) if key == "slow_period"
        ));
    }

    #[test]
    fn non_numeric_value_rejected() {
        let config = MapConfig::new(&[(
            "backtest",
            &[("initial_capital", "lots"), ("fast_period", "5"), ("slow_period", "10")],
        )]);
        assert_invalid(load_crossover_config(&config).unwrap_err(), "initial_capital");
    }

    #[test]
    fn slow_not_above_fast_rejected() {
        let config = MapConfig::new(&[(
            "backtest",
            &[("initial_capital", "100"), ("fast_period", "10"), ("slow_period", "10")],
        )]);
        assert_invalid(load_crossover_config(&config).unwrap_err(), "slow_period");
    }

    #[test]
    fn bad_boolean_rejected() {
        let config = MapConfig::new(&[(
            "backtest",
            &[
                ("initial_capital", "100"),
                ("fast_period", "5"),
                ("slow_period", "10"),
                ("liquidate_at_end", "maybe"),
            ],
        )]);
        assert_invalid(load_crossover_config(&config).unwrap_err(), "liquidate_at_end");
    }

    #[test]
    fn data_dir_required() {
        let config = MapConfig::new(&[("data", &[("symbol", "ETHUSDT")])]);
        assert!(matches!(
            load_data_source(&config),
            Err(EngineError::ConfigMissing { ref key, .. }) if key == "dir"
        ));
        let ok = load_data_source(&MapConfig::new(&[DATA])).unwrap();
        assert_eq!(ok.symbol.as_deref(), Some("BTCUSDT"));
    }

    #[test]
    fn indicator_sections_parsed() {
        let registry = IndicatorRegistry::with_builtins();
        let config = MapConfig::new(&[
            BACKTEST,
            (
                "indicator.bands",
                &[
                    ("type", "bollinger"),
                    ("period", "14"),
                    ("mult", "2.5"),
                    ("color.upper", "#ff0000"),
                    ("visible", "no"),
                ],
            ),
            ("indicator.trend", &[("type", "ema")]),
        ]);
        let specs = load_indicator_specs(&config, &registry).unwrap();
        assert_eq!(specs.len(), 2);

        let bands = &specs[0];
        assert_eq!(bands.instance_id, "bands");
        assert_eq!(bands.params.get("period"), Some(ParamValue::Integer(14)));
        assert_eq!(bands.params.get("mult"), Some(ParamValue::Float(2.5)));
        assert_eq!(bands.colors["upper"], "#FF0000");
        assert!(!bands.visible);
        assert!(specs[1].visible);
        assert!(specs[1].params.is_empty());

        let ws = build_workspace(&specs, &registry).unwrap();
        let inst = ws.get("bands").unwrap();
        assert_eq!(inst.colors["upper"], "#FF0000");
        assert!(!inst.visible);
        assert_eq!(ws.get("trend").unwrap().params.get("period"), Some(ParamValue::Integer(20)));
    }

    #[test]
    fn indicator_errors() {
        let registry = IndicatorRegistry::with_builtins();
        let cases: [(&[(&str, &str)], &str); 5] = [
            (&[("type", "ichimoku")], "type"),
            (&[("type", "sma"), ("length", "3")], "length"),
            (&[("type", "sma"), ("period", "0")], "period"),
            (&[("type", "sma"), ("color.ema", "FF0000")], "color.ema"),
            (&[("type", "sma"), ("color.sma", "red")], "color.sma"),
        ];
        for (keys, bad_key) in cases {
            let config = MapConfig::new(&[("indicator.x", keys)]);
            assert_invalid(load_indicator_specs(&config, &registry).unwrap_err(), bad_key);
        }

        let no_type = MapConfig::new(&[("indicator.x", &[("period", "3")])]);
        assert!(matches!(
            load_indicator_specs(&no_type, &registry),
            Err(EngineError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn strategy_section() {
        let registry = IndicatorRegistry::with_builtins();
        let config = MapConfig::new(&[
            ("indicator.fast", &[("type", "sma"), ("period", "3")]),
            ("indicator.slow", &[("type", "sma"), ("period", "6")]),
            (
                "strategy",
                &[
                    ("bullish", "CROSS_ABOVE(fast.sma, slow.sma)"),
                    ("bearish", "CROSS_BELOW(fast.sma, slow.sma)"),
                ],
            ),
        ]);
        let specs = load_indicator_specs(&config, &registry).unwrap();
        let strategy = load_strategy(&config, &specs, &registry).unwrap();
        assert!(strategy.is_some());

        assert!(load_strategy(&MapConfig::new(&[]), &specs, &registry).unwrap().is_none());
    }

    #[test]
    fn strategy_requires_known_plots_and_both_rules() {
        let registry = IndicatorRegistry::with_builtins();
        let config = MapConfig::new(&[
            ("indicator.fast", &[("type", "sma")]),
            (
                "strategy",
                &[("bullish", "ABOVE(fast.ema, 1)"), ("bearish", "BELOW(close, 1)")],
            ),
        ]);
        let specs = load_indicator_specs(&config, &registry).unwrap();
        assert_invalid(load_strategy(&config, &specs, &registry).unwrap_err(), "rule");

        let half = MapConfig::new(&[("strategy", &[("bullish", "ABOVE(close, 1)")])]);
        assert!(matches!(
            load_strategy(&half, &[], &registry),
            Err(EngineError::ConfigMissing { ref key, .. }) if key == "bearish"
        ));
    }

    #[test]
    fn rule_run_config_ignores_periods() {
        let config = MapConfig::new(&[(
            "backtest",
            &[("initial_capital", "2500"), ("liquidate_at_end", "yes")],
        )]);
        let run = load_rule_run_config(&config).unwrap();
        assert_eq!(run.initial_capital, 2500.0);
        assert!(run.liquidate_at_end);

        let broke = MapConfig::new(&[("backtest", &[("initial_capital", "-5")])]);
        assert_invalid(load_rule_run_config(&broke).unwrap_err(), "initial_capital");
    }

    #[test]
    fn validate_config_full() {
        let registry = IndicatorRegistry::with_builtins();
        assert!(validate_config(&MapConfig::new(&[DATA, BACKTEST]), &registry).is_ok());
        assert!(validate_config(&MapConfig::new(&[BACKTEST]), &registry).is_err());
    }
}
