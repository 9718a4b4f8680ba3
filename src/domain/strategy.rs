//! Raw rule strategies: a bullish and a bearish rule evaluated per bar.

use serde::Serialize;

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;
use crate::domain::rule::Rule;
use crate::domain::rule_eval::{IndicatorResults, evaluate};
use crate::domain::rule_parser;
use crate::domain::signal::Signal;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleStrategy {
    pub bullish: Rule,
    pub bearish: Rule,
}

impl RuleStrategy {
    pub fn new(bullish: Rule, bearish: Rule) -> Self {
        Self { bullish, bearish }
    }

    /// Build from rule DSL text.
    pub fn parse(bullish: &str, bearish: &str) -> Result<Self, EngineError> {
        Ok(Self {
            bullish: rule_parser::parse(bullish)?,
            bearish: rule_parser::parse(bearish)?,
        })
    }

    /// Fail if either rule references an instance or plot absent from `results`.
    pub fn check_refs(&self, results: &IndicatorResults) -> Result<(), EngineError> {
        let refs = self.bullish.plot_refs().into_iter().chain(self.bearish.plot_refs());
        for (instance_id, plot) in refs {
            let known = results
                .get(&instance_id)
                .is_some_and(|r| r.plot(&plot).is_some());
            if !known {
                return Err(EngineError::invalid_parameter(
                    "rule",
                    format!("references unknown plot {}.{}", instance_id, plot),
                ));
            }
        }
        Ok(())
    }

    /// First bar at which both rules can be evaluated: every referenced plot is
    /// defined and each rule's look-back window lies on defined bars. `None`
    /// when some referenced plot is never defined (or missing).
    pub fn warmup(&self, results: &IndicatorResults) -> Option<usize> {
        let refs = self.bullish.plot_refs().into_iter().chain(self.bearish.plot_refs());
        let mut warmup = 0;
        for (instance_id, plot) in refs {
            let points = results.get(&instance_id)?.plot(&plot)?;
            let first = points.iter().position(|p| p.value.is_some())?;
            warmup = warmup.max(first);
        }
        Some(warmup + self.bullish.lookback().max(self.bearish.lookback()))
    }

    pub fn signal_at(&self, candles: &CandleSeries, results: &IndicatorResults, i: usize) -> Signal {
        let bullish = evaluate(&self.bullish, candles, results, i);
        let bearish = evaluate(&self.bearish, candles, results, i);
        match (bullish, bearish) {
            (true, false) => Signal::Bullish,
            (false, true) => Signal::Bearish,
            _ => Signal::Hold,
        }
    }

    /// One signal per candle.
    pub fn signals(&self, candles: &CandleSeries, results: &IndicatorResults) -> Vec<Signal> {
        (0..candles.len())
            .map(|i| self.signal_at(candles, results, i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{IndicatorPoint, IndicatorResult};
    use crate::domain::indicator::series_from_closes;
    use crate::domain::rule::Operand;
    use std::collections::{BTreeMap, HashMap};

    fn results_with(series: &CandleSeries, id: &str, plot: &str, values: &[Option<f64>]) -> IndicatorResults {
        let points = series
            .iter()
            .zip(values)
            .map(|(c, v)| IndicatorPoint { time: c.time, value: *v })
            .collect();
        let mut plots = BTreeMap::new();
        plots.insert(plot.to_string(), points);
        HashMap::from([(
            id.to_string(),
            IndicatorResult {
                instance_id: id.to_string(),
                plots,
            },
        )])
    }

    fn close_vs_line() -> RuleStrategy {
        RuleStrategy::parse("CROSS_ABOVE(close, line.v)", "CROSS_BELOW(close, line.v)").unwrap()
    }

    #[test]
    fn parse_builds_both_rules() {
        let s = close_vs_line();
        assert!(matches!(s.bullish, Rule::CrossAbove { left: Operand::Close, .. }));
        assert!(matches!(s.bearish, Rule::CrossBelow { .. }));
    }

    #[test]
    fn parse_error_propagates() {
        let err = RuleStrategy::parse("ABOVE(close, 1)", "BELOW(close").unwrap_err();
        assert!(matches!(err, EngineError::RuleParse { .. }));
    }

    #[test]
    fn signals_follow_rules() {
        let series = series_from_closes(&[9.0, 11.0, 12.0, 9.0]);
        let results = results_with(&series, "line", "v", &[Some(10.0); 4]);
        let signals = close_vs_line().signals(&series, &results);
        assert_eq!(
            signals,
            vec![Signal::Hold, Signal::Bullish, Signal::Hold, Signal::Bearish]
        );
    }

    #[test]
    fn both_rules_true_is_hold() {
        let series = series_from_closes(&[10.0]);
        let s = RuleStrategy::parse("ABOVE(close, 5)", "BELOW(close, 20)").unwrap();
        assert_eq!(s.signal_at(&series, &HashMap::new(), 0), Signal::Hold);
    }

    #[test]
    fn warmup_adds_rule_lookback() {
        let series = series_from_closes(&[1.0, 2.0, 3.0, 4.0]);
        let results = results_with(&series, "line", "v", &[None, None, Some(1.0), Some(2.0)]);
        // Crosses compare against the previous bar.
        assert_eq!(close_vs_line().warmup(&results), Some(3));

        let level = RuleStrategy::parse("ABOVE(line.v, 1)", "BELOW(line.v, 1)").unwrap();
        assert_eq!(level.warmup(&results), Some(2));

        let temporal = RuleStrategy::parse(
            "NOT(CONSECUTIVE(ABOVE(line.v, 0), 3))",
            "ANY_OF(CROSS_BELOW(close, line.v), 2)",
        )
        .unwrap();
        assert_eq!(temporal.warmup(&results), Some(4));

        let never = results_with(&series, "line", "v", &[None; 4]);
        assert_eq!(close_vs_line().warmup(&never), None);
    }

    #[test]
    fn price_only_strategy_has_no_warmup() {
        let s = RuleStrategy::parse("ABOVE(close, 5)", "BELOW(close, 5)").unwrap();
        assert_eq!(s.warmup(&HashMap::new()), Some(0));
    }

    #[test]
    fn check_refs_rejects_unknown_plot() {
        let series = series_from_closes(&[1.0]);
        let results = results_with(&series, "line", "v", &[Some(1.0)]);
        assert!(close_vs_line().check_refs(&results).is_ok());

        let s = RuleStrategy::parse("ABOVE(line.w, 1)", "BELOW(other.v, 1)").unwrap();
        let err = s.check_refs(&results).unwrap_err();
        assert!(err.to_string().contains("line.w"));
    }
}
