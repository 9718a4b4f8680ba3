//! Rule evaluation against candles and precomputed indicator results.
//!
//! # Evaluation semantics
//!
//! - Comparisons evaluate at the given bar index.
//! - `CROSS_ABOVE`/`CROSS_BELOW` need bar `index - 1`; false at index 0.
//! - An operand that is undefined (warm-up, unknown instance or plot, index
//!   out of range) makes its comparison undefined, and an undefined rule never
//!   fires. `NOT` of an undefined rule stays undefined.
//! - `AND` is false if any child is false, undefined if any child is
//!   undefined, true otherwise. `OR` mirrors it.
//! - `CONSECUTIVE(rule, N)`: child true on N consecutive bars ending here.
//! - `ANY_OF(rule, N)`: child true at least once in the last N bars.
//! - Both combine their window like `AND`/`OR`. A window reaching before
//!   bar 0 counts as undefined.

use std::collections::HashMap;

use crate::domain::candle::CandleSeries;
use crate::domain::indicator::IndicatorResult;
use crate::domain::rule::{Operand, Rule};

/// Indicator results keyed by instance id.
pub type IndicatorResults = HashMap<String, IndicatorResult>;

/// Whether `rule` fires at `bar_index`.
pub fn evaluate(
    rule: &Rule,
    candles: &CandleSeries,
    indicators: &IndicatorResults,
    bar_index: usize,
) -> bool {
    eval(rule, candles, indicators, bar_index) == Some(true)
}

fn eval(
    rule: &Rule,
    candles: &CandleSeries,
    indicators: &IndicatorResults,
    bar_index: usize,
) -> Option<bool> {
    let value = |operand: &Operand, i: usize| resolve_operand(operand, candles, indicators, i);

    match rule {
        Rule::CrossAbove { left, right } | Rule::CrossBelow { left, right } => {
            let prev = bar_index.checked_sub(1)?;
            let left_prev = value(left, prev)?;
            let right_prev = value(right, prev)?;
            let left_cur = value(left, bar_index)?;
            let right_cur = value(right, bar_index)?;
            Some(match rule {
                Rule::CrossAbove { .. } => left_prev <= right_prev && left_cur > right_cur,
                _ => left_prev >= right_prev && left_cur < right_cur,
            })
        }
        Rule::Above { left, right } => Some(value(left, bar_index)? > value(right, bar_index)?),
        Rule::Below { left, right } => Some(value(left, bar_index)? < value(right, bar_index)?),
        Rule::Between {
            operand,
            lower,
            upper,
        } => {
            let v = value(operand, bar_index)?;
            Some(v >= *lower && v <= *upper)
        }
        Rule::And(rules) => {
            let mut undefined = false;
            for r in rules {
                match eval(r, candles, indicators, bar_index) {
                    Some(false) => return Some(false),
                    None => undefined = true,
                    Some(true) => {}
                }
            }
            if undefined { None } else { Some(true) }
        }
        Rule::Or(rules) => {
            let mut undefined = false;
            for r in rules {
                match eval(r, candles, indicators, bar_index) {
                    Some(true) => return Some(true),
                    None => undefined = true,
                    Some(false) => {}
                }
            }
            if undefined { None } else { Some(false) }
        }
        Rule::Not(rule) => eval(rule, candles, indicators, bar_index).map(|b| !b),
        Rule::Consecutive { rule, count } => {
            let mut undefined = *count == 0 || bar_index + 1 < *count;
            for i in bar_index.saturating_sub(count.saturating_sub(1))..=bar_index {
                match eval(rule, candles, indicators, i) {
                    Some(false) => return Some(false),
                    None => undefined = true,
                    Some(true) => {}
                }
            }
            if undefined { None } else { Some(true) }
        }
        Rule::AnyOf { rule, count } => {
            let mut undefined = *count == 0 || bar_index + 1 < *count;
            for i in bar_index.saturating_sub(count.saturating_sub(1))..=bar_index {
                match eval(rule, candles, indicators, i) {
                    Some(true) => return Some(true),
                    None => undefined = true,
                    Some(false) => {}
                }
            }
            if undefined { None } else { Some(false) }
        }
    }
}

fn resolve_operand(
    operand: &Operand,
    candles: &CandleSeries,
    indicators: &IndicatorResults,
    bar_index: usize,
) -> Option<f64> {
    match operand {
        Operand::Constant(v) => Some(*v),
        Operand::Plot { instance_id, plot } => indicators.get(instance_id)?.value(plot, bar_index),
        price => {
            let bar = candles.get(bar_index)?;
            Some(match price {
                Operand::Open => bar.open,
                Operand::High => bar.high,
                Operand::Low => bar.low,
                Operand::Volume => bar.volume,
                _ => bar.close,
            })
        }
    }
}
