//! Rule AST for raw rule strategies.
//!
//! - `Operand`: what can be compared (price fields, constants, indicator plots)
//! - `Rule`: comparison, composite and temporal rules

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Open,
    High,
    Low,
    Close,
    Volume,
    Constant(f64),
    /// One plot of an attached indicator instance, e.g. `fast.sma`.
    Plot { instance_id: String, plot: String },
}

impl Operand {
    pub fn plot(instance_id: &str, plot: &str) -> Self {
        Operand::Plot {
            instance_id: instance_id.to_string(),
            plot: plot.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    CrossAbove {
        left: Operand,
        right: Operand,
    },
    CrossBelow {
        left: Operand,
        right: Operand,
    },
    Above {
        left: Operand,
        right: Operand,
    },
    Below {
        left: Operand,
        right: Operand,
    },
    Between {
        operand: Operand,
        lower: f64,
        upper: f64,
    },
    And(Vec<Rule>),
    Or(Vec<Rule>),
    Not(Box<Rule>),
    /// Child true on each of the last `count` bars.
    Consecutive {
        rule: Box<Rule>,
        count: usize,
    },
    /// Child true on at least one of the last `count` bars.
    AnyOf {
        rule: Box<Rule>,
        count: usize,
    },
}

impl Rule {
    /// `(instance_id, plot)` pairs referenced anywhere in the rule.
    pub fn plot_refs(&self) -> BTreeSet<(String, String)> {
        let mut refs = BTreeSet::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs(&self, refs: &mut BTreeSet<(String, String)>) {
        fn add(refs: &mut BTreeSet<(String, String)>, operand: &Operand) {
            if let Operand::Plot { instance_id, plot } = operand {
                refs.insert((instance_id.clone(), plot.clone()));
            }
        }
        match self {
            Rule::CrossAbove { left, right }
            | Rule::CrossBelow { left, right }
            | Rule::Above { left, right }
            | Rule::Below { left, right } => {
                add(refs, left);
                add(refs, right);
            }
            Rule::Between { operand, .. } => add(refs, operand),
            Rule::And(rules) | Rule::Or(rules) => {
                for r in rules {
                    r.collect_refs(refs);
                }
            }
            Rule::Not(rule) | Rule::Consecutive { rule, .. } | Rule::AnyOf { rule, .. } => {
                rule.collect_refs(refs)
            }
        }
    }

    /// Bars of history the rule looks back over, beyond the current bar.
    pub fn lookback(&self) -> usize {
        match self {
            Rule::CrossAbove { .. } | Rule::CrossBelow { .. } => 1,
            Rule::Above { .. } | Rule::Below { .. } | Rule::Between { .. } => 0,
            Rule::And(rules) | Rule::Or(rules) => {
                rules.iter().map(Rule::lookback).max().unwrap_or(0)
            }
            Rule::Not(rule) => rule.lookback(),
            Rule::Consecutive { rule, count } | Rule::AnyOf { rule, count } => {
                rule.lookback() + count.saturating_sub(1)
            }
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Open => write!(f, "open"),
            Operand::High => write!(f, "high"),
            Operand::Low => write!(f, "low"),
            Operand::Close => write!(f, "close"),
            Operand::Volume => write!(f, "volume"),
            Operand::Constant(v) => write!(f, "{}", v),
            Operand::Plot { instance_id, plot } => write!(f, "{}.{}", instance_id, plot),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, keyword: &str, rules: &[Rule]) -> fmt::Result {
    write!(f, "{}(", keyword)?;
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", rule)?;
    }
    write!(f, ")")
}

/// Renders the rule back as DSL text that parses to the same rule.
impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::CrossAbove { left, right } => write!(f, "CROSS_ABOVE({}, {})", left, right),
            Rule::CrossBelow { left, right } => write!(f, "CROSS_BELOW({}, {})", left, right),
            Rule::Above { left, right } => write!(f, "ABOVE({}, {})", left, right),
            Rule::Below { left, right } => write!(f, "BELOW({}, {})", left, right),
            Rule::Between {
                operand,
                lower,
                upper,
            } => write!(f, "BETWEEN({}, {}, {})", operand, lower, upper),
            Rule::And(rules) => write_list(f, "AND", rules),
            Rule::Or(rules) => write_list(f, "OR", rules),
            Rule::Not(rule) => write!(f, "NOT({})", rule),
            Rule::Consecutive { rule, count } => write!(f, "CONSECUTIVE({}, {})", rule, count),
            Rule::AnyOf { rule, count } => write!(f, "ANY_OF({}, {})", rule, count),
        }
    }
}
