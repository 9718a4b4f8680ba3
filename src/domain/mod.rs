//! Core domain types and logic.

pub mod backtest;
pub mod candle;
pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod position;
pub mod rule;
pub mod rule_eval;
pub mod rule_parser;
pub mod signal;
pub mod simulation;
pub mod strategy;
