//! Port traits the domain talks to: candle data, configuration, reports.

pub mod config_port;
pub mod data_port;
pub mod report_port;
