//! JSON report adapter implementing ReportPort.
//!
//! Reports are pretty-printed; an output path of `-` writes to stdout.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::backtest::BacktestReport;
use crate::domain::error::EngineError;
use crate::domain::indicator::{IndicatorInstance, IndicatorPoint, IndicatorRun};
use crate::ports::report_port::ReportPort;

pub const STDOUT_PATH: &str = "-";

#[derive(Serialize)]
struct BacktestDocument<'a> {
    symbol: &'a str,
    /// First and last simulated bar, RFC 3339.
    from: Option<String>,
    to: Option<String>,
    #[serde(flatten)]
    report: &'a BacktestReport,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum RunRecord<'a> {
    Ok {
        instance_id: &'a str,
        indicator_id: Option<&'a str>,
        visible: bool,
        colors: Option<&'a BTreeMap<String, String>>,
        plots: &'a BTreeMap<String, Vec<IndicatorPoint>>,
    },
    Failed {
        instance_id: &'a str,
        error: String,
    },
}

#[derive(Serialize)]
struct IndicatorDocument<'a> {
    symbol: &'a str,
    indicators: Vec<RunRecord<'a>>,
}

/// Unix seconds as RFC 3339, `None` when out of range.
pub fn format_time(time: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(time, 0).map(|dt| dt.to_rfc3339())
}

fn write_document<T: Serialize>(document: &T, output_path: &str) -> Result<(), EngineError> {
    let json = serde_json::to_string_pretty(document)?;
    if output_path == STDOUT_PATH {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", json)?;
        return Ok(());
    }

    let path = Path::new(output_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json)?;
    tracing::info!(path = output_path, "report written");
    Ok(())
}

pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for JsonReportAdapter {
    fn write_backtest(
        &self,
        symbol: &str,
        report: &BacktestReport,
        output_path: &str,
    ) -> Result<(), EngineError> {
        let document = BacktestDocument {
            symbol,
            from: report.equity_curve.first().and_then(|p| format_time(p.time)),
            to: report.equity_curve.last().and_then(|p| format_time(p.time)),
            report,
        };
        write_document(&document, output_path)
    }

    fn write_indicators(
        &self,
        symbol: &str,
        instances: &[IndicatorInstance],
        runs: &[IndicatorRun],
        output_path: &str,
    ) -> Result<(), EngineError> {
        let indicators = runs
            .iter()
            .map(|run| match &run.outcome {
                Ok(result) => {
                    let instance = instances.iter().find(|i| i.id == run.instance_id);
                    RunRecord::Ok {
                        instance_id: &run.instance_id,
                        indicator_id: instance.map(|i| i.indicator_id.as_str()),
                        visible: instance.is_none_or(|i| i.visible),
                        colors: instance.map(|i| &i.colors),
                        plots: &result.plots,
                    }
                }
                Err(e) => RunRecord::Failed {
                    instance_id: &run.instance_id,
                    error: e.to_string(),
                },
            })
            .collect();
        write_document(&IndicatorDocument { symbol, indicators }, output_path)
    }
}
