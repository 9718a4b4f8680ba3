//! Recalculation of indicator instances over a candle series.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;
use crate::domain::indicator::registry::IndicatorRegistry;
use crate::domain::indicator::{IndicatorDefinition, IndicatorInstance, PlotMap};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub time: i64,
    pub value: Option<f64>,
}

/// Time-stamped output of one instance, one point per candle in every plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorResult {
    pub instance_id: String,
    pub plots: BTreeMap<String, Vec<IndicatorPoint>>,
}

impl IndicatorResult {
    pub fn value(&self, plot: &str, index: usize) -> Option<f64> {
        self.plots.get(plot)?.get(index)?.value
    }

    pub fn plot(&self, plot: &str) -> Option<&[IndicatorPoint]> {
        self.plots.get(plot).map(Vec::as_slice)
    }

    /// Bare values of one plot, for feeding into signal detection.
    pub fn values(&self, plot: &str) -> Option<Vec<Option<f64>>> {
        self.plots
            .get(plot)
            .map(|points| points.iter().map(|p| p.value).collect())
    }
}

#[derive(Debug)]
pub struct IndicatorRun {
    pub instance_id: String,
    pub outcome: Result<IndicatorResult, EngineError>,
}

impl IndicatorRun {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn result(&self) -> Option<&IndicatorResult> {
        self.outcome.as_ref().ok()
    }
}

/// Compute every instance against `candles`.
///
/// Instances run in parallel and independently: a failure (unknown id, bad
/// parameters, compute error, misaligned output or a panic) is recorded in
/// that instance's run and does not affect the others. Output order matches
/// `instances`.
pub fn recalculate(
    registry: &IndicatorRegistry,
    instances: &[IndicatorInstance],
    candles: &CandleSeries,
) -> Vec<IndicatorRun> {
    let runs: Vec<IndicatorRun> = instances
        .par_iter()
        .map(|instance| IndicatorRun {
            instance_id: instance.id.clone(),
            outcome: compute_instance(registry, instance, candles),
        })
        .collect();

    for run in &runs {
        if let Err(e) = &run.outcome {
            tracing::warn!(instance = %run.instance_id, error = %e, "indicator failed");
        }
    }
    tracing::debug!(
        instances = runs.len(),
        failed = runs.iter().filter(|r| !r.is_ok()).count(),
        bars = candles.len(),
        "recalculated indicators"
    );
    runs
}

fn compute_instance(
    registry: &IndicatorRegistry,
    instance: &IndicatorInstance,
    candles: &CandleSeries,
) -> Result<IndicatorResult, EngineError> {
    let compute_failed = |reason: String| EngineError::IndicatorCompute {
        instance_id: instance.id.clone(),
        reason,
    };

    let indicator = registry
        .lookup(&instance.indicator_id)
        .map_err(|e| compute_failed(e.to_string()))?;
    let definition = indicator.definition();

    let plots = catch_unwind(AssertUnwindSafe(|| indicator.compute(candles, &instance.params)))
        .map_err(|payload| compute_failed(panic_message(payload.as_ref())))?
        .map_err(|e| compute_failed(e.to_string()))?;

    check_alignment(definition, &plots, candles.len()).map_err(compute_failed)?;

    let plots = plots
        .into_iter()
        .map(|(id, values)| {
            let points = candles
                .iter()
                .zip(values)
                .map(|(candle, value)| IndicatorPoint {
                    time: candle.time,
                    value: value.filter(|v| v.is_finite()),
                })
                .collect();
            (id, points)
        })
        .collect();

    Ok(IndicatorResult {
        instance_id: instance.id.clone(),
        plots,
    })
}

fn check_alignment(
    definition: &IndicatorDefinition,
    plots: &PlotMap,
    bars: usize,
) -> Result<(), String> {
    for plot in &definition.plots {
        match plots.get(&plot.id) {
            None => return Err(format!("missing plot '{}'", plot.id)),
            Some(values) if values.len() != bars => {
                return Err(format!(
                    "plot '{}' has {} values for {} candles",
                    plot.id,
                    values.len(),
                    bars
                ));
            }
            Some(_) => {}
        }
    }
    if let Some(extra) = plots.keys().find(|id| !definition.has_plot(id)) {
        return Err(format!("undeclared plot '{}'", extra));
    }
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
