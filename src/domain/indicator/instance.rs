//! Indicator instances, default plot coloring and the caller-owned workspace.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::candle::CandleSeries;
use crate::domain::error::EngineError;
use crate::domain::indicator::calculator::{IndicatorRun, recalculate};
use crate::domain::indicator::registry::IndicatorRegistry;
use crate::domain::indicator::{IndicatorDefinition, ParamValues, validate_params};

/// Default plot colors, handed out round-robin to plots without an
/// author-specified color.
pub const DEFAULT_PALETTE: [&str; 8] = [
    "#2962FF", "#FF6D00", "#00C853", "#AA00FF", "#D50000", "#00B8D4", "#FFD600", "#6D4C41",
];

/// Position in [`DEFAULT_PALETTE`]. Owned by one session/workspace so that
/// concurrent sessions color their indicators independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaletteCursor(usize);

impl PaletteCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_color(&mut self) -> &'static str {
        let color = DEFAULT_PALETTE[self.0 % DEFAULT_PALETTE.len()];
        self.0 = (self.0 + 1) % DEFAULT_PALETTE.len();
        color
    }

}

/// Normalize a hex color to `#RRGGBB`; the leading `#` is optional.
pub fn normalize_color(raw: &str) -> Option<String> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("#{}", hex.to_uppercase()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorInstance {
    pub id: String,
    pub indicator_id: String,
    pub params: ParamValues,
    /// Plot id -> render color.
    pub colors: BTreeMap<String, String>,
    pub visible: bool,
}

/// Materialize a definition with concrete parameters.
///
/// Parameters are validated against the schema (defaults filled in) and each
/// plot gets its author color or, failing that, the next palette color.
pub fn add_indicator(
    definition: &IndicatorDefinition,
    params: &ParamValues,
    instance_id: &str,
    palette: &mut PaletteCursor,
) -> Result<IndicatorInstance, EngineError> {
    let params = validate_params(definition, params)?;

    let colors = definition
        .plots
        .iter()
        .map(|plot| {
            let color = match &plot.color {
                Some(c) => c.clone(),
                None => palette.next_color().to_string(),
            };
            (plot.id.clone(), color)
        })
        .collect();

    Ok(IndicatorInstance {
        id: instance_id.to_string(),
        indicator_id: definition.id.clone(),
        params,
        colors,
        visible: true,
    })
}

/// The set of indicators attached to one chart or strategy session.
#[derive(Debug, Clone, Default)]
pub struct IndicatorWorkspace {
    palette: PaletteCursor,
    next_seq: u64,
    instances: Vec<IndicatorInstance>,
}

impl IndicatorWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an indicator; the instance id is `"{indicator_id}-{seq}"`, skipping
    /// ids already taken by named instances.
    pub fn add_indicator(
        &mut self,
        registry: &IndicatorRegistry,
        indicator_id: &str,
        params: &ParamValues,
    ) -> Result<&IndicatorInstance, EngineError> {
        let mut seq = self.next_seq + 1;
        let mut id = format!("{}-{}", indicator_id, seq);
        while self.get(&id).is_some() {
            seq += 1;
            id = format!("{}-{}", indicator_id, seq);
        }
        self.attach(registry, indicator_id, &id, params)?;
        self.next_seq = seq;
        Ok(&self.instances[self.instances.len() - 1])
    }

    /// Attach an indicator under a caller-chosen instance id.
    pub fn add_named(
        &mut self,
        registry: &IndicatorRegistry,
        indicator_id: &str,
        instance_id: &str,
        params: &ParamValues,
    ) -> Result<&IndicatorInstance, EngineError> {
        self.attach(registry, indicator_id, instance_id, params)?;
        Ok(&self.instances[self.instances.len() - 1])
    }

    fn attach(
        &mut self,
        registry: &IndicatorRegistry,
        indicator_id: &str,
        instance_id: &str,
        params: &ParamValues,
    ) -> Result<(), EngineError> {
        if self.get(instance_id).is_some() {
            return Err(EngineError::invalid_parameter(
                "instance_id",
                format!("{} is already attached", instance_id),
            ));
        }
        let indicator = registry.lookup(indicator_id)?;
        let instance = add_indicator(indicator.definition(), params, instance_id, &mut self.palette)?;
        tracing::debug!(instance = %instance.id, params = %instance.params, "indicator added");
        self.instances.push(instance);
        Ok(())
    }

    pub fn remove_indicator(&mut self, instance_id: &str) -> Option<IndicatorInstance> {
        let pos = self.instances.iter().position(|i| i.id == instance_id)?;
        Some(self.instances.remove(pos))
    }

    pub fn get(&self, instance_id: &str) -> Option<&IndicatorInstance> {
        self.instances.iter().find(|i| i.id == instance_id)
    }

    pub fn instances(&self) -> &[IndicatorInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn set_visible(&mut self, instance_id: &str, visible: bool) -> bool {
        match self.instances.iter_mut().find(|i| i.id == instance_id) {
            Some(instance) => {
                instance.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Override one plot's color. `color` is a hex `RRGGBB`, stored as `#RRGGBB`.
    pub fn set_plot_color(
        &mut self,
        instance_id: &str,
        plot_id: &str,
        color: &str,
    ) -> Result<(), EngineError> {
        let color = normalize_color(color).ok_or_else(|| {
            EngineError::invalid_parameter("color", format!("expected a RRGGBB hex color, got '{}'", color))
        })?;
        let instance = self
            .instances
            .iter_mut()
            .find(|i| i.id == instance_id)
            .ok_or_else(|| EngineError::invalid_parameter("instance_id", format!("no instance {}", instance_id)))?;
        match instance.colors.get_mut(plot_id) {
            Some(c) => {
                *c = color;
                Ok(())
            }
            None => Err(EngineError::invalid_parameter(
                "plot",
                format!("{} has no plot {}", instance_id, plot_id),
            )),
        }
    }

    pub fn recalculate(&self, registry: &IndicatorRegistry, candles: &CandleSeries) -> Vec<IndicatorRun> {
        recalculate(registry, &self.instances, candles)
    }
}
