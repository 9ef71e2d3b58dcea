//! Two-way reconciliation between the local registry and the simulation.
//!
//! Inbound snapshots and local edits both end in [`VariableRegistry::set`];
//! local edits additionally produce the [`OutboundUpdate`] to put on the wire.

use shared::protocol::{OutboundUpdate, Snapshot};
use tracing::debug;

use crate::{
    error::RegistryError,
    normalize,
    registry::{ValueChange, Variable, VariableRegistry},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotReport {
    /// One entry per registry variable the snapshot mentioned, in registry order.
    pub changes: Vec<ValueChange>,
    /// Snapshot keys with no registry counterpart, sorted.
    pub ignored: Vec<String>,
}

impl SnapshotReport {
    pub fn any_changed(&self) -> bool {
        self.changes.iter().any(ValueChange::changed)
    }
}

/// Writes every value the snapshot reports for a known variable. Variables the
/// snapshot does not mention keep their current value.
pub fn apply_snapshot(registry: &mut VariableRegistry, snapshot: &Snapshot) -> SnapshotReport {
    let pending: Vec<(String, f64)> = registry
        .all()
        .iter()
        .filter_map(|variable| {
            snapshot
                .get(variable.name())
                .map(|raw| (variable.name().to_string(), inbound_value(variable, raw)))
        })
        .collect();

    let mut report = SnapshotReport::default();
    for (name, value) in pending {
        match registry.set(&name, value) {
            Ok(change) => report.changes.push(change),
            Err(err) => debug!(%err, "reconciler: snapshot value not stored"),
        }
    }

    report.ignored = snapshot
        .iter()
        .filter(|(name, _)| registry.get(name).is_none())
        .map(|(name, _)| name.to_string())
        .collect();
    report.ignored.sort_unstable();
    report
}

/// Converts a remotely reported value into local units. Only angles differ:
/// the simulation reports radians, the registry holds multiples of π.
pub fn inbound_value(variable: &Variable, raw: f64) -> f64 {
    if variable.is_angle() {
        normalize::angle_from_radians(raw)
    } else {
        raw
    }
}

/// A committed local edit and the update that announces it.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalEdit {
    pub change: ValueChange,
    pub update: OutboundUpdate,
}

/// Stores an operator-entered value and encodes the stored result.
///
/// Angles are sent as stored, in multiples of π, without converting back to
/// radians.
pub fn commit_value(
    registry: &mut VariableRegistry,
    name: &str,
    raw: f64,
) -> Result<LocalEdit, RegistryError> {
    let change = registry.set(name, raw)?;
    Ok(local_edit(change))
}

/// Like [`commit_value`] for text typed into an edit field; unparseable text
/// commits zero.
pub fn commit_text(
    registry: &mut VariableRegistry,
    name: &str,
    text: &str,
) -> Result<LocalEdit, RegistryError> {
    commit_value(registry, name, normalize::parse_local_input(text))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Increment,
    Decrement,
}

/// Moves a variable by one step. A negative step inverts the direction.
pub fn step(
    registry: &mut VariableRegistry,
    name: &str,
    direction: StepDirection,
) -> Result<LocalEdit, RegistryError> {
    let variable = registry
        .get(name)
        .ok_or_else(|| RegistryError::UnknownVariable(name.to_string()))?;
    let delta = match direction {
        StepDirection::Increment => variable.step(),
        StepDirection::Decrement => -variable.step(),
    };
    let target = normalize::stepped(variable.kind(), variable.value(), delta);
    let change = registry.set(name, target)?;
    Ok(local_edit(change))
}

fn local_edit(change: ValueChange) -> LocalEdit {
    let update = OutboundUpdate::for_variable(&change.name, change.current);
    LocalEdit { change, update }
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
