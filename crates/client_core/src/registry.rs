//! Ordered store of tunable variables.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use shared::domain::{ValueRange, VariableDef, VariableKind};

use crate::{error::RegistryError, normalize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    name: String,
    kind: VariableKind,
    value: f64,
    step: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<ValueRange>,
    is_angle: bool,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn range(&self) -> Option<&ValueRange> {
        self.range.as_ref()
    }

    /// True when the remote process reports this variable in radians.
    pub fn is_angle(&self) -> bool {
        self.is_angle
    }
}

/// Result of a write through [`VariableRegistry::set`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValueChange {
    pub name: String,
    pub previous: f64,
    pub current: f64,
}

impl ValueChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableRegistry {
    variables: Vec<Variable>,
    index: HashMap<String, usize>,
}

impl VariableRegistry {
    /// Builds the registry from static definitions, in definition order.
    /// Initial values go through the same normalization as any later write.
    pub fn from_defs<'a>(
        defs: &[VariableDef],
        angle_names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, RegistryError> {
        let angle_names: HashSet<&str> = angle_names.into_iter().collect();
        let mut variables = Vec::with_capacity(defs.len());
        let mut index = HashMap::with_capacity(defs.len());

        for def in defs {
            validate_def(def)?;
            if index.insert(def.name.clone(), variables.len()).is_some() {
                return Err(RegistryError::DuplicateVariable(def.name.clone()));
            }
            let range = def.range();
            let value = normalize::clamp(
                normalize::to_stored(def.kind, def.value, None),
                range.as_ref(),
            );
            variables.push(Variable {
                name: def.name.clone(),
                kind: def.kind,
                value,
                step: def.effective_step(),
                range,
                is_angle: angle_names.contains(def.name.as_str()),
            });
        }

        Ok(Self { variables, index })
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|&slot| &self.variables[slot])
    }

    /// Every variable, in definition order.
    pub fn all(&self) -> &[Variable] {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Normalizes `raw` for the variable's kind, clamps it into range and stores it.
    pub fn set(&mut self, name: &str, raw: f64) -> Result<ValueChange, RegistryError> {
        let slot = *self
            .index
            .get(name)
            .ok_or_else(|| RegistryError::UnknownVariable(name.to_string()))?;
        let raw = if raw.is_finite() { raw } else { 0.0 };
        let variable = &mut self.variables[slot];
        let previous = variable.value;
        variable.value = normalize::clamp(
            normalize::to_stored(variable.kind, raw, None),
            variable.range.as_ref(),
        );
        Ok(ValueChange {
            name: variable.name.clone(),
            previous,
            current: variable.value,
        })
    }
}

fn validate_def(def: &VariableDef) -> Result<(), RegistryError> {
    let non_finite = |field: &'static str, value: f64| RegistryError::NonFinite {
        name: def.name.clone(),
        field,
        value,
    };
    if !def.value.is_finite() {
        return Err(non_finite("value", def.value));
    }

    let step = def.effective_step();
    if !step.is_finite() || step.abs() < normalize::MIN_STEP {
        return Err(RegistryError::InvalidStep {
            name: def.name.clone(),
            step,
        });
    }

    for (field, bound) in [("min", def.min), ("max", def.max)] {
        let Some(bound) = bound else { continue };
        if !bound.is_finite() {
            return Err(non_finite(field, bound));
        }
        if def.kind == VariableKind::Integer && bound.fract() != 0.0 {
            return Err(RegistryError::FractionalBound {
                name: def.name.clone(),
                bound,
            });
        }
    }

    if let (Some(min), Some(max)) = (def.min, def.max) {
        if min > max {
            return Err(RegistryError::InvertedRange {
                name: def.name.clone(),
                min,
                max,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
