//! Parameter state of the stand-in simulation.

use std::{
    collections::{HashMap, HashSet},
    f64::consts::PI,
};

use clap::ValueEnum;
use serde::Serialize;
use shared::{
    domain::VariableDef,
    protocol::{encode_snapshot, OutboundUpdate},
};
use tracing::{debug, info};

/// How inbound values for angle variables are interpreted. The panel sends
/// angles in multiples of π while the simulation reports radians.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AngleInput {
    /// Take the number as radians, exactly as sent.
    Radians,
    /// Multiply by π before storing.
    PiUnits,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimParameter {
    pub name: String,
    pub value: f64,
}

#[derive(Debug)]
pub struct SimState {
    parameters: Vec<SimParameter>,
    index: HashMap<String, usize>,
    angles: HashSet<String>,
    angle_input: AngleInput,
}

impl SimState {
    /// Seeds the state from panel definitions. Angle variables are held in
    /// radians from the start.
    pub fn new<'a>(
        defs: &[VariableDef],
        angle_names: impl IntoIterator<Item = &'a str>,
        angle_input: AngleInput,
    ) -> Self {
        let angles: HashSet<String> = angle_names.into_iter().map(str::to_string).collect();
        let mut parameters = Vec::with_capacity(defs.len());
        let mut index = HashMap::with_capacity(defs.len());
        for def in defs {
            if index.contains_key(&def.name) {
                continue;
            }
            let value = if angles.contains(&def.name) {
                def.value * PI
            } else {
                def.value
            };
            index.insert(def.name.clone(), parameters.len());
            parameters.push(SimParameter {
                name: def.name.clone(),
                value,
            });
        }
        Self {
            parameters,
            index,
            angles,
            angle_input,
        }
    }

    pub fn parameters(&self) -> &[SimParameter] {
        &self.parameters
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.index.get(name).map(|&slot| self.parameters[slot].value)
    }

    pub fn snapshot_line(&self) -> String {
        encode_snapshot(self.parameters.iter().map(|p| (p.name.as_str(), p.value)))
    }

    /// Handles one command line and returns the reply line.
    pub fn handle_command(&mut self, line: &str) -> String {
        let Some(update) = OutboundUpdate::parse(line) else {
            debug!(%line, "sim: unrecognized command");
            return format!("Error: unrecognized command '{}'", line.trim());
        };
        let name = update.variable_name();
        let Some(&slot) = self.index.get(&name) else {
            return format!("Error: unknown variable '{name}'");
        };

        let value = match self.angle_input {
            AngleInput::PiUnits if self.angles.contains(&name) => update.value * PI,
            _ => update.value,
        };
        self.parameters[slot].value = value;
        info!(%name, value, "sim: parameter updated");
        self.snapshot_line()
    }
}
