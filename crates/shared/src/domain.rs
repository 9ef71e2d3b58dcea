use serde::{Deserialize, Serialize};

/// Names whose remote values are reported in radians.
pub const DEFAULT_ANGLE_VARIABLES: [&str; 4] = [
    "turn_rate",
    "turn_rate_mod",
    "sample_angle",
    "sample_angle_mod",
];

pub const DEFAULT_INTEGER_STEP: f64 = 1.0;
pub const DEFAULT_REAL_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Integer,
    Real,
}

impl VariableKind {
    pub fn default_step(self) -> f64 {
        match self {
            Self::Integer => DEFAULT_INTEGER_STEP,
            Self::Real => DEFAULT_REAL_STEP,
        }
    }
}

/// Inclusive bounds; an absent bound leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl ValueRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Static definition of one tunable variable, as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    pub kind: VariableKind,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl VariableDef {
    pub fn integer(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Integer,
            value,
            step: None,
            min: None,
            max: None,
        }
    }

    pub fn real(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            kind: VariableKind::Real,
            value,
            step: None,
            min: None,
            max: None,
        }
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn effective_step(&self) -> f64 {
        self.step.unwrap_or_else(|| self.kind.default_step())
    }

    pub fn range(&self) -> Option<ValueRange> {
        let range = ValueRange::new(self.min, self.max);
        (!range.is_unbounded()).then_some(range)
    }
}

/// Built-in parameter set of the agent simulation.
pub fn default_variable_defs() -> Vec<VariableDef> {
    vec![
        VariableDef::integer("agent_count", 2000.0).with_range(Some(1.0), Some(100_000.0)),
        VariableDef::real("move_speed", 1.0)
            .with_step(0.05)
            .with_range(Some(0.0), Some(10.0)),
        VariableDef::real("turn_rate", 0.25)
            .with_step(0.01)
            .with_range(Some(0.0), Some(1.0)),
        VariableDef::real("turn_rate_mod", 0.0)
            .with_step(0.01)
            .with_range(Some(-1.0), Some(1.0)),
        VariableDef::real("sample_angle", 0.125)
            .with_step(0.005)
            .with_range(Some(0.0), Some(1.0)),
        VariableDef::real("sample_angle_mod", 0.0)
            .with_step(0.005)
            .with_range(Some(-1.0), Some(1.0)),
        VariableDef::integer("sample_distance", 9.0).with_range(Some(1.0), Some(64.0)),
        VariableDef::real("deposit_amount", 5.0).with_range(Some(0.0), None),
        VariableDef::real("decay_rate", 0.1)
            .with_step(0.01)
            .with_range(Some(0.0), Some(1.0)),
    ]
}
