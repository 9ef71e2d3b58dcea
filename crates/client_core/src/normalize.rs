//! Value normalization shared by local edits and inbound snapshots.

use std::f64::consts::PI;

use shared::domain::{ValueRange, VariableKind};

/// Decimal places kept after converting an inbound angle from radians.
pub const ANGLE_DECIMALS: u32 = 4;

/// Upper bound on rounding precision; beyond this `10^n` stops being exact.
const MAX_DECIMALS: u32 = 15;

/// Smallest step magnitude that still survives rounding to `MAX_DECIMALS` places.
pub const MIN_STEP: f64 = 1e-15;

/// Brings a raw value into the representation stored for `kind`.
///
/// Integers round half away from zero. Reals pass through unless `decimals`
/// is given, in which case they are rounded to that many places.
pub fn to_stored(kind: VariableKind, raw: f64, decimals: Option<u32>) -> f64 {
    match kind {
        VariableKind::Integer => raw.round(),
        VariableKind::Real => match decimals {
            Some(decimals) => round_to(raw, decimals),
            None => raw,
        },
    }
}

pub fn clamp(value: f64, range: Option<&ValueRange>) -> f64 {
    let Some(range) = range else {
        return value;
    };
    let mut value = value;
    if let Some(min) = range.min {
        value = value.max(min);
    }
    if let Some(max) = range.max {
        value = value.min(max);
    }
    value
}

/// Rounds to `decimals` places. Values too large to scale have no fractional
/// digits left and come back unchanged.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(MAX_DECIMALS) as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Digits after the decimal point in the shortest text form of `step`.
pub fn decimals_of(step: f64) -> u32 {
    let text = step.to_string();
    match text.split_once('.') {
        Some((_, fraction)) => (fraction.len() as u32).min(MAX_DECIMALS),
        None => 0,
    }
}

/// Converts a remotely reported angle from radians into multiples of π.
pub fn angle_from_radians(raw: f64) -> f64 {
    round_to(raw / PI, ANGLE_DECIMALS)
}

/// Reads operator-typed text. Anything that is not a finite number reads as zero.
pub fn parse_local_input(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Adds `step` once and trims the float noise the addition introduces.
pub fn stepped(kind: VariableKind, value: f64, step: f64) -> f64 {
    to_stored(kind, value + step, Some(decimals_of(step)))
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
