//! Line protocol spoken between the control panel and the simulation process.
//!
//! Inbound, the simulation reports its state as
//! `Success: .{key1=val1, key2=val2, ...}`. Outbound, the panel sends one
//! update per line: `<name> <value>` or `<name> <value> mod`.

use std::{collections::HashMap, fmt};

use crate::error::DecodeError;

pub const SNAPSHOT_ENVELOPE: &str = "Success:";
/// Registry suffix that collapses onto the base name plus [`MOD_TOKEN`] on the wire.
pub const MOD_SUFFIX: &str = "_mod";
pub const MOD_TOKEN: &str = "mod";

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Snapshot(Snapshot),
    Malformed { line: String, error: DecodeError },
    Unrecognized(String),
}

/// Classifies one inbound line. Only lines carrying the snapshot envelope are
/// decoded; everything else is reported back verbatim.
pub fn classify_inbound(line: &str) -> InboundMessage {
    let line = line.trim();
    let Some(payload) = line.strip_prefix(SNAPSHOT_ENVELOPE) else {
        return InboundMessage::Unrecognized(line.to_string());
    };
    match decode_snapshot(payload) {
        Ok(snapshot) => InboundMessage::Snapshot(snapshot),
        Err(error) => InboundMessage::Malformed {
            line: line.to_string(),
            error,
        },
    }
}

/// Values reported by one inbound message, keyed by variable name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    values: HashMap<String, f64>,
    skipped: usize,
}

impl Snapshot {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of fragments that did not parse as `key=number`.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            skipped: 0,
        }
    }
}

/// Outcome of matching one comma-separated fragment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldParse<'a> {
    Matched { key: &'a str, value: f64 },
    Skipped { fragment: &'a str },
}

/// Decodes a snapshot payload (envelope already removed).
///
/// The optional `.{ ... }` wrapper is removed, the body is split on commas and
/// each fragment is matched independently. A fragment that is not
/// `key=number` is skipped; only a structurally broken payload is an error.
/// When a key repeats, the last occurrence wins.
pub fn decode_snapshot(payload: &str) -> Result<Snapshot, DecodeError> {
    let block = unwrap_block(payload)?;
    let mut snapshot = Snapshot::default();
    for field in parse_fields(block) {
        match field {
            FieldParse::Matched { key, value } => {
                snapshot.values.insert(key.to_string(), value);
            }
            FieldParse::Skipped { .. } => snapshot.skipped += 1,
        }
    }
    Ok(snapshot)
}

fn unwrap_block(payload: &str) -> Result<&str, DecodeError> {
    let body = payload.trim();
    if let Some(offset) = body.find(|c: char| c.is_control() && c != '\t') {
        return Err(DecodeError::ControlCharacter { offset });
    }
    let body = body.strip_prefix('.').unwrap_or(body).trim_start();

    let inner = match (body.strip_prefix('{'), body.ends_with('}')) {
        (Some(rest), true) => &rest[..rest.len() - 1],
        (Some(_), false) => return Err(DecodeError::UnclosedBrace),
        (None, true) => return Err(DecodeError::UnopenedBrace),
        (None, false) => body,
    };
    if let Some(offset) = inner.find(['{', '}']) {
        return Err(DecodeError::NestedBlock { offset });
    }
    Ok(inner)
}

/// Splits a block body into fields. Blank fragments (e.g. a trailing comma)
/// are dropped rather than reported as skipped.
pub fn parse_fields(block: &str) -> impl Iterator<Item = FieldParse<'_>> {
    block
        .split(',')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(parse_field)
}

pub fn parse_field(fragment: &str) -> FieldParse<'_> {
    let skipped = FieldParse::Skipped { fragment };
    let Some((key, value)) = fragment.split_once('=') else {
        return skipped;
    };
    let key = key.trim();
    let key = key.strip_prefix('.').unwrap_or(key);
    if key.is_empty() || !key.chars().all(is_word_char) {
        return skipped;
    }
    match parse_number(value.trim()) {
        Some(value) => FieldParse::Matched { key, value },
        None => skipped,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Accepts `[+-]?(digits[.digits*] | .digits)([eE][+-]?digits)?`.
fn parse_number(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut pos = 0;
    let skip_digits = |pos: &mut usize| {
        let start = *pos;
        while *pos < bytes.len() && bytes[*pos].is_ascii_digit() {
            *pos += 1;
        }
        *pos - start
    };

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        pos += 1;
    }
    let mut mantissa_digits = skip_digits(&mut pos);
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        mantissa_digits += skip_digits(&mut pos);
    }
    if mantissa_digits == 0 {
        return None;
    }
    if matches!(bytes.get(pos), Some(b'e' | b'E')) {
        pos += 1;
        if matches!(bytes.get(pos), Some(b'+' | b'-')) {
            pos += 1;
        }
        if skip_digits(&mut pos) == 0 {
            return None;
        }
    }
    if pos != bytes.len() {
        return None;
    }
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// One outbound parameter update.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundUpdate {
    /// Wire name, with any `_mod` suffix already removed.
    pub name: String,
    pub value: f64,
    pub modifier: bool,
}

impl OutboundUpdate {
    pub fn for_variable(variable_name: &str, value: f64) -> Self {
        match variable_name.strip_suffix(MOD_SUFFIX) {
            Some(base) => Self {
                name: base.to_string(),
                value,
                modifier: true,
            },
            None => Self {
                name: variable_name.to_string(),
                value,
                modifier: false,
            },
        }
    }

    /// Registry name this update refers to.
    pub fn variable_name(&self) -> String {
        if self.modifier {
            format!("{}{MOD_SUFFIX}", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parses `<name> <value>` or `<name> <value> mod`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let name = parts.next()?;
        let value = parse_number(parts.next()?)?;
        let modifier = match parts.next() {
            None => false,
            Some(MOD_TOKEN) => true,
            Some(_) => return None,
        };
        if parts.next().is_some() || !name.chars().all(is_word_char) {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            value,
            modifier,
        })
    }
}

impl fmt::Display for OutboundUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, format_wire_value(self.value))?;
        if self.modifier {
            write!(f, " {MOD_TOKEN}")?;
        }
        Ok(())
    }
}

/// Shortest decimal form; integral values carry no fractional part.
pub fn format_wire_value(value: f64) -> String {
    if value == 0.0 {
        // folds -0 into 0
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// Renders a full snapshot line, envelope included.
pub fn encode_snapshot<'a>(values: impl IntoIterator<Item = (&'a str, f64)>) -> String {
    let body = values
        .into_iter()
        .map(|(name, value)| format!("{name}={}", format_wire_value(value)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{SNAPSHOT_ENVELOPE} .{{{body}}}")
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
