//! Plain-text rendering of the registry.

use client_core::{ConnectionState, PanelEvent, Variable, VariableRegistry};
use shared::{domain::VariableKind, protocol::format_wire_value};

/// Text to print for a panel event, if any. With `quiet` set, value redraws
/// are suppressed but connection changes still print a status line.
pub fn event_text(
    event: &PanelEvent,
    registry: &VariableRegistry,
    connection: ConnectionState,
    quiet: bool,
) -> Option<String> {
    match event {
        PanelEvent::Redraw if quiet => None,
        PanelEvent::Redraw => Some(table(registry, connection)),
        PanelEvent::Connection(state) if quiet => {
            Some(format!("[{}]\n", connection_label(*state)))
        }
        PanelEvent::Connection(state) => Some(table(registry, *state)),
        PanelEvent::UpdateDropped { wire } => Some(format!("not sent: {wire}\n")),
    }
}

pub fn table(registry: &VariableRegistry, connection: ConnectionState) -> String {
    let width = registry
        .all()
        .iter()
        .map(|variable| variable.name().len())
        .max()
        .unwrap_or(0);

    let mut out = format!("[{}]\n", connection_label(connection));
    for variable in registry.all() {
        out.push_str(&row(variable, width));
        out.push('\n');
    }
    out
}

pub fn row(variable: &Variable, width: usize) -> String {
    let range = variable
        .range()
        .map(|range| {
            let bound = |b: Option<f64>| b.map(format_wire_value).unwrap_or_default();
            format!("  [{}..{}]", bound(range.min), bound(range.max))
        })
        .unwrap_or_default();
    format!(
        "{:<width$}  {:>12}{}  step {}{}",
        variable.name(),
        value_text(variable),
        if variable.is_angle() { " π" } else { "  " },
        format_wire_value(variable.step()),
        range,
    )
}

pub fn value_text(variable: &Variable) -> String {
    match variable.kind() {
        VariableKind::Integer => format!("{:.0}", variable.value()),
        VariableKind::Real => format_wire_value(variable.value()),
    }
}

pub fn connection_label(connection: ConnectionState) -> &'static str {
    match connection {
        ConnectionState::Connecting => "connecting",
        ConnectionState::Open => "connected",
        ConnectionState::Closed => "disconnected",
    }
}
