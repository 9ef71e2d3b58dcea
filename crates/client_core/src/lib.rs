use shared::protocol::{classify_inbound, InboundMessage};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub mod config;
pub mod error;
pub mod normalize;
pub mod reconciler;
pub mod registry;
pub mod transport;

pub use error::{RegistryError, TransportError};
pub use reconciler::{LocalEdit, SnapshotReport, StepDirection};
pub use registry::{ValueChange, Variable, VariableRegistry};
pub use transport::{Transport, TransportEvent, WsTransport};

const PANEL_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// Registry contents changed and should be drawn again. Receiving it more
    /// than once for the same state is harmless.
    Redraw,
    Connection(ConnectionState),
    /// A local edit was stored but could not be sent.
    UpdateDropped { wire: String },
}

/// One control-panel session: the registry plus the connection that keeps it
/// in sync with the simulation.
///
/// The panel is owned by a single task and every mutation goes through
/// `&mut self`, so events are applied strictly in arrival order.
pub struct ControlPanel<T: Transport> {
    registry: VariableRegistry,
    transport: T,
    connection: ConnectionState,
    events: broadcast::Sender<PanelEvent>,
}

impl<T: Transport> ControlPanel<T> {
    pub fn new(registry: VariableRegistry, transport: T) -> Self {
        let (events, _) = broadcast::channel(PANEL_EVENT_CAPACITY);
        let connection = if transport.is_open() {
            ConnectionState::Open
        } else {
            ConnectionState::Connecting
        };
        Self {
            registry,
            transport,
            connection,
            events,
        }
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PanelEvent> {
        self.events.subscribe()
    }

    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => {
                info!("panel: connection open");
                self.set_connection(ConnectionState::Open);
            }
            TransportEvent::Message(line) => {
                self.handle_line(&line);
            }
            TransportEvent::Closed => {
                info!("panel: connection closed");
                self.set_connection(ConnectionState::Closed);
            }
            TransportEvent::Error(err) => {
                warn!(%err, "panel: transport error");
            }
        }
    }

    /// Applies one inbound line. Returns the report when the line was a
    /// well-formed snapshot; anything else leaves the registry untouched.
    pub fn handle_line(&mut self, line: &str) -> Option<SnapshotReport> {
        match classify_inbound(line) {
            InboundMessage::Snapshot(snapshot) => {
                if snapshot.skipped() > 0 {
                    debug!(
                        skipped = snapshot.skipped(),
                        "panel: snapshot had unparseable fields"
                    );
                }
                let report = reconciler::apply_snapshot(&mut self.registry, &snapshot);
                if !report.ignored.is_empty() {
                    debug!(ignored = ?report.ignored, "panel: snapshot keys not in registry");
                }
                if report.any_changed() {
                    self.request_redraw();
                }
                Some(report)
            }
            InboundMessage::Malformed { line, error } => {
                warn!(%error, %line, "panel: discarding malformed snapshot");
                None
            }
            InboundMessage::Unrecognized(line) => {
                warn!(%line, "panel: unrecognized server message");
                None
            }
        }
    }

    pub fn commit_text(&mut self, name: &str, text: &str) -> Result<LocalEdit, RegistryError> {
        let edit = reconciler::commit_text(&mut self.registry, name, text)?;
        Ok(self.publish(edit))
    }

    pub fn commit_value(&mut self, name: &str, value: f64) -> Result<LocalEdit, RegistryError> {
        let edit = reconciler::commit_value(&mut self.registry, name, value)?;
        Ok(self.publish(edit))
    }

    pub fn increment(&mut self, name: &str) -> Result<LocalEdit, RegistryError> {
        self.step(name, StepDirection::Increment)
    }

    pub fn decrement(&mut self, name: &str) -> Result<LocalEdit, RegistryError> {
        self.step(name, StepDirection::Decrement)
    }

    fn step(&mut self, name: &str, direction: StepDirection) -> Result<LocalEdit, RegistryError> {
        let edit = reconciler::step(&mut self.registry, name, direction)?;
        Ok(self.publish(edit))
    }

    /// Redraws, then sends. A closed transport drops the update; the stored
    /// value stays.
    fn publish(&mut self, edit: LocalEdit) -> LocalEdit {
        self.request_redraw();
        let wire = edit.update.encode();
        if !self.transport.is_open() {
            self.drop_update(wire, &TransportError::NotOpen);
            return edit;
        }
        match self.transport.send(&wire) {
            Ok(()) => debug!(%wire, "panel: update sent"),
            Err(err) => self.drop_update(wire, &err),
        }
        edit
    }

    fn drop_update(&self, wire: String, err: &TransportError) {
        warn!(%wire, %err, "panel: dropping update");
        let _ = self.events.send(PanelEvent::UpdateDropped { wire });
    }

    fn set_connection(&mut self, state: ConnectionState) {
        self.connection = state;
        let _ = self.events.send(PanelEvent::Connection(state));
    }

    fn request_redraw(&self) {
        let _ = self.events.send(PanelEvent::Redraw);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
