use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use shared::domain::VariableDef;
use tokio::sync::broadcast::error::TryRecvError;

use super::*;

#[derive(Default)]
struct RecordingTransport {
    open: AtomicBool,
    sent: Mutex<Vec<String>>,
}

impl RecordingTransport {
    fn open() -> Arc<Self> {
        let transport = Self::default();
        transport.open.store(true, Ordering::SeqCst);
        Arc::new(transport)
    }

    fn closed() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("sent lock").clone()
    }
}

impl Transport for RecordingTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send(&self, text: &str) -> Result<(), TransportError> {
        self.sent.lock().expect("sent lock").push(text.to_string());
        Ok(())
    }
}

fn registry() -> VariableRegistry {
    let defs = vec![
        VariableDef::integer("agent_count", 100.0).with_range(Some(1.0), Some(1000.0)),
        VariableDef::real("move_speed", 1.0).with_step(0.05),
        VariableDef::real("turn_rate", 0.25).with_step(0.01),
        VariableDef::real("turn_rate_mod", 0.0)
            .with_step(0.01)
            .with_range(Some(-1.0), Some(1.0)),
    ];
    VariableRegistry::from_defs(&defs, ["turn_rate", "turn_rate_mod"]).expect("registry")
}

fn value<T: Transport>(panel: &ControlPanel<T>, name: &str) -> f64 {
    panel.registry().get(name).map(Variable::value).expect("variable")
}

fn drain(rx: &mut broadcast::Receiver<PanelEvent>) -> Vec<PanelEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty | TryRecvError::Closed) => return events,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
}

#[test]
fn local_edit_is_stored_redrawn_and_sent() {
    let transport = RecordingTransport::open();
    let mut panel = ControlPanel::new(registry(), Arc::clone(&transport));
    let mut events = panel.subscribe_events();

    let edit = panel.commit_text("move_speed", "2.5").expect("commit");
    assert_eq!(edit.change.current, 2.5);
    assert_eq!(value(&panel, "move_speed"), 2.5);
    assert_eq!(transport.sent(), vec!["move_speed 2.5".to_string()]);
    assert_eq!(drain(&mut events), vec![PanelEvent::Redraw]);
}

#[test]
fn commit_and_step_share_the_wire_format() {
    let transport = RecordingTransport::open();
    let mut panel = ControlPanel::new(registry(), Arc::clone(&transport));

    panel.commit_value("turn_rate_mod", 0.5).expect("commit");
    panel.increment("turn_rate_mod").expect("increment");
    panel.decrement("agent_count").expect("decrement");

    assert_eq!(
        transport.sent(),
        vec![
            "turn_rate 0.5 mod".to_string(),
            "turn_rate 0.51 mod".to_string(),
            "agent_count 99".to_string(),
        ]
    );
}

#[test]
fn closed_transport_drops_update_but_keeps_value() {
    let transport = RecordingTransport::closed();
    let mut panel = ControlPanel::new(registry(), Arc::clone(&transport));
    assert_eq!(panel.connection(), ConnectionState::Connecting);
    let mut events = panel.subscribe_events();

    panel.commit_text("agent_count", "5000").expect("commit");
    assert_eq!(value(&panel, "agent_count"), 1000.0);
    assert!(transport.sent().is_empty());
    assert_eq!(
        drain(&mut events),
        vec![
            PanelEvent::Redraw,
            PanelEvent::UpdateDropped {
                wire: "agent_count 1000".to_string()
            },
        ]
    );
}

#[test]
fn unknown_variable_sends_nothing() {
    let transport = RecordingTransport::open();
    let mut panel = ControlPanel::new(registry(), Arc::clone(&transport));
    let mut events = panel.subscribe_events();

    assert!(matches!(
        panel.increment("ghost"),
        Err(RegistryError::UnknownVariable(_))
    ));
    assert!(transport.sent().is_empty());
    assert!(drain(&mut events).is_empty());
}

#[test]
fn snapshot_lines_update_registry_and_request_redraw() {
    let transport = RecordingTransport::open();
    let mut panel = ControlPanel::new(registry(), Arc::clone(&transport));
    let mut events = panel.subscribe_events();

    panel.handle_transport_event(TransportEvent::Message(
        "Success: .{agent_count=250.4, turn_rate=3.14159, unknown=1}".to_string(),
    ));
    assert_eq!(value(&panel, "agent_count"), 250.0);
    assert_eq!(value(&panel, "turn_rate"), 1.0);
    assert_eq!(value(&panel, "move_speed"), 1.0);
    assert_eq!(drain(&mut events), vec![PanelEvent::Redraw]);
    // inbound snapshots are never echoed back
    assert!(transport.sent().is_empty());
}

#[test]
fn unchanged_snapshot_does_not_redraw() {
    let mut panel = ControlPanel::new(registry(), RecordingTransport::open());
    let mut events = panel.subscribe_events();

    let report = panel
        .handle_line("Success: .{agent_count=100}")
        .expect("snapshot");
    assert_eq!(report.changes.len(), 1);
    assert!(drain(&mut events).is_empty());
}

#[test]
fn malformed_and_foreign_lines_are_ignored() {
    let mut panel = ControlPanel::new(registry(), RecordingTransport::open());
    let before = panel.registry().clone();
    let mut events = panel.subscribe_events();

    assert!(panel.handle_line("Success: .{agent_count=5").is_none());
    assert!(panel.handle_line("Error: no such variable").is_none());
    assert!(panel.handle_line("").is_none());

    assert_eq!(panel.registry(), &before);
    assert!(drain(&mut events).is_empty());
}

#[test]
fn connection_events_track_state() {
    let mut panel = ControlPanel::new(registry(), RecordingTransport::closed());
    let mut events = panel.subscribe_events();

    panel.handle_transport_event(TransportEvent::Opened);
    assert_eq!(panel.connection(), ConnectionState::Open);
    panel.handle_transport_event(TransportEvent::Error("reset".to_string()));
    panel.handle_transport_event(TransportEvent::Closed);
    assert_eq!(panel.connection(), ConnectionState::Closed);

    assert_eq!(
        drain(&mut events),
        vec![
            PanelEvent::Connection(ConnectionState::Open),
            PanelEvent::Connection(ConnectionState::Closed),
        ]
    );
}

#[test]
fn snapshots_apply_in_delivery_order() {
    let mut panel = ControlPanel::new(registry(), RecordingTransport::open());
    for line in [
        "Success: .{move_speed=2}",
        "Success: .{move_speed=3, agent_count=7}",
        "Success: .{agent_count=9}",
    ] {
        panel.handle_transport_event(TransportEvent::Message(line.to_string()));
    }
    assert_eq!(value(&panel, "move_speed"), 3.0);
    assert_eq!(value(&panel, "agent_count"), 9.0);
}
