use tokio::sync::{broadcast, Mutex};

use crate::sim::SimState;

pub(crate) struct AppState {
    pub(crate) sim: Mutex<SimState>,
    /// Periodic snapshot lines fanned out to every connection.
    pub(crate) snapshots: broadcast::Sender<String>,
}

impl AppState {
    pub(crate) fn new(sim: SimState) -> Self {
        let (snapshots, _) = broadcast::channel(64);
        Self {
            sim: Mutex::new(sim),
            snapshots,
        }
    }
}
