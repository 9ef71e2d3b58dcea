use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use clap::Parser;
use shared::domain::{default_variable_defs, DEFAULT_ANGLE_VARIABLES};
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod app_state;
mod sim;

use app_state::AppState;
use sim::{AngleInput, SimParameter, SimState};

#[derive(Parser, Debug)]
#[command(about = "Stand-in simulation speaking the panel line protocol")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:8765")]
    bind: SocketAddr,
    /// Milliseconds between unsolicited snapshots; 0 disables them.
    #[arg(long, default_value_t = 1000)]
    snapshot_interval_ms: u64,
    /// How inbound values for angle variables are read.
    #[arg(long, value_enum, default_value_t = AngleInput::Radians)]
    angle_input: AngleInput,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let sim = SimState::new(
        &default_variable_defs(),
        DEFAULT_ANGLE_VARIABLES,
        args.angle_input,
    );
    let state = Arc::new(AppState::new(sim));
    if args.snapshot_interval_ms > 0 {
        tokio::spawn(broadcast_snapshots(
            Arc::clone(&state),
            Duration::from_millis(args.snapshot_interval_ms),
        ));
    }
    let app = build_router(state);

    info!(addr = %args.bind, angle_input = ?args.angle_input, "sim stub listening");
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/state", get(http_state))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_state(State(state): State<Arc<AppState>>) -> Json<Vec<SimParameter>> {
    Json(state.sim.lock().await.parameters().to_vec())
}

async fn broadcast_snapshots(state: Arc<AppState>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let line = state.sim.lock().await.snapshot_line();
        // no receivers is fine; nobody is connected yet
        let _ = state.snapshots.send(line);
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: axum::extract::ws::WebSocket) {
    use axum::extract::ws::Message;
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut snapshots = state.snapshots.subscribe();
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<String>();

    let send_task = tokio::spawn(async move {
        loop {
            let line = tokio::select! {
                Some(line) = reply_rx.recv() => line,
                snapshot = snapshots.recv() => match snapshot {
                    Ok(line) => line,
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
            };
            if sender.send(Message::Text(line)).await.is_err() {
                break;
            }
        }
    });

    let _ = reply_tx.send(state.sim.lock().await.snapshot_line());
    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        for line in text.lines().filter(|line| !line.trim().is_empty()) {
            debug!(%line, "sim: command received");
            let reply = state.sim.lock().await.handle_command(line);
            let _ = reply_tx.send(reply);
        }
    }

    send_task.abort();
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
