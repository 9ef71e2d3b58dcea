//! Duplex line transport to the simulation process.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    /// One inbound line, without its terminator.
    Message(String),
    Closed,
    Error(String),
}

/// Outbound half of a connection. Inbound traffic arrives separately as a
/// stream of [`TransportEvent`]s.
pub trait Transport: Send + Sync {
    fn is_open(&self) -> bool;
    fn send(&self, text: &str) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn send(&self, text: &str) -> Result<(), TransportError> {
        (**self).send(text)
    }
}

pub fn validate_ws_url(raw: &str) -> Result<Url, TransportError> {
    let invalid = |reason: String| TransportError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(invalid(format!("scheme must be ws or wss, got {other}"))),
    }
}

/// WebSocket transport. Connecting happens in the background; until the
/// `Opened` event arrives, [`Transport::is_open`] is false and sends fail.
pub struct WsTransport {
    open: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<String>,
}

impl WsTransport {
    pub fn spawn(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<TransportEvent>), TransportError> {
        let url = validate_ws_url(url)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_connection(
            url.to_string(),
            Arc::clone(&open),
            outbound_rx,
            events_tx,
        ));

        Ok((
            Self {
                open,
                outbound: outbound_tx,
            },
            events_rx,
        ))
    }
}

impl Transport for WsTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn send(&self, text: &str) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        self.outbound
            .send(text.to_string())
            .map_err(|_| TransportError::NotOpen)
    }
}

async fn run_connection(
    url: String,
    open: Arc<AtomicBool>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let connected = connect_async(url.as_str()).await;
    let ws_stream = match connected {
        Ok((ws_stream, _)) => ws_stream,
        Err(source) => {
            let err = TransportError::Connect { url, source };
            warn!(%err, "transport: connect failed");
            let _ = events.send(TransportEvent::Error(err.to_string()));
            let _ = events.send(TransportEvent::Closed);
            return;
        }
    };
    let (mut writer, mut reader) = ws_stream.split();

    open.store(true, Ordering::SeqCst);
    info!(%url, "transport: connected");
    let _ = events.send(TransportEvent::Opened);

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                let Some(text) = outbound else {
                    // every sender is gone
                    let _ = writer.send(Message::Close(None)).await;
                    break;
                };
                debug!(%text, "transport: sending");
                if let Err(err) = writer.send(Message::Text(text)).await {
                    let _ = events.send(TransportEvent::Error(format!(
                        "websocket send failed: {err}"
                    )));
                    break;
                }
            }
            inbound = reader.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
                            let _ = events.send(TransportEvent::Message(line.to_string()));
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        let _ = events.send(TransportEvent::Error(format!(
                            "websocket receive failed: {err}"
                        )));
                        break;
                    }
                }
            }
        }
    }

    open.store(false, Ordering::SeqCst);
    info!(%url, "transport: closed");
    let _ = events.send(TransportEvent::Closed);
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
