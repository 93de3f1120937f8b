use std::{sync::Arc, time::Duration};

use shared::protocol::ServerEvent;
use tokio::{sync::watch, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    notifier::ChangeNotifier,
    registry::SharedRegistry,
    transport::{Frame, TransportConnector, TransportSession},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
    Closed,
}

enum PumpOutcome {
    Closed,
    Failed(String),
    Cancelled,
}

/// Drives one transport at a time: connect, pump frames into the registry,
/// back off, retry. Only a cancelled token ends the loop.
pub(crate) struct ReconnectLoop {
    pub(crate) url: String,
    pub(crate) connector: Arc<dyn TransportConnector>,
    pub(crate) registry: SharedRegistry,
    pub(crate) notifier: ChangeNotifier,
    pub(crate) state: Arc<watch::Sender<ConnectionState>>,
    pub(crate) reconnect_interval: Duration,
    pub(crate) connect_timeout: Duration,
    pub(crate) cancel: CancellationToken,
}

impl ReconnectLoop {
    pub(crate) async fn run(self) {
        loop {
            self.state.send_replace(ConnectionState::Connecting);
            info!(url = %self.url, "websocket: connecting");

            let attempt = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                attempt = time::timeout(self.connect_timeout, self.connector.connect(&self.url)) => attempt,
            };

            match attempt {
                Ok(Ok(mut session)) => {
                    info!(url = %self.url, "websocket: connected");
                    self.registry.set_connected(true);
                    self.state.send_replace(ConnectionState::Connected);
                    self.notifier.notify();

                    let outcome = self.pump(session.as_mut()).await;
                    if let PumpOutcome::Cancelled = outcome {
                        self.shutdown(Some(session)).await;
                        return;
                    }

                    match outcome {
                        PumpOutcome::Failed(reason) => {
                            warn!(url = %self.url, %reason, "websocket: connection lost")
                        }
                        _ => info!(url = %self.url, "websocket: closed by server"),
                    }
                    if let Err(err) = session.close().await {
                        debug!(%err, "websocket: close after disconnect failed");
                    }
                }
                Ok(Err(err)) => warn!(%err, "websocket: connection failed"),
                Err(_) => warn!(
                    url = %self.url,
                    timeout_ms = self.connect_timeout.as_millis() as u64,
                    "websocket: handshake timed out"
                ),
            }

            self.registry.set_connected(false);
            self.state.send_replace(ConnectionState::Disconnected);
            self.notifier.notify();

            info!(
                interval_ms = self.reconnect_interval.as_millis() as u64,
                "websocket: reconnecting after backoff"
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = time::sleep(self.reconnect_interval) => {}
            }
        }

        self.shutdown(None).await;
    }

    async fn pump(&self, session: &mut dyn TransportSession) -> PumpOutcome {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return PumpOutcome::Cancelled,
                frame = session.receive() => frame,
            };

            match frame {
                Frame::Text(text) => self.dispatch(&text),
                Frame::Error(reason) => {
                    error!(%reason, "websocket: error frame");
                    return PumpOutcome::Failed(reason);
                }
                Frame::Closed => return PumpOutcome::Closed,
            }
        }
    }

    /// Applies one text frame. Every frame produces exactly one notification,
    /// including frames that fail to parse or carry an unknown type.
    fn dispatch(&self, text: &str) {
        match ServerEvent::from_json(text) {
            Ok(event) => {
                let applied = self.registry.apply(event);
                debug!(?applied, "websocket: event applied");
            }
            Err(err) => warn!(%err, "websocket: dropping malformed frame"),
        }
        self.notifier.notify();
    }

    async fn shutdown(&self, session: Option<Box<dyn TransportSession>>) {
        self.state.send_replace(ConnectionState::Closing);
        if let Some(mut session) = session {
            if let Err(err) = session.close().await {
                debug!(%err, "websocket: close during shutdown failed");
            }
        }
        if self.registry.set_connected(false) {
            self.notifier.notify();
        }
        self.state.send_replace(ConnectionState::Closed);
        info!(url = %self.url, "websocket: stopped");
    }
}
