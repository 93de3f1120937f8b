use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use shared::{
    domain::{ClientId, ZoneId},
    protocol::{Client, PushSettings, Zone},
};
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

pub mod commands;
pub mod config;
pub mod entities;
pub mod error;
pub mod notifier;
mod reconnect;
pub mod registry;
pub mod transport;

pub use commands::{check_health, CommandPusher};
pub use config::ClientConfig;
pub use error::{CommandError, SetupConnectivityError, TransportError};
pub use notifier::{ChangeNotifier, ListenerHandle};
pub use reconnect::ConnectionState;
pub use registry::{Applied, Registry, SharedRegistry};
pub use transport::{Frame, TransportConnector, TransportSession, WebSocketConnector};

use reconnect::ReconnectLoop;

/// Mirrors the server's display clients and zones and pushes settings back.
///
/// `start` spawns the reconnect loop on the current tokio runtime; `stop`
/// cancels it, waits for it to close the transport, and cannot be undone.
pub struct NowPlayingClient {
    config: ClientConfig,
    connector: Arc<dyn TransportConnector>,
    registry: SharedRegistry,
    notifier: ChangeNotifier,
    pusher: CommandPusher,
    state: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NowPlayingClient {
    pub fn new(config: ClientConfig) -> Result<Arc<Self>, CommandError> {
        Self::new_with_connector(config, Arc::new(WebSocketConnector))
    }

    pub fn new_with_connector(
        config: ClientConfig,
        connector: Arc<dyn TransportConnector>,
    ) -> Result<Arc<Self>, CommandError> {
        let pusher = CommandPusher::new(config.clone())?;
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Ok(Arc::new(Self {
            config,
            connector,
            registry: SharedRegistry::new(),
            notifier: ChangeNotifier::new(),
            pusher,
            state: Arc::new(state),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Spawns the reconnect loop. Calling it again while running is a no-op.
    pub fn start(&self) {
        let mut task = self.task.lock();
        // Checked under the lock: `stop` cancels before it takes the task.
        if self.cancel.is_cancelled() {
            warn!("client: start ignored after stop");
            return;
        }
        if task.is_some() {
            return;
        }

        let reconnect = ReconnectLoop {
            url: self.config.websocket_url(),
            connector: Arc::clone(&self.connector),
            registry: self.registry.clone(),
            notifier: self.notifier.clone(),
            state: Arc::clone(&self.state),
            reconnect_interval: self.config.reconnect_interval,
            connect_timeout: self.config.request_timeout,
            cancel: self.cancel.clone(),
        };
        *task = Some(tokio::spawn(reconnect.run()));
    }

    /// Cancels the reconnect loop and waits for it to close the transport.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                error!(%err, "client: reconnect loop ended abnormally");
            }
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Named clients only; displays still waiting for a name stay hidden.
    pub fn clients(&self) -> Vec<Client> {
        self.registry.clients()
    }

    pub fn zones(&self) -> Vec<Zone> {
        self.registry.zones()
    }

    pub fn zone_id_for(&self, display_name: &str) -> Option<ZoneId> {
        self.registry.zone_id_for(display_name)
    }

    pub fn is_connected(&self) -> bool {
        self.registry.is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Waits until the loop reports `Connected`, up to `timeout`.
    pub async fn wait_until_connected(&self, timeout: Duration) -> bool {
        let mut state = self.state.subscribe();
        let reached = tokio::time::timeout(
            timeout,
            state.wait_for(|state| *state == ConnectionState::Connected),
        )
        .await;
        matches!(reached, Ok(Ok(_)))
    }

    pub fn add_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.notifier.add_listener(listener)
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Pushes settings to one display. Returns `false` on failure or when the
    /// client is stopped while the request is in flight.
    pub async fn push_settings(&self, client_id: &ClientId, settings: &PushSettings) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            pushed = self.pusher.push(client_id, settings) => pushed,
        }
    }

    pub fn pusher(&self) -> &CommandPusher {
        &self.pusher
    }
}

impl Drop for NowPlayingClient {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
