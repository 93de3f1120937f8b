use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use shared::{
    domain::{ClientId, ZoneId},
    protocol::{Client, ServerEvent, Zone},
};
use tracing::debug;

/// What applying one event did to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    ClientsReplaced { count: usize },
    ClientUpserted(ClientId),
    ClientDisconnected(ClientId),
    ZonesReplaced { count: usize },
    Ignored,
}

/// In-memory mirror of the server's clients and zones.
///
/// Clients are keyed by `clientId`. A secondary index by friendly name is
/// rebuilt after every mutation; two clients may share a name, in which case
/// [`Registry::client_by_name`] prefers a live client and then the smallest id.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    clients: HashMap<ClientId, Client>,
    names: HashMap<String, Vec<ClientId>>,
    zones: Vec<Zone>,
    connected: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: ServerEvent) -> Applied {
        let applied = match event {
            ServerEvent::ClientsList { clients } => {
                let mut next = HashMap::with_capacity(clients.len());
                for client in clients {
                    if client.client_id.is_empty() {
                        debug!("clients_list entry without clientId skipped");
                        continue;
                    }
                    next.insert(client.client_id.clone(), client);
                }
                self.clients = next;
                Applied::ClientsReplaced {
                    count: self.clients.len(),
                }
            }
            ServerEvent::ClientConnected { client } | ServerEvent::ClientUpdated { client } => {
                match client.filter(|client| !client.client_id.is_empty()) {
                    Some(client) => {
                        let client_id = client.client_id.clone();
                        self.clients.insert(client_id.clone(), client);
                        Applied::ClientUpserted(client_id)
                    }
                    None => Applied::Ignored,
                }
            }
            ServerEvent::ClientDisconnected { client_id } => {
                match client_id.and_then(|id| self.clients.get_mut(&id)) {
                    Some(client) => {
                        client.disconnected = true;
                        Applied::ClientDisconnected(client.client_id.clone())
                    }
                    None => Applied::Ignored,
                }
            }
            ServerEvent::Zones { zones } => {
                self.zones = zones;
                Applied::ZonesReplaced {
                    count: self.zones.len(),
                }
            }
            ServerEvent::Unknown => Applied::Ignored,
        };

        if matches!(
            applied,
            Applied::ClientsReplaced { .. } | Applied::ClientUpserted(_)
        ) {
            self.reindex();
        }
        applied
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn client(&self, client_id: &ClientId) -> Option<&Client> {
        self.clients.get(client_id)
    }

    pub fn all_clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    /// Clients that have been given a friendly name, ordered by client id.
    pub fn named_clients(&self) -> Vec<Client> {
        let mut named: Vec<Client> = self
            .clients
            .values()
            .filter(|client| client.is_named())
            .cloned()
            .collect();
        named.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        named
    }

    pub fn clients_named(&self, friendly_name: &str) -> Vec<&Client> {
        self.names
            .get(friendly_name)
            .map(|ids| ids.iter().filter_map(|id| self.clients.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn client_by_name(&self, friendly_name: &str) -> Option<&Client> {
        let candidates = self.clients_named(friendly_name);
        candidates
            .iter()
            .find(|client| !client.disconnected)
            .or_else(|| candidates.first())
            .copied()
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone_id_for(&self, display_name: &str) -> Option<&ZoneId> {
        self.zones
            .iter()
            .find(|zone| zone.display_name == display_name)
            .map(|zone| &zone.id)
    }

    fn reindex(&mut self) {
        self.names.clear();
        for client in self.clients.values() {
            if let Some(name) = client.name() {
                self.names
                    .entry(name.to_string())
                    .or_default()
                    .push(client.client_id.clone());
            }
        }
        for ids in self.names.values_mut() {
            ids.sort();
        }
    }
}

/// Cloneable read handle over the registry shared with observers.
///
/// Writes go through [`SharedRegistry::apply`], which is crate-private so the
/// reconnect loop stays the only writer. Each event is applied under a single
/// write-lock acquisition.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against a consistent view of the registry.
    ///
    /// Do not call back into the registry's writers from `f`.
    pub fn read<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn snapshot(&self) -> Registry {
        self.inner.read().clone()
    }

    pub fn clients(&self) -> Vec<Client> {
        self.inner.read().named_clients()
    }

    pub fn client(&self, client_id: &ClientId) -> Option<Client> {
        self.inner.read().client(client_id).cloned()
    }

    pub fn client_by_name(&self, friendly_name: &str) -> Option<Client> {
        self.inner.read().client_by_name(friendly_name).cloned()
    }

    pub fn zones(&self) -> Vec<Zone> {
        self.inner.read().zones().to_vec()
    }

    pub fn zone_id_for(&self, display_name: &str) -> Option<ZoneId> {
        self.inner.read().zone_id_for(display_name).cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.read().is_connected()
    }

    pub(crate) fn apply(&self, event: ServerEvent) -> Applied {
        self.inner.write().apply(event)
    }

    /// Returns the previous liveness value.
    pub(crate) fn set_connected(&self, connected: bool) -> bool {
        let mut guard = self.inner.write();
        let previous = guard.is_connected();
        guard.set_connected(connected);
        previous
    }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
