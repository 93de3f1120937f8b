//! Observer-side views of the registry, one per externally visible entity.
//!
//! Select views are keyed by friendly name so they survive a display
//! reconnecting under a new client id. Connectivity views are keyed by client
//! id and report whether that particular connection is alive.

use std::{collections::HashSet, sync::Arc};

use parking_lot::Mutex;
use shared::{
    domain::{ClientId, BACKGROUNDS, FONTS, LAYOUTS},
    protocol::{Client, PushSettings},
};
use tracing::debug;

use crate::{notifier::ListenerHandle, registry::SharedRegistry, NowPlayingClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectKind {
    Layout,
    Font,
    Background,
    Zone,
}

impl SelectKind {
    pub const ALL: [SelectKind; 4] = [
        SelectKind::Layout,
        SelectKind::Font,
        SelectKind::Background,
        SelectKind::Zone,
    ];

    pub fn key(self) -> &'static str {
        match self {
            SelectKind::Layout => "layout",
            SelectKind::Font => "font",
            SelectKind::Background => "background",
            SelectKind::Zone => "zone",
        }
    }

    pub fn options(self, registry: &SharedRegistry) -> Vec<String> {
        let fixed: &[&str] = match self {
            SelectKind::Layout => LAYOUTS,
            SelectKind::Font => FONTS,
            SelectKind::Background => BACKGROUNDS,
            SelectKind::Zone => {
                return registry.read(|registry| {
                    registry
                        .zones()
                        .iter()
                        .map(|zone| zone.display_name.clone())
                        .collect()
                })
            }
        };
        fixed.iter().map(|option| option.to_string()).collect()
    }

    fn current(self, client: &Client) -> Option<String> {
        match self {
            SelectKind::Layout => client.layout.clone(),
            SelectKind::Font => client.font.clone(),
            SelectKind::Background => client.background.clone(),
            SelectKind::Zone => client.zone_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectView {
    friendly_name: String,
    kind: SelectKind,
}

impl SelectView {
    pub fn new(friendly_name: impl Into<String>, kind: SelectKind) -> Self {
        Self {
            friendly_name: friendly_name.into(),
            kind,
        }
    }

    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    pub fn kind(&self) -> SelectKind {
        self.kind
    }

    pub fn unique_id(&self) -> String {
        format!(
            "{}_{}",
            self.friendly_name.to_lowercase().replace(' ', "_"),
            self.kind.key()
        )
    }

    pub fn options(&self, registry: &SharedRegistry) -> Vec<String> {
        self.kind.options(registry)
    }

    pub fn current_option(&self, registry: &SharedRegistry) -> Option<String> {
        registry.read(|registry| {
            registry
                .client_by_name(&self.friendly_name)
                .and_then(|client| self.kind.current(client))
        })
    }

    pub fn available(&self, registry: &SharedRegistry) -> bool {
        registry.read(|registry| {
            registry
                .client_by_name(&self.friendly_name)
                .is_some_and(|client| !client.disconnected)
        })
    }

    /// Pushes `option` to whichever client currently carries this name.
    ///
    /// Returns `false` without a request when the client is gone or the zone
    /// name does not resolve to a known zone.
    pub async fn select_option(&self, client: &NowPlayingClient, option: &str) -> bool {
        let registry = client.registry();
        let Some(target) = registry.client_by_name(&self.friendly_name) else {
            debug!(name = %self.friendly_name, "select: no client carries this name");
            return false;
        };

        let settings = match self.kind {
            SelectKind::Layout => PushSettings::layout(option),
            SelectKind::Font => PushSettings::font(option),
            SelectKind::Background => PushSettings::background(option),
            SelectKind::Zone => match registry.zone_id_for(option) {
                Some(zone_id) => PushSettings::zone(zone_id),
                None => {
                    debug!(zone = %option, "select: unknown zone");
                    return false;
                }
            },
        };

        client.push_settings(&target.client_id, &settings).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityView {
    client_id: ClientId,
}

impl ConnectivityView {
    pub fn new(client_id: ClientId) -> Self {
        Self { client_id }
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn unique_id(&self) -> String {
        format!("{}_connected", self.client_id)
    }

    pub fn display_name(&self, registry: &SharedRegistry) -> String {
        registry
            .client(&self.client_id)
            .and_then(|client| client.name().map(str::to_string))
            .unwrap_or_else(|| {
                let short: String = self.client_id.as_str().chars().take(8).collect();
                format!("Display {short}")
            })
    }

    pub fn is_on(&self, registry: &SharedRegistry) -> bool {
        registry
            .client(&self.client_id)
            .is_some_and(|client| !client.disconnected)
    }

    pub fn available(&self, registry: &SharedRegistry) -> bool {
        registry.client(&self.client_id).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveredEntity {
    Select(SelectView),
    Connectivity(ConnectivityView),
}

/// Remembers which entities were already handed out so reconnects and
/// repeated notifications never produce duplicates.
#[derive(Debug, Default)]
pub struct EntityTracker {
    tracked_names: Mutex<HashSet<String>>,
    tracked_ids: Mutex<HashSet<ClientId>>,
}

impl EntityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discover(&self, registry: &SharedRegistry) -> Vec<DiscoveredEntity> {
        let named = registry.clients();
        let mut discovered = Vec::new();

        let mut names = self.tracked_names.lock();
        let mut ids = self.tracked_ids.lock();
        for client in named {
            let Some(name) = client.name() else {
                continue;
            };
            if names.insert(name.to_string()) {
                discovered.extend(
                    SelectKind::ALL
                        .iter()
                        .map(|kind| DiscoveredEntity::Select(SelectView::new(name, *kind))),
                );
            }
            if ids.insert(client.client_id.clone()) {
                discovered.push(DiscoveredEntity::Connectivity(ConnectivityView::new(
                    client.client_id.clone(),
                )));
            }
        }
        discovered
    }

    /// Runs discovery now and after every change notification, handing any
    /// new entities to `sink`.
    pub fn attach<F>(self: &Arc<Self>, client: &NowPlayingClient, sink: F) -> ListenerHandle
    where
        F: Fn(Vec<DiscoveredEntity>) + Send + Sync + 'static,
    {
        let registry = client.registry().clone();
        let initial = self.discover(&registry);
        if !initial.is_empty() {
            sink(initial);
        }

        let tracker = Arc::clone(self);
        client.add_listener(move || {
            let discovered = tracker.discover(&registry);
            if !discovered.is_empty() {
                sink(discovered);
            }
        })
    }
}

#[cfg(test)]
#[path = "tests/entities_tests.rs"]
mod tests;
