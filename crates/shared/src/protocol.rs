use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::{
    domain::{ClientId, ZoneId},
    error::ProtocolError,
};

/// A display screen as reported by the server.
///
/// `disconnected` never travels over the wire; it is set locally when the
/// server reports that the display dropped its connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(default)]
    pub client_id: ClientId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    #[serde(skip)]
    pub disconnected: bool,
}

impl Client {
    /// Friendly name, treating an empty string as unnamed.
    pub fn name(&self) -> Option<&str> {
        self.friendly_name.as_deref().filter(|name| !name.is_empty())
    }

    pub fn is_named(&self) -> bool {
        self.name().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    #[serde(rename = "displayName", alias = "display_name")]
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    ClientsList {
        #[serde(default, deserialize_with = "lenient_list")]
        clients: Vec<Client>,
    },
    ClientConnected {
        #[serde(default)]
        client: Option<Client>,
    },
    ClientDisconnected {
        #[serde(default, rename = "clientId")]
        client_id: Option<ClientId>,
    },
    ClientUpdated {
        #[serde(default)]
        client: Option<Client>,
    },
    Zones {
        #[serde(default, deserialize_with = "lenient_list")]
        zones: Vec<Zone>,
    },
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Decodes a snapshot list entry by entry. Entries that fail to decode are
/// logged and dropped so one bad row cannot void the whole snapshot.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!(%err, "skipping malformed snapshot entry");
                None
            }
        })
        .collect())
}

/// Partial settings update sent to `POST /api/admin/clients/{id}/push`.
///
/// Unset fields are omitted from the body rather than sent as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<ZoneId>,
}

impl PushSettings {
    pub fn layout(layout: impl Into<String>) -> Self {
        Self {
            layout: Some(layout.into()),
            ..Self::default()
        }
    }

    pub fn font(font: impl Into<String>) -> Self {
        Self {
            font: Some(font.into()),
            ..Self::default()
        }
    }

    pub fn background(background: impl Into<String>) -> Self {
        Self {
            background: Some(background.into()),
            ..Self::default()
        }
    }

    pub fn zone(zone_id: ZoneId) -> Self {
        Self {
            zone_id: Some(zone_id),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_none()
            && self.font.is_none()
            && self.background.is_none()
            && self.zone_id.is_none()
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
