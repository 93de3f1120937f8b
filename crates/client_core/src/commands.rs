use std::time::Duration;

use reqwest::{Client, StatusCode};
use shared::{domain::ClientId, protocol::PushSettings};
use tracing::{debug, warn};

use crate::{
    config::{normalize_base_url, ClientConfig},
    error::{CommandError, SetupConnectivityError},
};

/// Sends settings changes for one display to the server's admin API.
#[derive(Debug, Clone)]
pub struct CommandPusher {
    http: Client,
    config: ClientConfig,
}

impl CommandPusher {
    pub fn new(config: ClientConfig) -> Result<Self, CommandError> {
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { http, config })
    }

    /// Pushes `settings` once. Anything but HTTP 200 is logged and reported as
    /// `false`.
    pub async fn push(&self, client_id: &ClientId, settings: &PushSettings) -> bool {
        match self.try_push(client_id, settings).await {
            Ok(()) => {
                debug!(client_id = %client_id, ?settings, "push: settings applied");
                true
            }
            Err(err) => {
                warn!(client_id = %client_id, %err, "push: failed to push settings");
                false
            }
        }
    }

    pub async fn try_push(
        &self,
        client_id: &ClientId,
        settings: &PushSettings,
    ) -> Result<(), CommandError> {
        let url = self.config.push_url(client_id)?;
        let response = self.http.post(url).json(settings).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(CommandError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Probes `GET {base_url}/api/health`; only HTTP 200 counts as healthy.
pub async fn check_health(base_url: &str, timeout: Duration) -> Result<(), SetupConnectivityError> {
    let base_url =
        normalize_base_url(base_url).map_err(|reason| SetupConnectivityError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        })?;
    let http = Client::builder().timeout(timeout).build()?;
    let response = http.get(format!("{base_url}/api/health")).send().await?;
    if response.status() != StatusCode::OK {
        return Err(SetupConnectivityError::Unhealthy {
            status: response.status().as_u16(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
