use std::time::Duration;

use shared::domain::ClientId;
use url::Url;

use crate::error::TransportError;

pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    pub reconnect_interval: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let base_url = normalize_base_url(base_url).map_err(|reason| TransportError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        })?;
        Ok(Self {
            base_url,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn websocket_url(&self) -> String {
        websocket_url(&self.base_url)
    }

    pub fn push_url(&self, client_id: &ClientId) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|()| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(["api", "admin", "clients", client_id.as_str(), "push"]);
        Ok(url)
    }

    pub fn health_url(&self) -> String {
        format!("{}/api/health", self.base_url)
    }
}

/// Trims trailing slashes and checks that the url is an absolute http(s) url.
pub fn normalize_base_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err("server url must not be empty".into());
    }

    let parsed = Url::parse(trimmed).map_err(|err| err.to_string())?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme '{other}', expected http or https")),
    }
    if parsed.host_str().is_none() {
        return Err("server url must include a host".into());
    }

    Ok(trimmed.to_string())
}

fn websocket_url(base_url: &str) -> String {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    };
    format!("{ws_base}/ws?admin=true")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
