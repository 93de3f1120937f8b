use std::{fs, io, path::Path, time::Duration};

use anyhow::Context;
use client_core::ClientConfig;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub reconnect_interval_secs: u64,
    pub push_timeout_secs: u64,
    pub health_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            reconnect_interval_secs: 5,
            push_timeout_secs: 10,
            health_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    base_url: Option<String>,
    reconnect_interval_secs: Option<u64>,
    push_timeout_secs: Option<u64>,
    health_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.reconnect_interval_secs)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let config = ClientConfig::new(&self.base_url)
            .with_context(|| format!("invalid base url '{}'", self.base_url))?;
        Ok(config
            .with_reconnect_interval(self.reconnect_interval())
            .with_request_timeout(self.push_timeout()))
    }

    fn merge_file(&mut self, raw: &str) -> anyhow::Result<()> {
        let file: FileSettings = toml::from_str(raw).context("malformed settings file")?;
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.reconnect_interval_secs {
            self.reconnect_interval_secs = v;
        }
        if let Some(v) = file.push_timeout_secs {
            self.push_timeout_secs = v;
        }
        if let Some(v) = file.health_timeout_secs {
            self.health_timeout_secs = v;
        }
        Ok(())
    }

    /// `BRIDGE_*` first, then `APP__*`, so the latter wins when both are set.
    fn merge_env(&mut self, var: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        for prefix in ["BRIDGE_", "APP__"] {
            if let Some(v) = var(&format!("{prefix}BASE_URL")) {
                self.base_url = v;
            }
            for (key, slot) in [
                ("RECONNECT_INTERVAL_SECS", &mut self.reconnect_interval_secs),
                ("PUSH_TIMEOUT_SECS", &mut self.push_timeout_secs),
                ("HEALTH_TIMEOUT_SECS", &mut self.health_timeout_secs),
            ] {
                let name = format!("{prefix}{key}");
                if let Some(v) = var(&name) {
                    *slot = v
                        .trim()
                        .parse()
                        .with_context(|| format!("{name} must be a whole number of seconds"))?;
                }
            }
        }
        Ok(())
    }
}

/// Defaults, overlaid by the settings file when it exists, then by the
/// process environment.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

fn load_settings_with(
    path: &Path,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => settings
            .merge_file(&raw)
            .with_context(|| format!("failed to load '{}'", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
        }
    }

    settings.merge_env(var)?;
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
