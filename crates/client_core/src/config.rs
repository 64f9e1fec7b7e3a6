use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

use crate::labels::Locale;

pub const DEFAULT_CONFIG_FILE: &str = "portal.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub reload_delay_ms: u64,
    pub request_timeout_ms: u64,
    pub locale: Locale,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            poll_interval_ms: 2_000,
            reload_delay_ms: 1_000,
            request_timeout_ms: 30_000,
            locale: Locale::Korean,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reload_delay(&self) -> Duration {
        Duration::from_millis(self.reload_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid base url '{}'", self.base_url))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            bail!("base url '{}' must use http or https", self.base_url);
        }
        if url.cannot_be_a_base() {
            bail!("base url '{}' cannot carry endpoint paths", self.base_url);
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        if self.request_timeout_ms == 0 {
            bail!("request_timeout_ms must be greater than zero");
        }
        Ok(())
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.poll_interval_ms {
            self.poll_interval_ms = v;
        }
        if let Some(v) = file.reload_delay_ms {
            self.reload_delay_ms = v;
        }
        if let Some(v) = file.request_timeout_ms {
            self.request_timeout_ms = v;
        }
        if let Some(v) = file.locale {
            self.locale = v;
        }
    }

    /// Environment overrides. Unparseable numeric values are ignored.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(v) = lookup("PORTAL_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("APP__BASE_URL") {
            self.base_url = v;
        }

        if let Some(v) = lookup("APP__POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.poll_interval_ms = v;
        }
        if let Some(v) = lookup("APP__RELOAD_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.reload_delay_ms = v;
        }
        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.request_timeout_ms = v;
        }

        if let Some(v) = lookup("APP__LOCALE") {
            self.locale = v.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    base_url: Option<String>,
    poll_interval_ms: Option<u64>,
    reload_delay_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
    locale: Option<Locale>,
}

/// Defaults, then the TOML file, then environment variables.
///
/// An explicit `config_path` must exist; the implicit `portal.toml` is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(config_path, |key| std::env::var(key).ok())
}

pub fn load_settings_with(
    config_path: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if let Some(file) = read_file_settings(config_path)? {
        settings.apply_file(file);
    }
    settings.apply_env(lookup)?;
    settings.validate()?;

    Ok(settings)
}

fn read_file_settings(config_path: Option<&Path>) -> anyhow::Result<Option<FileSettings>> {
    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config '{}'", path.display()))
        }
    };

    let file = toml::from_str::<FileSettings>(&raw)
        .with_context(|| format!("failed to parse config '{}'", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded portal config file");
    Ok(Some(file))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
