use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

pub const DEFAULT_SERVICE_URL: &str = "https://npktester-api.onrender.com";
pub const DEFAULT_CONFIG_FILE: &str = "agrisense.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub sensor_base_url: String,
    pub prediction_base_url: String,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            sensor_base_url: DEFAULT_SERVICE_URL.into(),
            prediction_base_url: DEFAULT_SERVICE_URL.into(),
            request_timeout_secs: 10,
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    sensor_url: Option<String>,
    prediction_url: Option<String>,
    timeout_secs: Option<u64>,
    log: Option<String>,
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, raw) in [
            ("sensor_url", &self.sensor_base_url),
            ("prediction_url", &self.prediction_base_url),
        ] {
            let url = Url::parse(raw).with_context(|| format!("invalid {name} '{raw}'"))?;
            if !matches!(url.scheme(), "http" | "https") {
                bail!("{name} must use http or https, got '{}'", url.scheme());
            }
        }
        if self.request_timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }
        Ok(())
    }

    fn apply_file(&mut self, file_cfg: FileSettings) {
        if let Some(v) = file_cfg.sensor_url {
            self.sensor_base_url = v;
        }
        if let Some(v) = file_cfg.prediction_url {
            self.prediction_base_url = v;
        }
        if let Some(v) = file_cfg.timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = file_cfg.log {
            self.log_level = v;
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        for key in ["AGRISENSE_SENSOR_URL", "APP__SENSOR_URL"] {
            if let Some(v) = var(key) {
                self.sensor_base_url = v;
            }
        }
        for key in ["AGRISENSE_PREDICTION_URL", "APP__PREDICTION_URL"] {
            if let Some(v) = var(key) {
                self.prediction_base_url = v;
            }
        }
        for key in ["AGRISENSE_TIMEOUT_SECS", "APP__TIMEOUT_SECS"] {
            if let Some(parsed) = var(key).and_then(|v| v.parse::<u64>().ok()) {
                self.request_timeout_secs = parsed;
            }
        }
        for key in ["AGRISENSE_LOG", "APP__LOG"] {
            if let Some(v) = var(key) {
                self.log_level = v;
            }
        }
    }
}

/// Defaults, then `agrisense.toml` in the working directory, then environment.
pub fn load_settings() -> anyhow::Result<ClientSettings> {
    load_settings_from(Path::new(DEFAULT_CONFIG_FILE), false)
}

/// Like [`load_settings`] but reads an explicit file. A missing file is an
/// error only when `required` is set.
pub fn load_settings_from(path: &Path, required: bool) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg = toml::from_str::<FileSettings>(&raw)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
            settings.apply_file(file_cfg);
        }
        Err(err) if required || err.kind() != std::io::ErrorKind::NotFound => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()));
        }
        Err(_) => {}
    }

    settings.apply_env(|key| std::env::var(key).ok());
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
