//! Strongly-typed configuration loaded from `config.json`
//!
//! The whole file is deserialized and validated once at startup; nothing
//! after that point re-checks configuration. Validation failures are a
//! closed error set so the caller can show them verbatim on the display.

use std::path::Path;

use serde::Deserialize;

const DEFAULT_PAUSE_AFTER_CURRENT_THRESHOLD_MS: u64 = 2000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("\"{field}\" not configured or is invalid")]
    FieldTooShort { field: &'static str, min: usize },
    #[error("\"{field}\" must be greater than zero")]
    NotPositive { field: &'static str },
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub status_poll_interval_seconds: u64,
    pub standby_status_poll_interval_minutes: u64,
    pub idle_standby_minutes: u64,
    pub long_press_duration_milliseconds: u64,
    pub api_request_dot_size: u32,
    /// How early a deferred pause may fire before the track would end.
    /// Covers the network round trip; pausing slightly early beats late.
    #[serde(default = "default_pause_threshold")]
    pub pause_after_current_threshold_ms: u64,
    #[serde(default = "default_true")]
    pub show_progress_ticks: bool,
    #[serde(default)]
    pub blank_display_on_standby: bool,
    pub spotify: SpotifyConfig,
    pub wlan: WlanConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WlanConfig {
    pub ssid: String,
    pub password: String,
    pub mdns: String,
}

fn default_pause_threshold() -> u64 {
    DEFAULT_PAUSE_AFTER_CURRENT_THRESHOLD_MS
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value, min) in [
            ("client_id", &self.spotify.client_id, 16),
            ("client_secret", &self.spotify.client_secret, 16),
            ("ssid", &self.wlan.ssid, 1),
            ("password", &self.wlan.password, 1),
            ("mdns", &self.wlan.mdns, 1),
        ] {
            if value.len() < min {
                return Err(ConfigError::FieldTooShort { field, min });
            }
        }

        if self.status_poll_interval_seconds == 0 {
            return Err(ConfigError::NotPositive {
                field: "status_poll_interval_seconds",
            });
        }

        Ok(())
    }
}
