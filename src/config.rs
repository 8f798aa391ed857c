//! Station configuration
//!
//! Stored as TOML in `<config dir>/controlstation/config.toml`. A default file
//! is written on first start; missing keys fall back to their defaults so an
//! old file keeps working after new settings are added.

use crate::input::gamepad::GamepadSettings;
use crate::poller::PollerSettings;
use crate::session::SessionSettings;
use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "controlstation";
const CONFIG_FILE: &str = "config.toml";

/// TCP port the robot listens on
pub const ROBOT_PORT: u16 = 25555;

/// A named robot address shown in the host picker
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    /// IP literal or DNS name
    pub host: String,
}

impl Endpoint {
    fn new(name: &str, host: &str) -> Self {
        Self {
            name: name.to_string(),
            host: host.to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct StationConfig {
    pub endpoints: Vec<Endpoint>,
    /// Name of the endpoint used by a bare `connect`
    pub selected_endpoint: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub receive_buffer_size: usize,
    pub battery_poll_interval_ms: u64,
    pub dual_mode: bool,
    pub gamepad: GamepadSettings,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                Endpoint::new("ares-wifi", "192.168.1.3"),
                Endpoint::new("ares-ethernet", "192.168.1.4"),
                Endpoint::new("(TEST) pmc43.ddns.net", "pmc43.ddns.net"),
                Endpoint::new("(TEST) localhost", "127.0.0.1"),
            ],
            selected_endpoint: "ares-wifi".to_string(),
            port: ROBOT_PORT,
            connect_timeout_ms: 5_000,
            receive_buffer_size: 256,
            battery_poll_interval_ms: 20_000,
            dual_mode: false,
            gamepad: GamepadSettings::default(),
        }
    }
}

impl StationConfig {
    /// Host for a connect request
    ///
    /// `None` picks the selected endpoint. A known endpoint name maps to its
    /// host, anything else is taken as a literal host.
    pub fn resolve_host(&self, target: Option<&str>) -> Option<String> {
        let name = target.unwrap_or(&self.selected_endpoint);
        if let Some(endpoint) = self.endpoints.iter().find(|e| e.name == name) {
            return Some(endpoint.host.clone());
        }
        match target {
            Some(host) if !host.trim().is_empty() => Some(host.trim().to_string()),
            _ => self.endpoints.first().map(|e| e.host.clone()),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            receive_buffer_size: self.receive_buffer_size,
        }
    }

    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            interval: Duration::from_millis(self.battery_poll_interval_ms),
            ..Default::default()
        }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config = toml::from_str(&content)
            .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| eyre!("Failed to serialize config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write config file {}: {}", path.display(), e))?;
        info!("Config saved to {}", path.display());
        Ok(())
    }

    /// Writes the default config if no file exists yet
    pub async fn ensure_default_config(path: &Path) -> Result<()> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?;
        if !exists {
            info!("Creating default configuration at {}", path.display());
            StationConfig::default().save(path).await?;
        }
        Ok(())
    }

    /// Loads the config, falling back to defaults on a broken file
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        Self::ensure_default_config(path).await?;
        match Self::load(path).await {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("{}, using defaults", e);
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_host_by_alias_or_literal() {
        let config = StationConfig::default();
        assert_eq!(config.resolve_host(None).as_deref(), Some("192.168.1.3"));
        assert_eq!(
            config.resolve_host(Some("ares-ethernet")).as_deref(),
            Some("192.168.1.4")
        );
        assert_eq!(
            config.resolve_host(Some("robot.local")).as_deref(),
            Some("robot.local")
        );
    }

    #[test]
    fn test_unknown_selection_falls_back_to_first_endpoint() {
        let config = StationConfig {
            selected_endpoint: "gone".to_string(),
            ..Default::default()
        };
        assert_eq!(config.resolve_host(None).as_deref(), Some("192.168.1.3"));

        let empty = StationConfig {
            endpoints: Vec::new(),
            ..config
        };
        assert_eq!(empty.resolve_host(None), None);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: StationConfig = toml::from_str(
            r#"
            dual_mode = true
            battery_poll_interval_ms = 5000

            [gamepad]
            deadzone = 0.1
            "#,
        )
        .unwrap();

        assert!(config.dual_mode);
        assert_eq!(config.port, ROBOT_PORT);
        assert_eq!(config.poller_settings().interval, Duration::from_secs(5));
        assert_eq!(config.gamepad.deadzone, 0.1);
        assert_eq!(
            config.gamepad.buttons,
            GamepadSettings::default().buttons
        );
    }

    #[test]
    fn test_invalid_action_name_is_rejected() {
        let result = toml::from_str::<StationConfig>(
            r#"
            [gamepad.buttons]
            South = "selfDestruct"
            "#,
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_default_config_written_once() {
        let mut path = std::env::temp_dir();
        path.push(format!("controlstation-test-{}", std::process::id()));
        path.push(CONFIG_FILE);

        StationConfig::ensure_default_config(&path).await.unwrap();
        let loaded = StationConfig::load(&path).await.unwrap();
        assert_eq!(loaded, StationConfig::default());

        let changed = StationConfig {
            dual_mode: true,
            ..Default::default()
        };
        changed.save(&path).await.unwrap();
        StationConfig::ensure_default_config(&path).await.unwrap();
        assert!(StationConfig::load(&path).await.unwrap().dual_mode);

        if let Some(dir) = path.parent() {
            let _ = tokio::fs::remove_dir_all(dir).await;
        }
    }
}
