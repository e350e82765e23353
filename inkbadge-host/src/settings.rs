//! Host settings
//!
//! One TOML file holds the layout plus link, Home Assistant and schedule
//! sections. If no file is found, the default configuration compiled into
//! the binary is used. A few values can be overridden from the environment
//! (including a `.env` file), and the access token is only ever read from
//! there.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use inkbadge_core::LayoutConfig;
use log::info;
use serde::Deserialize;

use crate::sources::{DATE_KEY, OUTSIDE_TEMP_KEY, TIME_KEY};

/// Embedded default configuration (compiled into the binary)
const EMBEDDED_CONFIG: &str = include_str!("../inkbadge.toml");

/// Settings file used when none is given
pub const DEFAULT_CONFIG_PATH: &str = "inkbadge.toml";

/// Environment variable naming the settings file
pub const CONFIG_PATH_ENV: &str = "INKBADGE_CONFIG";

/// Sensor keys whose entity id can come from the environment
const ENTITY_ENV: [(&str, &str); 5] = [
    ("co2", "CO2_ENTITY"),
    ("co", "CO_ENTITY"),
    ("temperature", "TEMP_ENTITY"),
    ("pm25", "PM25_ENTITY"),
    ("humidity", "HUMIDITY_ENTITY"),
];

/// Sensor keys not backed by a per-sensor entity
const LOCAL_SENSORS: [&str; 3] = [TIME_KEY, DATE_KEY, OUTSIDE_TEMP_KEY];

/// Serial link settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    /// Serial device of the badge
    pub port: String,
    pub baud_rate: u32,
    /// Read/write timeout
    pub timeout_ms: u64,
    /// Wait after opening so the badge can reset
    pub settle_ms: u64,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            port: "/dev/tty.usbmodem1101".into(),
            baud_rate: 115_200,
            timeout_ms: 1000,
            settle_ms: 2000,
        }
    }
}

/// Home Assistant connection and entity mapping
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HomeAssistantSettings {
    /// Base URL, without the `/api` suffix
    pub url: String,
    /// Bearer token, from `HA_TOKEN` only
    #[serde(skip)]
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout_s: u64,
    /// Weather entity providing the outside temperature
    pub weather_entity: Option<String>,
    /// Sensor key to entity id
    pub entities: BTreeMap<String, String>,
}

impl Default for HomeAssistantSettings {
    fn default() -> Self {
        Self {
            url: "http://homeassistant.local:8123".into(),
            token: None,
            timeout_s: 5,
            weather_entity: None,
            entities: BTreeMap::new(),
        }
    }
}

/// Tick scheduling
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Tick every `fast_interval_s` instead of on each minute
    pub fast_refresh: bool,
    pub fast_interval_s: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            fast_refresh: false,
            fast_interval_s: 10,
        }
    }
}

/// Complete host settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(flatten)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub link: LinkSettings,
    #[serde(default)]
    pub home_assistant: HomeAssistantSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
}

impl Settings {
    /// Parse settings from TOML without environment overrides
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content).context("invalid settings TOML")?;
        settings.layout.validate()?;
        Ok(settings)
    }

    /// Settings compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_toml(EMBEDDED_CONFIG)
    }

    /// Load settings from `path`, or from the default locations
    ///
    /// An explicitly given path must exist. Without one, `inkbadge.toml` in
    /// the working directory is used if present, else the embedded default.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::read(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::read(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                info!("No settings file found, using embedded defaults");
                Self::embedded()?
            }
        };

        settings.apply_env(|key| std::env::var(key).ok());
        settings.check()?;
        Ok(settings)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let settings =
            Self::from_toml(&content).with_context(|| format!("in {}", path.display()))?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = lookup("BADGE_PORT") {
            self.link.port = port;
        }
        if let Some(url) = lookup("HA_URL") {
            self.home_assistant.url = url;
        }
        self.home_assistant.token = lookup("HA_TOKEN");

        for (key, var) in ENTITY_ENV {
            if let Some(entity) = lookup(var) {
                self.home_assistant.entities.insert(key.into(), entity);
            }
        }
        if let Some(entity) = lookup("WEATHER_ENTITY") {
            self.home_assistant.weather_entity = Some(entity);
        }
    }

    /// Sensor keys read from Home Assistant entity states
    ///
    /// Every key a cell shows or an entity is known for, except the ones
    /// filled in locally or from the weather entity.
    pub fn remote_sensors(&self) -> BTreeSet<String> {
        let cells = self.layout.cells.iter().filter_map(|c| c.sensor.as_deref());
        let known = ENTITY_ENV.iter().map(|(key, _)| *key);
        let mapped = self.home_assistant.entities.keys().map(String::as_str);

        cells
            .chain(known)
            .chain(mapped)
            .filter(|key| !key.is_empty() && !LOCAL_SENSORS.contains(key))
            .map(str::to_owned)
            .collect()
    }

    /// Sanity checks on the non-layout sections
    fn check(&self) -> Result<()> {
        if self.link.port.is_empty() {
            bail!("link.port must not be empty");
        }
        if self.schedule.fast_refresh && self.schedule.fast_interval_s == 0 {
            bail!("schedule.fast_interval_s must be non-zero");
        }
        Ok(())
    }
}

/// Settings path from the first CLI argument or `INKBADGE_CONFIG`
pub fn config_path(arg: Option<String>) -> Option<PathBuf> {
    arg.or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_embedded_default() {
        let settings = Settings::embedded().unwrap();
        let layout = &settings.layout;

        assert_eq!((layout.display.width, layout.display.height), (296, 128));
        assert_eq!((layout.display.cols, layout.display.rows), (2, 4));
        assert_eq!(layout.cells.len(), 8);
        assert_eq!(layout.cells[0].sensor.as_deref(), Some("co2"));
        assert_eq!(settings.link.baud_rate, 115_200);
        assert_eq!(settings.home_assistant.timeout_s, 5);
        assert!(!settings.schedule.fast_refresh);
    }

    #[test]
    fn test_sections_optional() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.link, LinkSettings::default());
        assert_eq!(settings.schedule, ScheduleSettings::default());
        assert!(settings.layout.cells.is_empty());
    }

    #[test]
    fn test_invalid_layout_rejected() {
        assert!(Settings::from_toml("[[cell]]\nrow = 9\ncol = 0").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("BADGE_PORT", "/dev/ttyACM0"),
            ("HA_URL", "http://ha:8123"),
            ("HA_TOKEN", "secret"),
            ("CO2_ENTITY", "sensor.co2"),
            ("WEATHER_ENTITY", "weather.home"),
            ("PM25_ENTITY", " "),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::from_toml("").unwrap();
        settings.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.link.port, "/dev/ttyACM0");
        assert_eq!(settings.home_assistant.url, "http://ha:8123");
        assert_eq!(settings.home_assistant.token.as_deref(), Some("secret"));
        assert_eq!(
            settings.home_assistant.entities.get("co2").map(String::as_str),
            Some("sensor.co2")
        );
        assert!(!settings.home_assistant.entities.contains_key("pm25"));
        assert_eq!(
            settings.home_assistant.weather_entity.as_deref(),
            Some("weather.home")
        );
    }

    #[test]
    fn test_token_not_read_from_file() {
        let settings = Settings::from_toml("[home_assistant]\ntoken = \"leaked\"").unwrap();
        assert_eq!(settings.home_assistant.token, None);
    }

    #[test]
    fn test_remote_sensors() {
        let mut settings = Settings::embedded().unwrap();
        settings
            .home_assistant
            .entities
            .insert("radon".into(), "sensor.radon".into());
        let sensors = settings.remote_sensors();

        for key in ["co2", "co", "pm25", "humidity", "temperature", "radon"] {
            assert!(sensors.contains(key), "{key} missing");
        }
        assert!(!sensors.contains(TIME_KEY));
        assert!(!sensors.contains(DATE_KEY));
        assert!(!sensors.contains(OUTSIDE_TEMP_KEY));
    }

    #[test]
    fn test_config_path() {
        assert_eq!(
            config_path(Some("custom.toml".into())),
            Some(PathBuf::from("custom.toml"))
        );
    }
}
