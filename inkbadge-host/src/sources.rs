//! Sensor sources
//!
//! A source produces one [`SensorSnapshot`] per tick. Failures never
//! propagate: a sensor that cannot be read is stored as the `ERR` sentinel
//! and logged, so the rest of the grid still renders.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use inkbadge_core::SensorSnapshot;
use log::{debug, error};
use serde::Deserialize;
use serde_json::Value;

use crate::settings::HomeAssistantSettings;

/// Snapshot key for the weather entity's temperature
pub const OUTSIDE_TEMP_KEY: &str = "outside_temp";

/// Snapshot key for the local clock time
pub const TIME_KEY: &str = "time";

/// Snapshot key for the local date
pub const DATE_KEY: &str = "date";

/// Produces sensor readings for a tick
pub trait SensorSource {
    async fn fetch(&self) -> SensorSnapshot;
}

/// Add local `time` (`HH:MM`) and `date` (`DD/MM`) entries
pub fn add_local_time<Tz: TimeZone>(snapshot: &mut SensorSnapshot, now: &DateTime<Tz>)
where
    Tz::Offset: std::fmt::Display,
{
    snapshot.insert(TIME_KEY, now.format("%H:%M").to_string());
    snapshot.insert(DATE_KEY, now.format("%d/%m").to_string());
}

/// Home Assistant entity state, as returned by `/api/states/<entity>`
#[derive(Debug, Deserialize)]
struct EntityState {
    state: String,
    #[serde(default)]
    attributes: serde_json::Map<String, Value>,
}

/// Reads entity states from the Home Assistant REST API
pub struct HomeAssistantSource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    sensors: BTreeSet<String>,
    entities: BTreeMap<String, String>,
    weather_entity: Option<String>,
}

impl HomeAssistantSource {
    /// Source reporting every key in `sensors`
    ///
    /// Keys mapped in `settings.entities` are always included. A key with
    /// no entity id reads as `ERR`.
    pub fn new(settings: &HomeAssistantSettings, sensors: BTreeSet<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_s))
            .build()
            .context("failed to build HTTP client")?;

        let mut sensors = sensors;
        sensors.extend(settings.entities.keys().cloned());

        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_owned(),
            token: settings.token.clone(),
            sensors,
            entities: settings.entities.clone(),
            weather_entity: settings.weather_entity.clone(),
        })
    }

    async fn entity_state(&self, entity_id: &str) -> Result<EntityState> {
        let url = format!("{}/api/states/{}", self.base_url, entity_id);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let state = request
            .send()
            .await?
            .error_for_status()?
            .json::<EntityState>()
            .await?;
        debug!("{} = {}", entity_id, state.state);
        Ok(state)
    }

    /// Entity state; `None` if unconfigured or unreachable
    async fn sensor_value(&self, key: &str) -> Option<String> {
        let Some(entity_id) = self.entities.get(key) else {
            debug!("No entity configured for {}", key);
            return None;
        };
        match self.entity_state(entity_id).await {
            Ok(state) => Some(state.state),
            Err(e) => {
                error!("Error fetching {}: {:#}", entity_id, e);
                None
            }
        }
    }

    /// Outside temperature from the weather entity's attributes
    async fn weather_temperature(&self) -> Option<String> {
        let entity_id = self.weather_entity.as_deref()?;
        match self.entity_state(entity_id).await {
            Ok(state) => attribute_text(&state.attributes, "temperature"),
            Err(e) => {
                error!("Error fetching weather: {:#}", e);
                None
            }
        }
    }
}

impl SensorSource for HomeAssistantSource {
    async fn fetch(&self) -> SensorSnapshot {
        let mut snapshot = SensorSnapshot::new();

        for key in &self.sensors {
            match self.sensor_value(key).await {
                Some(value) => snapshot.insert(key.as_str(), value),
                None => snapshot.insert_error(key.as_str()),
            }
        }

        match self.weather_temperature().await {
            Some(value) => snapshot.insert(OUTSIDE_TEMP_KEY, value),
            None => snapshot.insert_error(OUTSIDE_TEMP_KEY),
        }

        add_local_time(&mut snapshot, &Local::now());
        snapshot
    }
}

/// Render a JSON attribute as display text
fn attribute_text(attributes: &serde_json::Map<String, Value>, name: &str) -> Option<String> {
    match attributes.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
