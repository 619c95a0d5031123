//! Daemon configuration loading (config.toml)

use anyhow::{Context, Result};
use race_timing::{RaceEvent, RaceMode, RaceType, Rider};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level daemon configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub event: EventSettings,
    #[serde(default)]
    pub riders: Vec<Rider>,
    #[serde(default)]
    pub readers: Vec<rfid_reader::ReaderConfig>,
}

/// Event section of the configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventSettings {
    #[serde(default = "default_event_id")]
    pub id: i64,
    pub name: String,
    pub race_mode: RaceMode,
    pub race_type: RaceType,
    pub max_laps: Option<u32>,
    /// Duration ceiling in seconds for time-based races
    pub max_duration_secs: Option<u64>,
}

fn default_event_id() -> i64 {
    1
}

impl EventSettings {
    /// Materialize the configured event
    pub fn to_event(&self) -> RaceEvent {
        let mut event = RaceEvent::new(self.id, self.name.clone(), self.race_mode, self.race_type);
        if let Some(max_laps) = self.max_laps {
            event = event.with_max_laps(max_laps);
        }
        if let Some(secs) = self.max_duration_secs {
            event = event.with_max_duration(Duration::from_secs(secs));
        }
        event
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}
