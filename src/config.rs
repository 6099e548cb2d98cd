//! Demo configuration
//!
//! Window geometry and title are fixed. Everything else has a default that
//! can be overridden with a JSON object in `PAN2PLAYERS_CONFIG`, and the audio
//! file path can be set on its own with `PAN2PLAYERS_AUDIO`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::audio::device::AudioConfig;
use crate::error::Result;

pub const SCREEN_WIDTH: u32 = 640;
pub const SCREEN_HEIGHT: u32 = 480;
pub const WINDOW_TITLE: &str = "Audio Panning Loop (Ebitengine Demo)";

/// JSON overrides for [`DemoConfig`]
pub const CONFIG_ENV: &str = "PAN2PLAYERS_CONFIG";
/// Path of the looping audio file
pub const AUDIO_ENV: &str = "PAN2PLAYERS_AUDIO";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub audio: AudioConfig,
    pub asset_path: PathBuf,
    pub ticks_per_second: u32,
    /// Seconds for one full right-left-right sweep
    pub pan_period_secs: f64,
    /// Width of the position marker, in screen units
    pub marker_width: u32,
    /// Stop after this many ticks; run forever when absent
    pub max_ticks: Option<u64>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            asset_path: PathBuf::from("assets/ragtime.ogg"),
            ticks_per_second: 60,
            pan_period_secs: 10.0,
            marker_width: 66,
            max_ticks: None,
        }
    }
}

impl DemoConfig {
    /// Defaults plus overrides from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults plus overrides from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_ENV) {
            Some(json) if !json.trim().is_empty() => serde_json::from_str(&json)?,
            _ => Self::default(),
        };

        if let Some(path) = lookup(AUDIO_ENV).filter(|p| !p.is_empty()) {
            config.asset_path = PathBuf::from(path);
        }

        if config.ticks_per_second == 0 {
            log::warn!("ticks_per_second must be positive, using 60");
            config.ticks_per_second = 60;
        }

        Ok(config)
    }
}
