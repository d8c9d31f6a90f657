// src/config.rs
//! Configuration stored as JSON under the user's config directory

use crate::{
    error::{GpsError, Result},
    schedule::{DEFAULT_IDLE_POLLS, DEFAULT_REFRESH_SECS},
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Where fixes are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// 296x128 frame written as a PBM snapshot
    Eink,
    Terminal,
    /// One JSON object per redraw on stdout
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsConfig {
    pub serial_port: Option<String>,
    pub serial_baudrate: u32,
    /// Seconds between position fixes requested from the module
    pub update_rate_secs: u64,
    /// Seconds between panel redraws once a fix is held
    pub refresh_interval_secs: u32,
    /// Update periods between redraws while searching
    pub idle_polls: u32,
    pub pps: bool,
    /// Put the module to sleep between fixes
    pub periodic_secs: Option<u64>,
    pub image_path: Option<PathBuf>,
    pub snapshot_path: PathBuf,
    pub output: OutputKind,
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            serial_port: None,
            serial_baudrate: 9600,
            update_rate_secs: 5,
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            idle_polls: DEFAULT_IDLE_POLLS,
            pps: false,
            periodic_secs: None,
            image_path: None,
            snapshot_path: PathBuf::from("badger.pbm"),
            output: OutputKind::Eink,
        }
    }
}

impl GpsConfig {
    /// Load configuration from the default location, defaults when absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| GpsError::Other(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| GpsError::Parse(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| GpsError::Other(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)?;

        std::fs::write(path, contents)
            .map_err(|e| GpsError::Other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// `$HOME/.config/badger-gps/config.json`
    pub fn get_config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| GpsError::Other("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("badger-gps").join("config.json"))
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.serial_port = Some(port);
        self.serial_baudrate = baudrate;
    }

    pub fn update_rate(&self) -> Duration {
        Duration::from_secs(self.update_rate_secs)
    }

    pub fn periodic(&self) -> Option<Duration> {
        self.periodic_secs.map(Duration::from_secs)
    }
}
