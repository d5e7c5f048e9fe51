//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! train-board.toml file. It provides a centralized way to configure the
//! station, refresh cadence, scroll animation, display size and field layout.
//!
//! Durations are written as human-readable strings (`"30s"`, `"250ms"`).
//! The ODPT API key may be given in the file but is normally supplied through
//! the `ODPT_API_KEY` environment variable, which always wins.

use crate::departures::Station;
use crate::field::Motion;
use crate::layout::{BoardLayout, FieldKind, FieldLayout, LayoutConfigError, SlotLayout};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "train-board.toml";

/// Environment variable holding the ODPT consumer key
pub const API_KEY_ENV: &str = "ODPT_API_KEY";

/// Application configuration loaded from train-board.toml
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Station and API settings
    pub station: StationConfig,
    /// Data refresh cadence
    pub refresh: RefreshConfig,
    /// Scroll and paging animation
    pub animation: AnimationConfig,
    /// Character display size and wiring
    pub display: DisplayConfig,
    /// Field placement; empty means the classic one-departure-per-row board
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub layout: Vec<FieldConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StationConfig {
    /// `Operator.Line.Station`, e.g. "Tokyu.Oimachi.Jiyugaoka"
    pub id: String,
    /// "Outbound" or "Inbound"
    pub direction: String,
    /// ODPT consumer key (prefer the ODPT_API_KEY environment variable)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    /// Also query realtime train positions for delays
    pub realtime: bool,
    /// Offset of the timetable's local time from UTC (Tokyo is +9)
    pub utc_offset_hours: i32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Consecutive display failures tolerated before giving up
    pub max_commit_failures: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationMode {
    Scrolling,
    Paging,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub mode: AnimationMode,
    /// Animation tick period
    #[serde(with = "humantime_serde")]
    pub tick: Duration,
    /// Characters per second while scrolling
    pub scroll_rate: f64,
    #[serde(with = "humantime_serde")]
    pub start_dwell: Duration,
    #[serde(with = "humantime_serde")]
    pub end_dwell: Duration,
    /// Time each page is shown in paging mode
    #[serde(with = "humantime_serde")]
    pub page_hold: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub rows: usize,
    pub columns: usize,
    /// Character used for empty cells
    pub blank: char,
    /// I2C bus device for the LCD backpack
    pub i2c_bus: String,
    pub i2c_address: u8,
}

/// One `[[layout]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldConfig {
    /// Which departure (0 = next train) this field belongs to
    pub slot: usize,
    pub kind: FieldKind,
    pub row: usize,
    pub column: usize,
    pub width: usize,
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            id: "Tokyu.Oimachi.Jiyugaoka".to_string(),
            direction: "Outbound".to_string(),
            api_key: None,
            base_url: "https://api-tokyochallenge.odpt.org/api/v4".to_string(),
            realtime: true,
            utc_offset_hours: 9,
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            max_commit_failures: 5,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig {
            mode: AnimationMode::Scrolling,
            tick: Duration::from_millis(250),
            scroll_rate: 2.0,
            start_dwell: Duration::from_secs(1),
            end_dwell: Duration::from_secs(1),
            page_hold: Duration::from_millis(1500),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            rows: 4,     // 20x4 HD44780
            columns: 20, // 20x4 HD44780
            blank: ' ',
            i2c_bus: "/dev/i2c-1".to_string(),
            i2c_address: 0x27,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            station: StationConfig::default(),
            refresh: RefreshConfig::default(),
            animation: AnimationConfig::default(),
            display: DisplayConfig::default(),
            layout: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from train-board.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(station = %config.station.id, path = %path.display(), "loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "invalid config file, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no config file found, using defaults");
                Self::default()
            }
        }
    }

    /// API key from the environment, else from the file.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.station.api_key.clone())
    }

    pub fn station(&self) -> Station {
        Station {
            id: self.station.id.clone(),
            direction: self.station.direction.clone(),
        }
    }

    pub fn motion(&self) -> Motion {
        match self.animation.mode {
            AnimationMode::Scrolling => Motion::Scroll {
                chars_per_second: self.animation.scroll_rate,
                start_dwell: self.animation.start_dwell,
                end_dwell: self.animation.end_dwell,
            },
            AnimationMode::Paging => Motion::Page {
                hold: self.animation.page_hold,
            },
        }
    }

    /// Validate the configured layout against the display size.
    pub fn board_layout(&self) -> Result<BoardLayout, LayoutConfigError> {
        let (rows, columns) = (self.display.rows, self.display.columns);
        if self.layout.is_empty() {
            return BoardLayout::classic(rows, columns);
        }

        let slot_count = self.layout.iter().map(|f| f.slot + 1).max().unwrap_or(0);
        let mut slots = vec![SlotLayout::default(); slot_count];
        for field in &self.layout {
            slots[field.slot].fields.push((
                field.kind,
                FieldLayout::new(field.row, field.column, field.width),
            ));
        }
        BoardLayout::new(rows, columns, slots)
    }
}
