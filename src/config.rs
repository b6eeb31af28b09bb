// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Configuration is stored as TOML through `confy`. Every field has a serde
//! default so older or hand-edited files keep loading as fields are added.

use std::path::PathBuf;

use route_core::{LatLon, Viewport};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "trailmap";
const CONFIG_NAME: &str = "config";

/// Default OpenStreetMap raster tile template
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Default OpenWeatherMap API root
pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Map center used on startup
    #[serde(default = "default_center_latitude")]
    pub default_latitude: f64,

    #[serde(default = "default_center_longitude")]
    pub default_longitude: f64,

    /// Map zoom used on startup (0 - 19)
    #[serde(default = "default_zoom")]
    pub default_zoom: u8,

    /// Viewport size in pixels, used to derive the visible bounding box
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Base map tile URL template with `{z}`, `{x}` and `{y}` placeholders
    #[serde(default = "default_tile_url")]
    pub tile_url: String,

    /// Directory for the saved route and API key, platform data dir when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Override GPS latitude (for devices without GPS)
    #[serde(default)]
    pub override_gps_latitude: Option<f64>,

    /// Override GPS longitude (for devices without GPS)
    #[serde(default)]
    pub override_gps_longitude: Option<f64>,

    /// OpenWeatherMap API key (optional, a key saved from the app takes precedence)
    #[serde(default)]
    pub openweathermap_api_key: Option<String>,

    /// OpenWeatherMap API root, overridable for testing against a local server
    #[serde(default = "default_weather_base_url")]
    pub weather_base_url: String,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_center_latitude() -> f64 {
    51.505
}

fn default_center_longitude() -> f64 {
    -0.09
}

fn default_zoom() -> u8 {
    13
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    800
}

fn default_tile_url() -> String {
    DEFAULT_TILE_URL.to_string()
}

fn default_weather_base_url() -> String {
    DEFAULT_WEATHER_BASE_URL.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            default_latitude: default_center_latitude(),
            default_longitude: default_center_longitude(),
            default_zoom: default_zoom(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            tile_url: default_tile_url(),
            data_dir: None,
            override_gps_latitude: None,
            override_gps_longitude: None,
            openweathermap_api_key: None,
            weather_base_url: default_weather_base_url(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, writing defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Startup viewport built from the configured center, zoom and size
    #[must_use]
    pub fn initial_viewport(&self) -> Viewport {
        Viewport::new(
            LatLon::new(self.default_latitude, self.default_longitude),
            self.default_zoom,
            self.viewport_width,
            self.viewport_height,
        )
    }

    /// Directory holding persisted session state
    #[must_use]
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from(".local/share"))
                .join(APP_NAME)
        })
    }

    /// Configured location override, only when both coordinates are set
    #[must_use]
    pub fn gps_override(&self) -> Option<LatLon> {
        match (self.override_gps_latitude, self.override_gps_longitude) {
            (Some(lat), Some(lon)) => Some(LatLon::new(lat, lon)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"default_zoom": 9}"#).unwrap();
        assert_eq!(config.default_zoom, 9);
        assert_eq!(config.tile_url, DEFAULT_TILE_URL);
        assert_eq!(config.weather_base_url, DEFAULT_WEATHER_BASE_URL);
        assert!(config.openweathermap_api_key.is_none());
    }

    #[test]
    fn test_initial_viewport_is_london() {
        let viewport = AppConfig::default().initial_viewport();
        assert_eq!(viewport, Viewport::default());
    }

    #[test]
    fn test_gps_override_needs_both_coordinates() {
        let mut config = AppConfig {
            override_gps_latitude: Some(47.6),
            ..AppConfig::default()
        };
        assert!(config.gps_override().is_none());

        config.override_gps_longitude = Some(-122.3);
        assert_eq!(config.gps_override(), Some(LatLon::new(47.6, -122.3)));
    }

    #[test]
    fn test_data_dir_override() {
        let config = AppConfig {
            data_dir: Some(PathBuf::from("/tmp/trailmap-test")),
            ..AppConfig::default()
        };
        assert_eq!(config.resolved_data_dir(), PathBuf::from("/tmp/trailmap-test"));
    }
}
