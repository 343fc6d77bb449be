use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::geo::tiles::MAX_TILE_ZOOM;
use crate::geo::GeoPoint;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapstoryConfig {
    pub server: ServerConfig,
    pub map: MapConfig,
    pub geocoder: GeocoderConfig,
    pub tiles: TileConfig,
    pub autocomplete: AutocompleteConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub default_lat: f64,
    pub default_lng: f64,
    pub default_zoom: f64,
    pub reset_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub max_lat: f64,
    pub cluster_radius_px: f64,
    pub cull_margin_px: f64,
    pub wheel_speed: f64,
    pub wheel_speed_coarse: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub dispatch_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TileConfig {
    pub url_template: String,
    pub attribution: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AutocompleteConfig {
    pub min_chars: usize,
    pub debounce_ms: u64,
    pub limit: usize,
}

impl Default for MapstoryConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            map: MapConfig::default(),
            geocoder: GeocoderConfig::default(),
            tiles: TileConfig::default(),
            autocomplete: AutocompleteConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_lat: 51.1657,
            default_lng: 10.4515,
            default_zoom: 6.0,
            reset_zoom: 5.5,
            min_zoom: 2.0,
            max_zoom: 19.0,
            max_lat: 85.0,
            cluster_radius_px: 60.0,
            cull_margin_px: 100.0,
            wheel_speed: 0.002,
            wheel_speed_coarse: 0.01,
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/search".into(),
            user_agent: concat!("mapstory/", env!("CARGO_PKG_VERSION")).into(),
            timeout_secs: 10,
            dispatch_delay_ms: 1000,
        }
    }
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".into(),
            attribution: "© OpenStreetMap contributors".into(),
        }
    }
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            min_chars: 3,
            debounce_ms: 500,
            limit: 5,
        }
    }
}

impl MapConfig {
    /// Center used on mount and by the reset control.
    pub fn default_center(&self) -> GeoPoint {
        GeoPoint::new(self.default_lat, self.default_lng)
    }
}

impl GeocoderConfig {
    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AutocompleteConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Returns `~/.mapstory/`
pub fn default_mapstory_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mapstory")
}

/// Returns the default config file path: `~/.mapstory/config.toml`
pub fn default_config_path() -> PathBuf {
    default_mapstory_dir().join("config.toml")
}

impl MapstoryConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_tilde(&path.as_ref().to_string_lossy());
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            MapstoryConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (MAPSTORY_LOG_LEVEL, MAPSTORY_GEOCODER_URL, MAPSTORY_TILE_URL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MAPSTORY_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("MAPSTORY_GEOCODER_URL") {
            self.geocoder.endpoint = val;
        }
        if let Ok(val) = std::env::var("MAPSTORY_TILE_URL") {
            self.tiles.url_template = val;
        }
    }

    fn validate(&self) -> Result<()> {
        let map = &self.map;
        anyhow::ensure!(
            map.min_zoom >= 0.0 && map.min_zoom <= map.max_zoom,
            "map.min_zoom ({}) must be in [0, max_zoom ({})]",
            map.min_zoom,
            map.max_zoom
        );
        anyhow::ensure!(
            map.max_zoom <= f64::from(MAX_TILE_ZOOM),
            "map.max_zoom ({}) must not exceed {}",
            map.max_zoom,
            MAX_TILE_ZOOM
        );
        anyhow::ensure!(
            map.max_lat > 0.0 && map.max_lat < 90.0,
            "map.max_lat must be in (0, 90), got {}",
            map.max_lat
        );
        anyhow::ensure!(
            map.cluster_radius_px > 0.0,
            "map.cluster_radius_px must be positive"
        );
        anyhow::ensure!(
            self.tiles.url_template.contains("{z}")
                && self.tiles.url_template.contains("{x}")
                && self.tiles.url_template.contains("{y}"),
            "tiles.url_template must contain {{z}}, {{x}} and {{y}}"
        );
        Ok(())
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = MapstoryConfig::default();
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.map.default_zoom, 6.0);
        assert_eq!(config.map.cluster_radius_px, 60.0);
        assert_eq!(config.geocoder.dispatch_delay(), Duration::from_secs(1));
        assert_eq!(config.autocomplete.min_chars, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[server]
log_level = "debug"

[map]
cluster_radius_px = 40.0
default_zoom = 4.0

[geocoder]
dispatch_delay_ms = 1500
"#;
        let config: MapstoryConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.map.cluster_radius_px, 40.0);
        assert_eq!(config.map.default_zoom, 4.0);
        assert_eq!(config.geocoder.dispatch_delay_ms, 1500);
        // defaults still apply for unset fields
        assert_eq!(config.map.max_zoom, 19.0);
        assert_eq!(config.tiles.attribution, "© OpenStreetMap contributors");
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = MapstoryConfig::load_from(tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.map.min_zoom, 2.0);
    }

    #[test]
    fn non_positive_cluster_radius_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[map]\ncluster_radius_px = 0.0\n").unwrap();
        let err = MapstoryConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("cluster_radius_px"));
    }

    #[test]
    fn max_zoom_beyond_tile_range_is_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[map]\nmax_zoom = 64.0\n").unwrap();
        let err = MapstoryConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("max_zoom"));

        let mut config = MapstoryConfig::default();
        config.map.max_zoom = 22.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn tile_template_requires_placeholders() {
        let mut config = MapstoryConfig::default();
        config.tiles.url_template = "https://example.com/tile.png".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("url_template"));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = MapstoryConfig::default();
        std::env::set_var("MAPSTORY_LOG_LEVEL", "trace");
        std::env::set_var("MAPSTORY_GEOCODER_URL", "http://localhost:8080/search");
        std::env::set_var("MAPSTORY_TILE_URL", "http://localhost:8081/{z}/{x}/{y}.png");

        config.apply_env_overrides();

        assert_eq!(config.server.log_level, "trace");
        assert_eq!(config.geocoder.endpoint, "http://localhost:8080/search");
        assert_eq!(config.tiles.url_template, "http://localhost:8081/{z}/{x}/{y}.png");

        // Clean up
        std::env::remove_var("MAPSTORY_LOG_LEVEL");
        std::env::remove_var("MAPSTORY_GEOCODER_URL");
        std::env::remove_var("MAPSTORY_TILE_URL");
    }
}
