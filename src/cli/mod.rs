pub mod geocode;
pub mod render;
pub mod suggest;
pub mod tiles;

use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

use mapstory::config::MapConfig;
use mapstory::geo::{GeoPoint, ViewportSize};
use mapstory::viewport::{ViewportLimits, ViewportState};

/// Viewport options shared by `render` and `tiles`.
#[derive(Args, Debug, Clone)]
pub struct ViewArgs {
    /// Viewport width in pixels
    #[arg(long, default_value_t = 800.0)]
    pub width: f64,
    /// Viewport height in pixels
    #[arg(long, default_value_t = 600.0)]
    pub height: f64,
    /// Center latitude (defaults to map.default_lat)
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,
    /// Center longitude (defaults to map.default_lng)
    #[arg(long, allow_hyphen_values = true)]
    pub lng: Option<f64>,
    /// Zoom level (defaults to map.default_zoom)
    #[arg(long)]
    pub zoom: Option<f64>,
}

impl ViewArgs {
    pub fn size(&self) -> ViewportSize {
        ViewportSize::new(self.width, self.height)
    }

    /// Center and zoom, falling back to the configured default view.
    pub fn view(&self, map: &MapConfig) -> (GeoPoint, f64) {
        let center = GeoPoint::new(
            self.lat.unwrap_or(map.default_lat),
            self.lng.unwrap_or(map.default_lng),
        );
        (center, self.zoom.unwrap_or(map.default_zoom))
    }

    /// The requested view clamped the same way the map clamps it.
    pub fn clamped_view(&self, map: &MapConfig) -> ViewportState {
        let (center, zoom) = self.view(map);
        ViewportLimits::from(map).clamp(ViewportState { center, zoom })
    }
}

/// Spinner on stderr for work of unknown length.
pub fn spinner(message: impl Into<String>) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("  {spinner} {msg} ({elapsed})")?);
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Pretty-print `value` as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(lat: f64, lng: f64, zoom: f64) -> ViewArgs {
        ViewArgs {
            width: 800.0,
            height: 600.0,
            lat: Some(lat),
            lng: Some(lng),
            zoom: Some(zoom),
        }
    }

    #[test]
    fn clamped_view_caps_latitude_at_the_map_limit() {
        let map = MapConfig {
            max_lat: 89.0,
            ..MapConfig::default()
        };
        let view = args(88.0, 190.0, 30.0).clamped_view(&map);
        assert_eq!(view.center.lat, 85.0);
        assert!((view.center.lng + 170.0).abs() < 1e-9);
        assert_eq!(view.zoom, map.max_zoom);
    }
}
