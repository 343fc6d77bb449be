//! XYZ tile coverage for a viewport.
//!
//! Tiles are always fetched at an integer zoom and scaled to the current
//! (possibly fractional) zoom. The primary layer uses `floor(zoom)` so tiles
//! are only ever magnified, and a fallback layer one level coarser sits
//! underneath to cover tiles that are still loading.

use serde::Serialize;

use super::projection::{project, TILE_SIZE};
use super::{GeoPoint, ViewportSize};

/// Deepest zoom any XYZ tile server publishes.
pub const MAX_TILE_ZOOM: i32 = 22;

/// One tile placed in screen space.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileDescriptor {
    pub zoom_level: u32,
    /// Column wrapped into `[0, 2^zoom)`; the address sent to the tile server.
    pub tile_x: u32,
    pub tile_y: u32,
    /// Unwrapped column; distinguishes repeated copies of the world.
    pub column: i64,
    pub pixel_left: f64,
    pub pixel_top: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl TileDescriptor {
    /// Stable identity for memoization: zoom, unwrapped column and row.
    pub fn key(&self) -> String {
        format!("{}-{}-{}", self.zoom_level, self.column, self.tile_y)
    }

    /// Fill `{z}`, `{x}` and `{y}` in a slippy-map URL template.
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{z}", &self.zoom_level.to_string())
            .replace("{x}", &self.tile_x.to_string())
            .replace("{y}", &self.tile_y.to_string())
    }
}

/// Integer zoom used for the primary tile layer at a fractional `zoom`.
pub fn primary_tile_zoom(zoom: f64) -> i32 {
    zoom.floor().max(0.0) as i32
}

/// Integer zoom of the fallback layer, or `None` when the primary is already level 0.
pub fn fallback_tile_zoom(zoom: f64) -> Option<i32> {
    let z = primary_tile_zoom(zoom) - 1;
    (z >= 0).then_some(z)
}

/// Tiles at `tile_zoom` covering a viewport centered on `center` at `zoom`,
/// with a one-tile margin on each side. Rows outside the world are skipped;
/// columns wrap.
pub fn tiles_for_zoom(
    center: GeoPoint,
    zoom: f64,
    size: ViewportSize,
    tile_zoom: i32,
) -> Vec<TileDescriptor> {
    if size.is_empty() || !(0..=MAX_TILE_ZOOM).contains(&tile_zoom) {
        return Vec::new();
    }

    let scale = 2f64.powf(zoom - tile_zoom as f64);
    let center_px = project(center, tile_zoom as f64);

    let half_w = size.width / 2.0 / scale;
    let half_h = size.height / 2.0 / scale;
    let view_left = center_px.x - half_w;
    let view_top = center_px.y - half_h;
    let view_right = center_px.x + half_w;
    let view_bottom = center_px.y + half_h;

    let min_x = (view_left / TILE_SIZE).floor() as i64 - 1;
    let max_x = (view_right / TILE_SIZE).floor() as i64 + 1;
    let min_y = (view_top / TILE_SIZE).floor() as i64 - 1;
    let max_y = (view_bottom / TILE_SIZE).floor() as i64 + 1;
    let tile_count = 1i64 << tile_zoom;
    let side = (TILE_SIZE * scale).ceil();

    let mut tiles = Vec::new();
    for x in min_x..=max_x {
        for y in min_y..=max_y {
            if y < 0 || y >= tile_count {
                continue;
            }
            tiles.push(TileDescriptor {
                zoom_level: tile_zoom as u32,
                tile_x: x.rem_euclid(tile_count) as u32,
                tile_y: y as u32,
                column: x,
                pixel_left: (x as f64 * TILE_SIZE - view_left) * scale,
                pixel_top: (y as f64 * TILE_SIZE - view_top) * scale,
                pixel_width: side,
                pixel_height: side,
            });
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

    #[test]
    fn primary_zoom_is_floor() {
        assert_eq!(primary_tile_zoom(6.0), 6);
        assert_eq!(primary_tile_zoom(6.99), 6);
        assert_eq!(fallback_tile_zoom(6.5), Some(5));
        assert_eq!(fallback_tile_zoom(0.5), None);
    }

    #[test]
    fn rows_stay_inside_world() {
        // Zoom 2 has only four rows; a tall viewport would otherwise request y=-1 and y=4.
        let tiles = tiles_for_zoom(GeoPoint::new(0.0, 0.0), 2.0, ViewportSize::new(800.0, 2000.0), 2);
        assert!(!tiles.is_empty());
        assert!(tiles.iter().all(|t| t.tile_y < 4));
    }

    #[test]
    fn columns_wrap_across_antimeridian() {
        let tiles = tiles_for_zoom(GeoPoint::new(0.0, 179.0), 3.0, ViewportSize::new(800.0, 600.0), 3);
        assert!(tiles.iter().any(|t| t.column >= 8 && t.tile_x < 8));
        assert!(tiles.iter().all(|t| t.tile_x < 8));
    }

    #[test]
    fn fractional_zoom_magnifies_tiles() {
        let tiles = tiles_for_zoom(GeoPoint::new(48.0, 11.0), 6.5, ViewportSize::new(400.0, 300.0), 6);
        let expected = (TILE_SIZE * 2f64.powf(0.5)).ceil();
        assert!(tiles.iter().all(|t| t.pixel_width == expected));
    }

    #[test]
    fn center_tile_covers_viewport_center() {
        let size = ViewportSize::new(512.0, 512.0);
        let tiles = tiles_for_zoom(GeoPoint::new(52.52, 13.405), 8.0, size, 8);
        let covering: Vec<_> = tiles
            .iter()
            .filter(|t| {
                t.pixel_left <= 256.0
                    && t.pixel_left + t.pixel_width > 256.0
                    && t.pixel_top <= 256.0
                    && t.pixel_top + t.pixel_height > 256.0
            })
            .collect();
        assert_eq!(covering.len(), 1);
        assert_eq!((covering[0].tile_x, covering[0].tile_y), (137, 83));
    }

    #[test]
    fn url_and_key_format() {
        let tile = TileDescriptor {
            zoom_level: 3,
            tile_x: 0,
            tile_y: 2,
            column: 8,
            pixel_left: 0.0,
            pixel_top: 0.0,
            pixel_width: 256.0,
            pixel_height: 256.0,
        };
        assert_eq!(tile.url(TEMPLATE), "https://tile.openstreetmap.org/3/0/2.png");
        assert_eq!(tile.key(), "3-8-2");
    }

    #[test]
    fn empty_viewport_has_no_tiles() {
        let tiles = tiles_for_zoom(GeoPoint::new(0.0, 0.0), 4.0, ViewportSize::default(), 4);
        assert!(tiles.is_empty());
    }

    #[test]
    fn zoom_beyond_tile_range_has_no_tiles() {
        let size = ViewportSize::new(800.0, 600.0);
        assert!(tiles_for_zoom(GeoPoint::new(0.0, 0.0), 63.5, size, 63).is_empty());
        assert!(!tiles_for_zoom(GeoPoint::new(0.0, 0.0), 22.0, size, MAX_TILE_ZOOM).is_empty());
    }
}
