//! Spherical Web-Mercator projection between lat/lng and world pixels.

use std::f64::consts::PI;

use super::{GeoPoint, WorldPoint};

/// Side length of one XYZ tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// `sin(lat)` is clamped to this magnitude so the poles stay finite.
const MAX_SIN_LAT: f64 = 0.9999;

/// Side length of the world map in pixels at `zoom` (fractional zooms allowed).
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * 2f64.powf(zoom)
}

/// Project a coordinate to world pixels at `zoom`.
pub fn project(point: GeoPoint, zoom: f64) -> WorldPoint {
    let scale = world_size(zoom);
    let sin_lat = point
        .lat
        .to_radians()
        .sin()
        .clamp(-MAX_SIN_LAT, MAX_SIN_LAT);
    WorldPoint {
        x: scale * (0.5 + point.lng / 360.0),
        y: scale * (0.5 - ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / (4.0 * PI)),
    }
}

/// Inverse of [`project`].
pub fn unproject(point: WorldPoint, zoom: f64) -> GeoPoint {
    let scale = world_size(zoom);
    let lng = (point.x / scale - 0.5) * 360.0;
    let n = PI - 2.0 * PI * (point.y / scale);
    let lat = n.sinh().atan().to_degrees();
    GeoPoint { lat, lng }
}

/// Fold a horizontal world-pixel delta into `[-world/2, world/2]` so that points
/// across the antimeridian are measured along the short way round.
pub fn shortest_dx(dx: f64, zoom: f64) -> f64 {
    let world = world_size(zoom);
    let half = world / 2.0;
    let mut dx = dx;
    if dx > half || dx < -half {
        dx = (dx + half).rem_euclid(world) - half;
    }
    dx
}
