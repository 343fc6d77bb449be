//! Geographic primitives and Web-Mercator math.
//!
//! [`GeoPoint`] is the lat/lng value type shared by every other module.
//! [`projection`] maps it to and from world pixels, [`tiles`] derives the
//! XYZ tile set covering a viewport.

pub mod projection;
pub mod tiles;

use serde::{Deserialize, Serialize};

pub use projection::{project, unproject, world_size, TILE_SIZE};

/// Latitude bound for committed viewport centers (Mercator pole guard).
pub const MAX_CENTER_LAT: f64 = 85.0;

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Clamp latitude to `[-max_lat, max_lat]` and wrap longitude into `[-180, 180]`.
    pub fn normalized(self, max_lat: f64) -> Self {
        Self {
            lat: self.lat.clamp(-max_lat, max_lat),
            lng: wrap_lng(self.lng),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// Wrap a longitude into `[-180, 180]`. Values already in range are returned unchanged.
pub fn wrap_lng(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lng > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// A position in world pixel space at some zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Re-express this point at another zoom level. World space scales linearly
    /// with `2^zoom`, so no trigonometry is needed.
    pub fn rescale(self, from_zoom: f64, to_zoom: f64) -> Self {
        let factor = 2f64.powf(to_zoom - from_zoom);
        Self::new(self.x * factor, self.y * factor)
    }
}

/// A position in viewport (screen) pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &ScreenPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl std::ops::Sub for ScreenPoint {
    type Output = ScreenPoint;

    fn sub(self, rhs: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Viewport dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// A zero-width viewport has not been laid out yet; nothing is drawn.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}
