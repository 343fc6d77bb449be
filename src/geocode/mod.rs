//! Place-name geocoding.
//!
//! Names are resolved in three tiers: the built-in [`gazetteer`], the
//! session [`cache`], and finally an external [`GeocodeService`]. External
//! lookups go through a single-slot [`scheduler`] so at most one request is
//! in flight and consecutive dispatches are spaced by a fixed delay.
//!
//! - [`resolver`] — [`GeocodeResolver`], the synchronous front door used by render passes
//! - [`worker`] — async task that drains the scheduler against a service
//! - [`nominatim`] — HTTP client for a Nominatim-compatible search endpoint
//! - [`autocomplete`] — debounced address typeahead sharing the same service

pub mod autocomplete;
pub mod cache;
pub mod gazetteer;
pub mod nominatim;
pub mod resolver;
pub mod scheduler;
pub mod worker;

use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::geo::GeoPoint;

pub use cache::{CacheEntry, CoordinateCache};
pub use resolver::{GeocodeResolver, GeocodedPoint, LocatedMemories, SharedResolver, UnmappedName};
pub use scheduler::{Clock, Dispatch, LookupScheduler, ManualClock, TokioClock};

/// Errors from an external geocoding lookup.
///
/// The map treats every variant the same way (the name stays unmapped), but
/// the distinction is kept for logging and for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("geocoding service returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("invalid coordinate {value:?} in geocoding response")]
    InvalidCoordinate { value: String },
    #[error("invalid geocoder endpoint: {0}")]
    Endpoint(String),
}

/// One candidate returned by the lookup service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<u64>,
}

impl Place {
    /// Parse the string coordinates into a [`GeoPoint`].
    pub fn point(&self) -> Result<GeoPoint, GeocodeError> {
        let lat = parse_coordinate(&self.lat, 90.0)?;
        let lng = parse_coordinate(&self.lon, 180.0)?;
        Ok(GeoPoint::new(lat, lng))
    }
}

fn parse_coordinate(value: &str, bound: f64) -> Result<f64, GeocodeError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= bound)
        .ok_or_else(|| GeocodeError::InvalidCoordinate {
            value: value.to_string(),
        })
}

/// A free-text place search backend.
pub trait GeocodeService: Send + Sync {
    /// Search for `query`, returning at most `limit` candidates, best first.
    fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Place>, GeocodeError>> + Send;
}

/// Resolve `name` to the top candidate's coordinate. `Ok(None)` means no match.
pub async fn lookup_first<S: GeocodeService + ?Sized>(
    service: &S,
    name: &str,
) -> Result<Option<GeoPoint>, GeocodeError> {
    let places = service.search(name, 1).await?;
    places.first().map(Place::point).transpose()
}
