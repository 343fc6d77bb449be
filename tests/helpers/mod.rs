#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mapstory::config::MapstoryConfig;
use mapstory::geo::ViewportSize;
use mapstory::geocode::{GeocodeError, GeocodeService, GeocodedPoint, Place};
use mapstory::memory::types::parse_date;
use mapstory::memory::MemoryRef;
use mapstory::{InteractiveMap, MapContext};
use tokio::time::Instant;

/// A memory at `location` with no date and no images.
pub fn memory(id: &str, location: &str) -> MemoryRef {
    MemoryRef {
        id: id.into(),
        title: format!("Memory {id}"),
        author: "tester".into(),
        date: None,
        location: location.into(),
        address: None,
        preview_image: None,
        images: vec![],
    }
}

pub fn dated_memory(id: &str, location: &str, date: &str) -> MemoryRef {
    MemoryRef {
        date: parse_date(date),
        ..memory(id, location)
    }
}

/// A geocoded point for feeding the clustering engine directly.
pub fn point(id: &str, lat: f64, lng: f64) -> GeocodedPoint {
    GeocodedPoint {
        lat,
        lng,
        memory: Arc::new(memory(id, &format!("Place {id}"))),
        display_name: format!("Place {id}"),
    }
}

/// An 800×600 map on the default config, using tokio's clock.
pub fn test_map() -> InteractiveMap {
    let context = Arc::new(MapContext::new(MapstoryConfig::default()));
    let mut map = InteractiveMap::new(context);
    map.resize(ViewportSize::new(800.0, 600.0));
    map
}

#[derive(Debug, Clone, Copy)]
pub enum StubReply {
    Found(f64, f64),
    Empty,
    Fail,
}

/// In-process geocoding backend that records every request.
///
/// Unknown queries get [`StubReply::Empty`]. Each call takes `latency` of
/// (virtual) time.
pub struct StubGeocoder {
    replies: Mutex<HashMap<String, StubReply>>,
    latency: Duration,
    calls: Mutex<Vec<(String, Instant)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubGeocoder {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            replies: Mutex::new(HashMap::new()),
            latency,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn reply(self, query: &str, reply: StubReply) -> Self {
        self.replies.lock().unwrap().insert(query.into(), reply);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(q, _)| q.clone()).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl GeocodeService for StubGeocoder {
    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<Place>, GeocodeError> {
        self.calls.lock().unwrap().push((query.to_string(), Instant::now()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(query)
            .copied()
            .unwrap_or(StubReply::Empty);
        match reply {
            StubReply::Found(lat, lng) => Ok(vec![Place {
                lat: lat.to_string(),
                lon: lng.to_string(),
                display_name: query.to_string(),
                place_id: None,
            }]),
            StubReply::Empty => Ok(vec![]),
            StubReply::Fail => Err(GeocodeError::Status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            )),
        }
    }
}

/// Let spawned tasks run to their next await point without advancing time much.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
