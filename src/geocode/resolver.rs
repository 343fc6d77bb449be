//! Turns memory records into geocoded points.
//!
//! [`GeocodeResolver::locate`] is called on every render pass. It is fully
//! synchronous: names it cannot answer right now are queued for the
//! [`worker`](super::worker) and reported back as unmapped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{watch, Notify};

use super::cache::{normalize, CacheEntry, CoordinateCache};
use super::gazetteer;
use super::scheduler::{Clock, Dispatch, LookupScheduler, TokioClock};
use super::GeocodeError;
use crate::geo::GeoPoint;
use crate::memory::MemoryRef;

/// Resolver shared between the render path and the geocode worker.
///
/// The lock is only ever held for synchronous bookkeeping, never across an await.
pub type SharedResolver = Arc<Mutex<GeocodeResolver>>;

/// A memory with a known coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPoint {
    pub lat: f64,
    pub lng: f64,
    pub memory: Arc<MemoryRef>,
    /// The memory's public location name (never the private address).
    pub display_name: String,
}

impl GeocodedPoint {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// A place name with no coordinate (yet), and the memories waiting on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmappedName {
    pub name: String,
    /// `true` while a lookup is queued or in flight; `false` once it has failed.
    pub pending: bool,
    pub memory_ids: Vec<String>,
}

/// Output of one [`GeocodeResolver::locate`] pass.
#[derive(Debug, Clone, Default)]
pub struct LocatedMemories {
    pub mapped: Vec<GeocodedPoint>,
    pub unmapped: Vec<UnmappedName>,
    /// Cache revision the pass was computed against.
    pub revision: u64,
}

/// Result of resolving a single name synchronously.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Found(GeoPoint),
    /// Queued or in flight.
    Pending,
    /// Looked up before and failed; not retried this session.
    Failed,
}

pub struct GeocodeResolver {
    cache: CoordinateCache,
    scheduler: LookupScheduler,
    clock: Arc<dyn Clock>,
    wake: Arc<Notify>,
    revisions: watch::Sender<u64>,
}

impl GeocodeResolver {
    /// A resolver on tokio's clock with the given minimum spacing between lookups.
    pub fn new(dispatch_delay: Duration) -> Self {
        Self::with_clock(dispatch_delay, Arc::new(TokioClock))
    }

    pub fn with_clock(dispatch_delay: Duration, clock: Arc<dyn Clock>) -> Self {
        let (revisions, _) = watch::channel(0);
        Self {
            cache: CoordinateCache::new(),
            scheduler: LookupScheduler::new(dispatch_delay),
            clock,
            wake: Arc::new(Notify::new()),
            revisions,
        }
    }

    pub fn into_shared(self) -> SharedResolver {
        Arc::new(Mutex::new(self))
    }

    /// Resolve one name: gazetteer, then cache, else queue it.
    pub fn resolve_name(&mut self, name: &str) -> Resolution {
        let name = normalize(name);
        if let Some(point) = gazetteer::lookup(name) {
            return Resolution::Found(point);
        }
        match self.cache.get(name) {
            Some(CacheEntry::Resolved(point)) => Resolution::Found(point),
            Some(CacheEntry::Unresolved) if self.scheduler.is_pending(name) => Resolution::Pending,
            Some(CacheEntry::Unresolved) => Resolution::Failed,
            None => {
                self.cache.mark_unresolved(name);
                self.scheduler.enqueue(name, self.clock.now());
                tracing::debug!(name = %name, "queued for external geocoding");
                self.wake.notify_one();
                Resolution::Pending
            }
        }
    }

    /// Geocode every memory that has an address or location.
    ///
    /// Memories without either are skipped. Unresolvable names never produce
    /// a point; they are listed in [`LocatedMemories::unmapped`] once per name.
    pub fn locate(&mut self, memories: &[Arc<MemoryRef>]) -> LocatedMemories {
        let mut mapped = Vec::new();
        let mut unmapped: Vec<UnmappedName> = Vec::new();
        let mut unmapped_index: HashMap<String, usize> = HashMap::new();

        for memory in memories {
            let Some(query) = memory.query_name() else {
                continue;
            };
            match self.resolve_name(query) {
                Resolution::Found(point) => mapped.push(GeocodedPoint {
                    lat: point.lat,
                    lng: point.lng,
                    memory: Arc::clone(memory),
                    display_name: memory.location.clone(),
                }),
                resolution => {
                    let idx = *unmapped_index.entry(query.to_string()).or_insert_with(|| {
                        unmapped.push(UnmappedName {
                            name: query.to_string(),
                            pending: resolution == Resolution::Pending,
                            memory_ids: Vec::new(),
                        });
                        unmapped.len() - 1
                    });
                    unmapped[idx].memory_ids.push(memory.id.clone());
                }
            }
        }

        LocatedMemories {
            mapped,
            unmapped,
            revision: self.cache.revision(),
        }
    }

    /// Ask the scheduler for the next lookup to run.
    pub fn poll_dispatch(&mut self) -> Dispatch {
        self.scheduler.poll(self.clock.now())
    }

    /// Record the outcome of a lookup started by [`GeocodeResolver::poll_dispatch`].
    ///
    /// Failures and empty results leave the sentinel in place, so the name is
    /// not tried again this session.
    pub fn complete(&mut self, name: &str, outcome: Result<Option<GeoPoint>, GeocodeError>) {
        match outcome {
            Ok(Some(point)) => {
                tracing::info!(name = %name, point = %point, "geocoded");
                self.cache.resolve(name, point);
            }
            Ok(None) => {
                tracing::warn!(name = %name, "geocoding returned no results");
            }
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "geocoding failed");
            }
        }
        self.scheduler.finish(name, self.clock.now());
        self.revisions.send_replace(self.cache.revision());
        self.wake.notify_one();
    }

    /// Give back a lookup whose worker stopped before it could record the
    /// result. The name stays pending for the next worker.
    pub fn abandon(&mut self, name: &str) {
        tracing::debug!(name = %name, "discarding lookup result after teardown");
        self.scheduler.requeue(name, self.clock.now());
        self.wake.notify_one();
    }

    /// Handle the worker waits on for new work.
    pub fn wake_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    /// Subscribe to cache revisions published after each completed lookup.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revisions.subscribe()
    }

    pub fn cache(&self) -> &CoordinateCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &LookupScheduler {
        &self.scheduler
    }

    /// Number of external lookups dispatched this session.
    pub fn lookups_dispatched(&self) -> u64 {
        self.scheduler.dispatched()
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_drained()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::scheduler::ManualClock;
    use tokio::time::Instant;

    const DELAY: Duration = Duration::from_secs(1);

    fn memory(id: &str, location: &str) -> Arc<MemoryRef> {
        Arc::new(MemoryRef {
            id: id.into(),
            title: format!("Memory {id}"),
            author: "me".into(),
            date: None,
            location: location.into(),
            address: None,
            preview_image: None,
            images: vec![],
        })
    }

    fn resolver() -> (GeocodeResolver, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Instant::now()));
        (GeocodeResolver::with_clock(DELAY, clock.clone()), clock)
    }

    #[test]
    fn gazetteer_names_never_hit_the_queue() {
        let (mut r, _) = resolver();
        let located = r.locate(&[memory("1", "Berlin"), memory("2", "München")]);
        assert_eq!(located.mapped.len(), 2);
        assert!(located.unmapped.is_empty());
        assert!(r.is_idle());
        assert!(r.cache().is_empty());
    }

    #[test]
    fn unknown_names_are_unmapped_and_queued_once() {
        let (mut r, _) = resolver();
        let memories = [
            memory("1", "Unknown Village XYZ"),
            memory("2", "Unknown Village XYZ "),
            memory("3", "Berlin"),
        ];
        let located = r.locate(&memories);
        assert_eq!(located.mapped.len(), 1);
        assert_eq!(located.unmapped.len(), 1);
        assert_eq!(located.unmapped[0].memory_ids, vec!["1", "2"]);
        assert!(located.unmapped[0].pending);
        assert_eq!(r.scheduler().pending_len(), 1);

        // A second pass does not queue it again.
        r.locate(&memories);
        assert_eq!(r.scheduler().pending_len(), 1);
    }

    #[test]
    fn successful_lookup_maps_the_memory() {
        let (mut r, clock) = resolver();
        let memories = [memory("1", "Somewhere Small")];
        r.locate(&memories);
        clock.advance(DELAY);
        let Dispatch::Ready(name) = r.poll_dispatch() else {
            panic!("expected a dispatch");
        };
        r.complete(&name, Ok(Some(GeoPoint::new(10.0, 20.0))));

        let located = r.locate(&memories);
        assert_eq!(located.mapped.len(), 1);
        assert_eq!(located.mapped[0].point(), GeoPoint::new(10.0, 20.0));
        assert_eq!(located.mapped[0].display_name, "Somewhere Small");
    }

    #[test]
    fn failed_lookup_is_not_retried() {
        let (mut r, clock) = resolver();
        let memories = [memory("1", "Nowhere")];
        r.locate(&memories);
        clock.advance(DELAY);
        assert_eq!(r.poll_dispatch(), Dispatch::Ready("Nowhere".into()));
        r.complete("Nowhere", Ok(None));

        let located = r.locate(&memories);
        assert!(located.mapped.is_empty());
        assert!(!located.unmapped[0].pending);
        clock.advance(DELAY * 5);
        assert_eq!(r.poll_dispatch(), Dispatch::Idle);
        assert_eq!(r.lookups_dispatched(), 1);
    }

    #[test]
    fn address_is_geocoded_but_location_is_displayed() {
        let (mut r, _) = resolver();
        let m = Arc::new(MemoryRef {
            address: Some("Rathausmarkt 1, Hamburg".into()),
            ..(*memory("1", "Home")).clone()
        });
        let located = r.locate(&[m]);
        assert_eq!(located.mapped[0].point(), GeoPoint::new(53.551, 9.993));
        assert_eq!(located.mapped[0].display_name, "Home");
    }

    #[test]
    fn memories_without_place_are_skipped() {
        let (mut r, _) = resolver();
        let located = r.locate(&[memory("1", "  ")]);
        assert!(located.mapped.is_empty());
        assert!(located.unmapped.is_empty());
    }

    #[test]
    fn abandoned_lookup_stays_pending() {
        let (mut r, clock) = resolver();
        let memories = [memory("1", "Kleindorf")];
        r.locate(&memories);
        clock.advance(DELAY);
        assert_eq!(r.poll_dispatch(), Dispatch::Ready("Kleindorf".into()));

        r.abandon("Kleindorf");
        assert!(r.locate(&memories).unmapped[0].pending);
        clock.advance(DELAY);
        assert_eq!(r.poll_dispatch(), Dispatch::Ready("Kleindorf".into()));
    }
}
