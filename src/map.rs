//! The interactive map session.
//!
//! [`MapContext`] is created by the host and owns everything that lives for
//! the session: config, the coordinate cache behind the resolver, and the
//! liveness token the geocode worker watches. Maps mount into a context and
//! the token is cleared when the last one unmounts; the next
//! [`MapContext::spawn_worker`] issues a fresh token, so a remounted map
//! resumes lookups against the same cache. [`InteractiveMap`] is the view
//! itself. It holds the viewport, the current memories and the selection,
//! and turns them into a [`Frame`] on every [`InteractiveMap::render`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::cluster::{cluster_points, Cluster, ClusterKey, ClusterParams, Selection};
use crate::config::MapstoryConfig;
use crate::geo::{GeoPoint, ScreenPoint, ViewportSize};
use crate::geocode::worker::{self, WorkerHandle};
use crate::geocode::{GeocodeResolver, GeocodeService, SharedResolver};
use crate::memory::{MemoryRef, MemorySource};
use crate::render::{tile_layers, Attribution, Frame, FrameDiff, KeyedLayer, MarkerView, PopupView, TileView};
use crate::viewport::{HitTarget, PointerInput, ViewportChange, ViewportController, ViewportState};

/// Pin hit box, relative to the bottom-center anchor.
const MARKER_HALF_WIDTH: f64 = 24.0;
const MARKER_HEIGHT: f64 = 56.0;

pub struct MapContext {
    config: MapstoryConfig,
    resolver: SharedResolver,
    alive: Mutex<Arc<AtomicBool>>,
    mounted: AtomicUsize,
}

impl MapContext {
    pub fn new(config: MapstoryConfig) -> Self {
        let resolver = GeocodeResolver::new(config.geocoder.dispatch_delay());
        Self::with_resolver(config, resolver)
    }

    /// Use a pre-built resolver (e.g. one on a manual clock).
    pub fn with_resolver(config: MapstoryConfig, resolver: GeocodeResolver) -> Self {
        Self {
            config,
            resolver: resolver.into_shared(),
            alive: Mutex::new(Arc::new(AtomicBool::new(true))),
            mounted: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &MapstoryConfig {
        &self.config
    }

    pub fn resolver(&self) -> &SharedResolver {
        &self.resolver
    }

    /// Run `f` with the resolver locked. The lock is released before returning.
    pub fn with_resolver_mut<R>(&self, f: impl FnOnce(&mut GeocodeResolver) -> R) -> R {
        match self.resolver.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// Start draining queued lookups against `service` on the current runtime.
    ///
    /// After a teardown this re-arms the session with a fresh token; workers
    /// still holding the old one keep stopping.
    pub fn spawn_worker<S: GeocodeService + 'static>(&self, service: Arc<S>) -> WorkerHandle {
        let token = {
            let mut current = self.alive.lock().unwrap_or_else(|e| e.into_inner());
            if !current.load(Ordering::Acquire) {
                tracing::debug!("map session re-armed");
                *current = Arc::new(AtomicBool::new(true));
            }
            Arc::clone(&*current)
        };
        worker::spawn(Arc::clone(&self.resolver), service, token)
    }

    /// Cache revisions, bumped after each completed lookup.
    pub fn subscribe_revisions(&self) -> watch::Receiver<u64> {
        self.with_resolver_mut(|r| r.subscribe())
    }

    pub fn is_alive(&self) -> bool {
        self.token().load(Ordering::Acquire)
    }

    /// Maps currently mounted on this context.
    pub fn mounted(&self) -> usize {
        self.mounted.load(Ordering::Acquire)
    }

    /// Stop scheduling lookups. Results still in flight are discarded and
    /// their names stay queued for the next worker.
    pub fn teardown(&self) {
        if self.token().swap(false, Ordering::AcqRel) {
            tracing::debug!("map session torn down");
            self.with_resolver_mut(|r| r.wake_handle()).notify_one();
        }
    }

    fn token(&self) -> Arc<AtomicBool> {
        Arc::clone(&*self.alive.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn mount(&self) {
        self.mounted.fetch_add(1, Ordering::AcqRel);
    }

    /// Tear down once the last mounted map is gone.
    fn unmount(&self) {
        if self.mounted.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.teardown();
        }
    }
}

/// Called with the memory the user opened from a popup.
pub type NavigateFn = Box<dyn FnMut(&MemoryRef) + Send>;

/// Inputs the last cluster pass was computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClusterInputs {
    memories_generation: u64,
    cache_revision: u64,
    view: ViewportState,
    size: ViewportSize,
}

pub struct InteractiveMap {
    context: Arc<MapContext>,
    viewport: ViewportController,
    size: ViewportSize,
    params: ClusterParams,
    tile_template: String,
    memories: Vec<Arc<MemoryRef>>,
    memories_generation: u64,
    selection: Selection,
    clusters: Vec<Cluster>,
    cluster_inputs: Option<ClusterInputs>,
    fallback_layer: KeyedLayer<TileView>,
    primary_layer: KeyedLayer<TileView>,
    marker_layer: KeyedLayer<MarkerView>,
    on_navigate: Option<NavigateFn>,
}

impl InteractiveMap {
    pub fn new(context: Arc<MapContext>) -> Self {
        context.mount();
        let config = context.config();
        let viewport = ViewportController::new(&config.map);
        let params = ClusterParams::from(&config.map);
        let tile_template = config.tiles.url_template.clone();
        Self {
            context,
            viewport,
            size: ViewportSize::default(),
            params,
            tile_template,
            memories: Vec::new(),
            memories_generation: 0,
            selection: Selection::default(),
            clusters: Vec::new(),
            cluster_inputs: None,
            fallback_layer: KeyedLayer::new(),
            primary_layer: KeyedLayer::new(),
            marker_layer: KeyedLayer::new(),
            on_navigate: None,
        }
    }

    pub fn on_navigate(mut self, f: impl FnMut(&MemoryRef) + Send + 'static) -> Self {
        self.on_navigate = Some(Box::new(f));
        self
    }

    pub fn context(&self) -> &Arc<MapContext> {
        &self.context
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn size(&self) -> ViewportSize {
        self.size
    }

    pub fn set_memories(&mut self, memories: Vec<MemoryRef>) {
        self.memories = memories.into_iter().map(Arc::new).collect();
        self.memories_generation += 1;
        tracing::debug!(count = self.memories.len(), "memories updated");
    }

    /// Subscribe to `source` and load its current list. Keep the receiver and
    /// pass it to [`InteractiveMap::sync_memories`] to pick up later changes.
    pub fn follow(&mut self, source: &impl MemorySource) -> watch::Receiver<Vec<MemoryRef>> {
        let mut rx = source.subscribe();
        let memories = rx.borrow_and_update().clone();
        self.set_memories(memories);
        rx
    }

    /// Pull the latest list from a source subscription if it changed.
    pub fn sync_memories(&mut self, source: &mut watch::Receiver<Vec<MemoryRef>>) -> bool {
        match source.has_changed() {
            Ok(true) => {
                let memories = source.borrow_and_update().clone();
                self.set_memories(memories);
                true
            }
            Ok(false) => false,
            Err(_) => {
                tracing::debug!("memory source closed");
                false
            }
        }
    }

    pub fn resize(&mut self, size: ViewportSize) {
        self.size = size;
    }

    pub fn handle_input(&mut self, input: &PointerInput) -> ViewportChange {
        self.viewport.handle(input)
    }

    pub fn zoom_in(&mut self) -> ViewportChange {
        self.viewport.zoom_in()
    }

    pub fn zoom_out(&mut self) -> ViewportChange {
        self.viewport.zoom_out()
    }

    pub fn reset_view(&mut self) -> ViewportChange {
        self.viewport.reset()
    }

    pub fn set_view(&mut self, center: GeoPoint, zoom: f64) -> ViewportChange {
        self.viewport.set_view(center, zoom)
    }

    /// Topmost marker whose pin covers `pos`, from the last render.
    pub fn marker_at(&self, pos: ScreenPoint) -> Option<&ClusterKey> {
        self.marker_layer
            .items()
            .iter()
            .rev()
            .find(|m| {
                (pos.x - m.x).abs() <= MARKER_HALF_WIDTH && pos.y <= m.y && pos.y >= m.y - MARKER_HEIGHT
            })
            .map(|m| &m.key)
    }

    /// Classify `pos` for gesture handling. The host reports popup hits itself
    /// via `over_popup`, since only it knows where the popup was laid out.
    pub fn hit_test(&self, pos: ScreenPoint, over_popup: bool) -> HitTarget {
        if over_popup {
            HitTarget::Popup
        } else if self.marker_at(pos).is_some() {
            HitTarget::Marker
        } else {
            HitTarget::Map
        }
    }

    pub fn select(&mut self, key: ClusterKey) {
        tracing::debug!(key = %key, "cluster selected");
        self.selection.select(key);
    }

    /// A click that hit bare map clears the selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selection(&self) -> Option<&ClusterKey> {
        self.selection.key()
    }

    /// Open a memory from the popup. Returns `false` if it is not in the
    /// selected cluster.
    pub fn activate(&mut self, memory_id: &str) -> bool {
        let Some(key) = self.selection.key() else {
            return false;
        };
        let memory = self
            .clusters
            .iter()
            .find(|c| &c.key == key)
            .and_then(|c| c.memories.iter().find(|m| m.id == memory_id))
            .cloned();
        match (memory, self.on_navigate.as_mut()) {
            (Some(memory), Some(navigate)) => {
                tracing::info!(memory_id = %memory.id, "navigating to memory");
                navigate(&memory);
                true
            }
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Compute the current frame.
    ///
    /// Geocoding state is read from a fresh resolver snapshot each pass; the
    /// lock is not held past this call.
    pub fn render(&mut self) -> Frame {
        let view = self.viewport.state();
        let located = self.context.with_resolver_mut(|r| r.locate(&self.memories));

        let inputs = ClusterInputs {
            memories_generation: self.memories_generation,
            cache_revision: located.revision,
            view,
            size: self.size,
        };
        if self.cluster_inputs != Some(inputs) {
            self.clusters = cluster_points(&located.mapped, &view, self.size, &self.params);
            self.cluster_inputs = Some(inputs);
        }

        let popup = self.selection.reconcile(&self.clusters).map(PopupView::from_cluster);
        let markers: Vec<MarkerView> = self
            .clusters
            .iter()
            .map(|c| MarkerView::from_cluster(c, self.selection.is_selected(c)))
            .collect();
        let (fallback, primary) = tile_layers(&view, self.size, &self.tile_template);

        let diff = FrameDiff {
            fallback_tiles: self.fallback_layer.update(fallback),
            primary_tiles: self.primary_layer.update(primary),
            markers: self.marker_layer.update(markers),
        };

        Frame {
            view,
            size: self.size,
            preview_offset: self.viewport.preview_offset(),
            fallback_tiles: self.fallback_layer.items().to_vec(),
            primary_tiles: self.primary_layer.items().to_vec(),
            markers: self.marker_layer.items().to_vec(),
            popup,
            attribution: Attribution::from(&self.context.config().tiles),
            unmapped: located.unmapped,
            diff,
        }
    }
}

impl Drop for InteractiveMap {
    fn drop(&mut self) {
        self.context.unmount();
    }
}
