//! Viewport state and the controller that applies gestures to it.
//!
//! A drag only moves a preview offset; the committed center changes once,
//! on release. Zoom changes (wheel, pinch, buttons) commit immediately.
//! Committed states are published on a `watch` channel for the renderer.

pub mod gesture;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::MapConfig;
use crate::geo::{GeoPoint, ScreenPoint, MAX_CENTER_LAT};

pub use gesture::{Effect, GestureState, HitTarget, PointerInput, PointerSource};

/// Committed center and fractional zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub center: GeoPoint,
    pub zoom: f64,
}

/// Bounds and speeds applied by the gesture machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportLimits {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub max_lat: f64,
    pub wheel_speed: f64,
    pub wheel_speed_coarse: f64,
}

impl Default for ViewportLimits {
    fn default() -> Self {
        Self::from(&MapConfig::default())
    }
}

impl From<&MapConfig> for ViewportLimits {
    fn from(config: &MapConfig) -> Self {
        Self {
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            max_lat: config.max_lat.min(MAX_CENTER_LAT),
            wheel_speed: config.wheel_speed,
            wheel_speed_coarse: config.wheel_speed_coarse,
        }
    }
}

impl ViewportLimits {
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    pub fn clamp(&self, state: ViewportState) -> ViewportState {
        ViewportState {
            center: state.center.normalized(self.max_lat),
            zoom: self.clamp_zoom(state.zoom),
        }
    }
}

/// What the renderer should do after an input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportChange {
    /// Nothing visible changed.
    None,
    /// Translate the existing layers by this offset; do not recompute.
    Preview(ScreenPoint),
    /// The committed view changed; recompute tiles and clusters.
    Committed(ViewportState),
}

/// Owns the committed view, the gesture state and the preview offset.
#[derive(Debug)]
pub struct ViewportController {
    limits: ViewportLimits,
    home: ViewportState,
    gesture: GestureState,
    preview: ScreenPoint,
    state: watch::Sender<ViewportState>,
}

impl ViewportController {
    /// Start at the configured default view. Reset returns to the same center
    /// at the configured reset zoom.
    pub fn new(config: &MapConfig) -> Self {
        let limits = ViewportLimits::from(config);
        let initial = limits.clamp(ViewportState {
            center: config.default_center(),
            zoom: config.default_zoom,
        });
        let home = limits.clamp(ViewportState {
            center: config.default_center(),
            zoom: config.reset_zoom,
        });
        let (state, _) = watch::channel(initial);
        Self {
            limits,
            home,
            gesture: GestureState::Idle,
            preview: ScreenPoint::default(),
            state,
        }
    }

    pub fn state(&self) -> ViewportState {
        *self.state.borrow()
    }

    pub fn limits(&self) -> &ViewportLimits {
        &self.limits
    }

    pub fn gesture(&self) -> &GestureState {
        &self.gesture
    }

    /// Offset the map layers are currently translated by (non-zero only mid-drag).
    pub fn preview_offset(&self) -> ScreenPoint {
        self.preview
    }

    /// Whether window-level move/up listeners should be attached right now.
    pub fn needs_global_listeners(&self) -> bool {
        self.gesture.needs_global_listeners()
    }

    /// Receive every committed view.
    pub fn subscribe(&self) -> watch::Receiver<ViewportState> {
        self.state.subscribe()
    }

    /// Feed one pointer event through the gesture machine.
    pub fn handle(&mut self, input: &PointerInput) -> ViewportChange {
        let view = self.state();
        let (next, effect) = gesture::transition(&self.gesture, &view, &self.limits, input);
        if next != self.gesture {
            tracing::trace!(from = ?self.gesture, to = ?next, "gesture transition");
        }
        self.gesture = next;
        self.apply(effect)
    }

    pub fn zoom_in(&mut self) -> ViewportChange {
        let zoom = self.state().zoom + 1.0;
        self.set_zoom(zoom)
    }

    pub fn zoom_out(&mut self) -> ViewportChange {
        let zoom = self.state().zoom - 1.0;
        self.set_zoom(zoom)
    }

    /// Back to the home view, abandoning any gesture.
    pub fn reset(&mut self) -> ViewportChange {
        self.gesture = GestureState::Idle;
        self.preview = ScreenPoint::default();
        self.commit(self.home)
    }

    /// Jump to a view, clamped to the limits.
    pub fn set_view(&mut self, center: GeoPoint, zoom: f64) -> ViewportChange {
        self.commit(ViewportState { center, zoom })
    }

    pub fn set_zoom(&mut self, zoom: f64) -> ViewportChange {
        if !zoom.is_finite() {
            return ViewportChange::None;
        }
        let view = self.state();
        self.commit(ViewportState { center: view.center, zoom })
    }

    fn apply(&mut self, effect: Effect) -> ViewportChange {
        match effect {
            Effect::None => ViewportChange::None,
            Effect::Preview(offset) => {
                self.preview = offset;
                ViewportChange::Preview(offset)
            }
            Effect::ClearPreview => {
                if self.preview.is_zero() {
                    return ViewportChange::None;
                }
                self.preview = ScreenPoint::default();
                ViewportChange::Preview(self.preview)
            }
            Effect::Commit(center) => {
                self.preview = ScreenPoint::default();
                let zoom = self.state().zoom;
                self.commit(ViewportState { center, zoom })
            }
            Effect::Zoom(zoom) => self.set_zoom(zoom),
        }
    }

    fn commit(&mut self, target: ViewportState) -> ViewportChange {
        if !target.center.is_finite() || !target.zoom.is_finite() {
            tracing::warn!(?target, "ignoring non-finite viewport");
            return ViewportChange::None;
        }
        let next = self.limits.clamp(target);
        if next == self.state() {
            return ViewportChange::None;
        }
        tracing::debug!(center = %next.center, zoom = next.zoom, "viewport committed");
        self.state.send_replace(next);
        ViewportChange::Committed(next)
    }
}
