//! Gesture state machine for pan and pinch.
//!
//! [`transition`] is a pure function from (state, view, input) to the next
//! state plus one [`Effect`]. The controller applies effects; nothing here
//! mutates the view.

use crate::geo::{project, unproject, GeoPoint, ScreenPoint, WorldPoint};

use super::{ViewportLimits, ViewportState};

/// What was under the pointer when an input started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HitTarget {
    #[default]
    Map,
    /// A marker handles its own clicks; pressing on it never starts a pan.
    Marker,
    /// The popup overlay is an exclusion zone for pan, pinch and wheel.
    Popup,
}

impl HitTarget {
    fn blocks_gestures(self) -> bool {
        !matches!(self, HitTarget::Map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSource {
    Mouse,
    Touch,
}

/// Raw input from the host's event system, in viewport pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerInput {
    MouseDown { pos: ScreenPoint, target: HitTarget },
    MouseMove { pos: ScreenPoint },
    MouseUp { pos: ScreenPoint },
    /// `touches` lists every finger currently on the surface.
    TouchStart { touches: Vec<ScreenPoint>, target: HitTarget },
    TouchMove { touches: Vec<ScreenPoint>, target: HitTarget },
    /// `touches` lists the fingers still down after the release.
    TouchEnd { touches: Vec<ScreenPoint> },
    /// `coarse` is the modifier key (ctrl / trackpad pinch).
    Wheel { delta_y: f64, coarse: bool, target: HitTarget },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging {
        source: PointerSource,
        start: ScreenPoint,
        /// Viewport center in world pixels at `start_zoom` when the drag began.
        start_center_px: WorldPoint,
        start_zoom: f64,
        /// Latest pointer displacement, shown as a transform until release.
        offset: ScreenPoint,
    },
    Pinching {
        initial_distance: f64,
        initial_zoom: f64,
    },
}

impl GestureState {
    /// Window-level move/up listeners are only needed during a mouse drag;
    /// touch events keep targeting the element that received touchstart.
    pub fn needs_global_listeners(&self) -> bool {
        matches!(
            self,
            GestureState::Dragging {
                source: PointerSource::Mouse,
                ..
            }
        )
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, GestureState::Idle)
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    None,
    /// Translate the map layer by this offset without re-rendering.
    Preview(ScreenPoint),
    /// Drop any preview transform.
    ClearPreview,
    /// Drop the preview and move the center.
    Commit(GeoPoint),
    /// Set the (already clamped) zoom.
    Zoom(f64),
}

/// Compute the next gesture state and effect for `input`.
pub fn transition(
    state: &GestureState,
    view: &ViewportState,
    limits: &ViewportLimits,
    input: &PointerInput,
) -> (GestureState, Effect) {
    use PointerInput::*;

    match (state, input) {
        (_, MouseDown { target, .. }) if target.blocks_gestures() => (*state, Effect::None),
        (GestureState::Idle, MouseDown { pos, .. }) => (start_drag(PointerSource::Mouse, *pos, view), Effect::None),

        (GestureState::Dragging { source: PointerSource::Mouse, start, .. }, MouseMove { pos }) => {
            let offset = *pos - *start;
            (with_offset(state, offset), Effect::Preview(offset))
        }
        (GestureState::Dragging { source: PointerSource::Mouse, start, .. }, MouseUp { pos }) => {
            let offset = *pos - *start;
            finish_drag(&with_offset(state, offset), view, limits)
        }

        (_, TouchStart { target, .. }) if target.blocks_gestures() => (*state, Effect::None),
        (_, TouchStart { touches, .. }) if touches.len() >= 2 => {
            let pinch = GestureState::Pinching {
                initial_distance: touches[0].distance_to(&touches[1]),
                initial_zoom: view.zoom,
            };
            let effect = if matches!(state, GestureState::Dragging { .. }) {
                Effect::ClearPreview
            } else {
                Effect::None
            };
            (pinch, effect)
        }
        (_, TouchStart { touches, .. }) if touches.len() == 1 => {
            let effect = if matches!(state, GestureState::Dragging { .. }) {
                Effect::ClearPreview
            } else {
                Effect::None
            };
            (start_drag(PointerSource::Touch, touches[0], view), effect)
        }

        (_, TouchMove { target: HitTarget::Popup, .. }) => (*state, Effect::None),
        (GestureState::Dragging { source: PointerSource::Touch, start, .. }, TouchMove { touches, .. })
            if touches.len() == 1 =>
        {
            let offset = touches[0] - *start;
            (with_offset(state, offset), Effect::Preview(offset))
        }
        (
            GestureState::Pinching {
                initial_distance,
                initial_zoom,
            },
            TouchMove { touches, .. },
        ) if touches.len() == 2 => {
            let distance = touches[0].distance_to(&touches[1]);
            match pinch_zoom(*initial_distance, *initial_zoom, distance, limits) {
                Some(zoom) => (*state, Effect::Zoom(zoom)),
                None => (*state, Effect::None),
            }
        }

        (GestureState::Dragging { source: PointerSource::Touch, .. }, TouchEnd { touches }) if touches.is_empty() => {
            finish_drag(state, view, limits)
        }
        (GestureState::Pinching { .. }, TouchEnd { touches }) if touches.len() < 2 => {
            (GestureState::Idle, Effect::None)
        }

        (_, Wheel { target, .. }) if target.blocks_gestures() => (*state, Effect::None),
        (_, Wheel { delta_y, coarse, .. }) => {
            let speed = if *coarse {
                limits.wheel_speed_coarse
            } else {
                limits.wheel_speed
            };
            (*state, Effect::Zoom(limits.clamp_zoom(view.zoom - delta_y * speed)))
        }

        _ => (*state, Effect::None),
    }
}

/// Zoom for a pinch, or `None` for degenerate distances.
pub fn pinch_zoom(
    initial_distance: f64,
    initial_zoom: f64,
    distance: f64,
    limits: &ViewportLimits,
) -> Option<f64> {
    if !(initial_distance > 0.0) || !(distance > 0.0) {
        return None;
    }
    let zoom = initial_zoom + (distance / initial_distance).log2();
    zoom.is_finite().then(|| limits.clamp_zoom(zoom))
}

/// New center after dragging the map by `offset` screen pixels.
///
/// `start_center_px` is rescaled if the zoom changed mid-drag (wheel while
/// dragging), since world pixels scale by `2^zoom`.
pub fn pan_center(
    start_center_px: WorldPoint,
    start_zoom: f64,
    offset: ScreenPoint,
    zoom: f64,
    max_lat: f64,
) -> GeoPoint {
    let start = start_center_px.rescale(start_zoom, zoom);
    let moved = WorldPoint::new(start.x - offset.x, start.y - offset.y);
    unproject(moved, zoom).normalized(max_lat)
}

fn start_drag(source: PointerSource, pos: ScreenPoint, view: &ViewportState) -> GestureState {
    GestureState::Dragging {
        source,
        start: pos,
        start_center_px: project(view.center, view.zoom),
        start_zoom: view.zoom,
        offset: ScreenPoint::default(),
    }
}

fn with_offset(state: &GestureState, new_offset: ScreenPoint) -> GestureState {
    match *state {
        GestureState::Dragging {
            source,
            start,
            start_center_px,
            start_zoom,
            ..
        } => GestureState::Dragging {
            source,
            start,
            start_center_px,
            start_zoom,
            offset: new_offset,
        },
        other => other,
    }
}

fn finish_drag(
    state: &GestureState,
    view: &ViewportState,
    limits: &ViewportLimits,
) -> (GestureState, Effect) {
    let GestureState::Dragging {
        start_center_px,
        start_zoom,
        offset,
        ..
    } = *state
    else {
        return (*state, Effect::None);
    };
    if offset.is_zero() {
        return (GestureState::Idle, Effect::ClearPreview);
    }
    let center = pan_center(start_center_px, start_zoom, offset, view.zoom, limits.max_lat);
    (GestureState::Idle, Effect::Commit(center))
}
