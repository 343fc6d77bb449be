//! Render lists handed to the host: tiles, markers, popup, attribution.
//!
//! Everything here is plain data. The host draws a [`Frame`] and uses the
//! per-layer [`LayerDiff`]s to touch only what changed.

pub mod layer;
pub mod marker;

use serde::Serialize;

use crate::config::TileConfig;
use crate::geo::tiles::{fallback_tile_zoom, primary_tile_zoom, tiles_for_zoom, TileDescriptor};
use crate::geo::{ScreenPoint, ViewportSize};
use crate::geocode::UnmappedName;
use crate::viewport::ViewportState;

pub use layer::{Keyed, KeyedLayer, LayerDiff};
pub use marker::{MarkerView, PopupHeader, PopupItem, PopupView};

/// A tile image placed in viewport pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileView {
    pub key: String,
    pub url: String,
    pub zoom_level: u32,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Keyed for TileView {
    fn key(&self) -> &str {
        &self.key
    }
}

impl TileView {
    pub fn new(tile: &TileDescriptor, template: &str) -> Self {
        Self {
            key: tile.key(),
            url: tile.url(template),
            zoom_level: tile.zoom_level,
            left: tile.pixel_left,
            top: tile.pixel_top,
            width: tile.pixel_width,
            height: tile.pixel_height,
        }
    }
}

/// Fallback and primary tile lists for a view. Draw `fallback` first.
pub fn tile_layers(
    view: &ViewportState,
    size: ViewportSize,
    template: &str,
) -> (Vec<TileView>, Vec<TileView>) {
    let build = |tile_zoom: i32| -> Vec<TileView> {
        tiles_for_zoom(view.center, view.zoom, size, tile_zoom)
            .iter()
            .map(|t| TileView::new(t, template))
            .collect()
    };
    let fallback = fallback_tile_zoom(view.zoom).map(&build).unwrap_or_default();
    let primary = build(primary_tile_zoom(view.zoom));
    (fallback, primary)
}

/// Data-source notice that must stay visible over the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub text: String,
}

impl From<&TileConfig> for Attribution {
    fn from(config: &TileConfig) -> Self {
        Self {
            text: config.attribution.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameDiff {
    pub fallback_tiles: LayerDiff,
    pub primary_tiles: LayerDiff,
    pub markers: LayerDiff,
}

/// One render pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    pub view: ViewportState,
    pub size: ViewportSize,
    /// Translation applied to tiles and markers while a drag is in progress.
    pub preview_offset: ScreenPoint,
    pub fallback_tiles: Vec<TileView>,
    pub primary_tiles: Vec<TileView>,
    pub markers: Vec<MarkerView>,
    pub popup: Option<PopupView>,
    pub attribution: Attribution,
    /// Names that have no coordinate; their memories are not on the map.
    pub unmapped: Vec<UnmappedName>,
    pub diff: FrameDiff,
}
