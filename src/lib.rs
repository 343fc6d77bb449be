//! Interactive slippy map for diary memories.
//!
//! Mapstory places memories on a Web-Mercator tile map. Place names are
//! geocoded through a built-in gazetteer, a session cache, and finally a
//! rate-limited external lookup. Nearby markers are merged into clusters in
//! screen space, and pan/pinch/wheel gestures run through an explicit state
//! machine.
//!
//! # Architecture
//!
//! - **Projection & tiles**: spherical Web-Mercator, XYZ tiles at `floor(zoom)`
//!   with a one-level-coarser fallback layer
//! - **Geocoding**: gazetteer → cache → single-slot queue with a minimum
//!   interval between requests, drained by a tokio task
//! - **Clustering**: greedy, order-stable, antimeridian-aware
//! - **Rendering**: plain render lists with keyed diffs so unchanged tiles and
//!   markers are never recreated
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`geo`] — Coordinates, projection and tile coverage
//! - [`geocode`] — Place-name resolution, lookup scheduling and address autocomplete
//! - [`viewport`] — Viewport state and the gesture state machine
//! - [`cluster`] — Screen-space clustering and selection
//! - [`render`] — Tile, marker and popup render lists
//! - [`map`] — Session context and the interactive map
//! - [`memory`] — Memory records and their source

pub mod cluster;
pub mod config;
pub mod geo;
pub mod geocode;
pub mod map;
pub mod memory;
pub mod render;
pub mod viewport;

pub use map::{InteractiveMap, MapContext};
