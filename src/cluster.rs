//! Greedy screen-space clustering of geocoded memories.
//!
//! Points are projected at the current zoom, folded across the antimeridian
//! toward the viewport center, culled, then merged in input order: each point
//! joins the first cluster whose anchor lies strictly within the radius, or
//! seeds a new one. Anchors never move once seeded.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;

use crate::config::MapConfig;
use crate::geo::projection::shortest_dx;
use crate::geo::{project, GeoPoint, ScreenPoint, ViewportSize};
use crate::geocode::GeocodedPoint;
use crate::memory::MemoryRef;
use crate::viewport::ViewportState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// Merge distance in pixels; points exactly this far apart stay separate.
    pub radius_px: f64,
    /// Points further than this outside the viewport are dropped.
    pub cull_margin_px: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self::from(&MapConfig::default())
    }
}

impl From<&MapConfig> for ClusterParams {
    fn from(config: &MapConfig) -> Self {
        Self {
            radius_px: config.cluster_radius_px,
            cull_margin_px: config.cull_margin_px,
        }
    }
}

/// Stable cluster identity: the id of the memory that seeded it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ClusterKey(pub String);

impl std::fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub key: ClusterKey,
    /// Anchor in viewport pixels (the seeding point's position).
    pub screen: ScreenPoint,
    pub anchor: GeoPoint,
    /// Display name of the seeding point.
    pub representative_name: String,
    /// Newest first; undated memories last.
    pub memories: Vec<Arc<MemoryRef>>,
    /// Distinct non-empty member locations, in member order.
    pub unique_location_names: Vec<String>,
}

impl Cluster {
    pub fn count(&self) -> usize {
        self.memories.len()
    }

    pub fn is_group(&self) -> bool {
        self.memories.len() > 1
    }

    /// Marker label: the location for a single memory, else `"<n> Stories"`.
    pub fn label(&self) -> String {
        match self.memories.as_slice() {
            [only] => only.location.clone(),
            members => format!("{} Stories", members.len()),
        }
    }

    /// Thumbnail of the newest member.
    pub fn thumbnail(&self) -> Option<&str> {
        self.memories.first().and_then(|m| m.thumbnail())
    }

    pub fn contains(&self, memory_id: &str) -> bool {
        self.memories.iter().any(|m| m.id == memory_id)
    }
}

/// Cluster `points` for the given view.
///
/// Returns nothing for an unsized viewport. Deterministic: the same input
/// always yields the same clusters, keys and anchors.
pub fn cluster_points(
    points: &[GeocodedPoint],
    view: &ViewportState,
    size: ViewportSize,
    params: &ClusterParams,
) -> Vec<Cluster> {
    if size.is_empty() {
        return Vec::new();
    }

    let center_px = project(view.center, view.zoom);
    let margin = params.cull_margin_px;
    let mut clusters: Vec<Cluster> = Vec::new();

    for point in points {
        let px = project(point.point(), view.zoom);
        let screen = ScreenPoint::new(
            size.width / 2.0 + shortest_dx(px.x - center_px.x, view.zoom),
            size.height / 2.0 + (px.y - center_px.y),
        );
        let visible = screen.x > -margin
            && screen.x < size.width + margin
            && screen.y > -margin
            && screen.y < size.height + margin;
        if !visible {
            continue;
        }

        match clusters
            .iter_mut()
            .find(|c| c.screen.distance_to(&screen) < params.radius_px)
        {
            Some(cluster) => cluster.memories.push(Arc::clone(&point.memory)),
            None => clusters.push(Cluster {
                key: ClusterKey(point.memory.id.clone()),
                screen,
                anchor: point.point(),
                representative_name: point.display_name.clone(),
                memories: vec![Arc::clone(&point.memory)],
                unique_location_names: Vec::new(),
            }),
        }
    }

    for cluster in &mut clusters {
        cluster.memories.sort_by(|a, b| newest_first(a, b));
        let mut names: Vec<String> = Vec::new();
        for memory in &cluster.memories {
            let loc = memory.location.trim();
            if !loc.is_empty() && !names.iter().any(|n| n == loc) {
                names.push(loc.to_string());
            }
        }
        cluster.unique_location_names = names;
    }

    tracing::trace!(points = points.len(), clusters = clusters.len(), "clustered");
    clusters
}

fn newest_first(a: &MemoryRef, b: &MemoryRef) -> Ordering {
    match (a.date, b.date) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The selected cluster, tracked by key across recomputation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    key: Option<ClusterKey>,
}

impl Selection {
    pub fn select(&mut self, key: ClusterKey) {
        self.key = Some(key);
    }

    pub fn clear(&mut self) {
        self.key = None;
    }

    pub fn key(&self) -> Option<&ClusterKey> {
        self.key.as_ref()
    }

    pub fn is_selected(&self, cluster: &Cluster) -> bool {
        self.key.as_ref() == Some(&cluster.key)
    }

    /// Re-attach to a fresh cluster list.
    ///
    /// If the anchor memory now belongs to a cluster seeded by someone else,
    /// the selection follows it to that cluster. If the memory is gone
    /// (culled, filtered or unmapped) the selection is cleared.
    pub fn reconcile<'a>(&mut self, clusters: &'a [Cluster]) -> Option<&'a Cluster> {
        let key = self.key.as_ref()?;
        let found = clusters
            .iter()
            .find(|c| &c.key == key)
            .or_else(|| clusters.iter().find(|c| c.contains(&key.0)));
        match found {
            Some(cluster) => {
                if &cluster.key != key {
                    tracing::debug!(from = %key, to = %cluster.key, "selection moved to merged cluster");
                    self.key = Some(cluster.key.clone());
                }
            }
            None => {
                tracing::debug!(key = %key, "selected cluster no longer visible");
                self.key = None;
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::parse_date;

    fn geocoded(id: &str, location: &str, lat: f64, lng: f64, date: Option<&str>) -> GeocodedPoint {
        GeocodedPoint {
            lat,
            lng,
            memory: Arc::new(MemoryRef {
                id: id.into(),
                title: format!("Memory {id}"),
                author: "me".into(),
                date: date.and_then(parse_date),
                location: location.into(),
                address: None,
                preview_image: None,
                images: vec![],
            }),
            display_name: location.into(),
        }
    }

    fn view(lat: f64, lng: f64, zoom: f64) -> ViewportState {
        ViewportState {
            center: GeoPoint::new(lat, lng),
            zoom,
        }
    }

    const SIZE: ViewportSize = ViewportSize::new(800.0, 600.0);

    #[test]
    fn far_apart_points_stay_separate() {
        let points = [
            geocoded("1", "Berlin", 52.52, 13.405, None),
            geocoded("2", "München", 48.1351, 11.582, None),
        ];
        let clusters = cluster_points(&points, &view(51.1657, 10.4515, 6.0), SIZE, &ClusterParams::default());
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].label(), "Berlin");
        assert_eq!(clusters[1].key, ClusterKey("2".into()));
    }

    #[test]
    fn nearby_points_merge_and_sort_newest_first() {
        let points = [
            geocoded("1", "Berlin", 52.52, 13.405, Some("2021-05-01")),
            geocoded("2", "Potsdam", 52.3906, 13.0645, None),
            geocoded("3", "Berlin", 52.53, 13.41, Some("2023-01-01")),
        ];
        let clusters = cluster_points(&points, &view(51.0, 10.0, 4.0), SIZE, &ClusterParams::default());
        assert_eq!(clusters.len(), 1);
        let c = &clusters[0];
        assert_eq!(c.key, ClusterKey("1".into()));
        assert_eq!(c.label(), "3 Stories");
        let ids: Vec<&str> = c.memories.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
        assert_eq!(c.unique_location_names, vec!["Berlin", "Potsdam"]);
    }

    #[test]
    fn points_far_outside_viewport_are_culled() {
        let points = [geocoded("1", "Sydney", -33.87, 151.21, None)];
        let clusters = cluster_points(&points, &view(51.0, 10.0, 6.0), SIZE, &ClusterParams::default());
        assert!(clusters.is_empty());
    }

    #[test]
    fn unsized_viewport_yields_nothing() {
        let points = [geocoded("1", "Berlin", 52.52, 13.405, None)];
        let clusters = cluster_points(
            &points,
            &view(52.52, 13.405, 6.0),
            ViewportSize::default(),
            &ClusterParams::default(),
        );
        assert!(clusters.is_empty());
    }

    #[test]
    fn selection_follows_merged_anchor() {
        let berlin = geocoded("1", "Berlin", 52.52, 13.405, None);
        let potsdam = geocoded("2", "Potsdam", 52.3906, 13.0645, None);

        let mut selection = Selection::default();
        selection.select(ClusterKey("2".into()));

        // Zoomed out, Berlin seeds the cluster and absorbs Potsdam.
        let clusters = cluster_points(
            &[berlin.clone(), potsdam.clone()],
            &view(52.5, 13.2, 4.0),
            SIZE,
            &ClusterParams::default(),
        );
        let selected = selection.reconcile(&clusters).unwrap();
        assert_eq!(selected.key, ClusterKey("1".into()));
        assert_eq!(selection.key(), Some(&ClusterKey("1".into())));

        // Gone entirely: cleared.
        let clusters = cluster_points(&[], &view(52.5, 13.2, 4.0), SIZE, &ClusterParams::default());
        assert!(selection.reconcile(&clusters).is_none());
        assert!(selection.key().is_none());
    }
}
