//! Marker pins and the selection popup.

use serde::Serialize;

use super::layer::Keyed;
use crate::cluster::{Cluster, ClusterKey};

/// Location chips shown in a group popup header before collapsing to "+N more".
pub const MAX_LOCATION_CHIPS: usize = 3;

/// A pin, anchored bottom-center at `(x, y)` so its tip marks the location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerView {
    pub key: ClusterKey,
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub count: usize,
    /// Member count, shown only for groups.
    pub badge: Option<usize>,
    /// `None` means the pin glyph is drawn instead.
    pub thumbnail: Option<String>,
    pub selected: bool,
}

impl Keyed for MarkerView {
    fn key(&self) -> &str {
        &self.key.0
    }
}

impl MarkerView {
    pub fn from_cluster(cluster: &Cluster, selected: bool) -> Self {
        let count = cluster.count();
        Self {
            key: cluster.key.clone(),
            x: cluster.screen.x,
            y: cluster.screen.y,
            label: cluster.label(),
            count,
            badge: (count > 1).then_some(count),
            thumbnail: cluster.thumbnail().map(str::to_string),
            selected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PopupHeader {
    Single {
        location: String,
    },
    Group {
        title: String,
        chips: Vec<String>,
        /// Number of further locations not shown as chips.
        more: Option<usize>,
    },
}

impl PopupHeader {
    /// Text for the overflow chip, e.g. `"+2 more"`.
    pub fn more_label(&self) -> Option<String> {
        match self {
            PopupHeader::Group { more: Some(n), .. } => Some(format!("+{n} more")),
            _ => None,
        }
    }
}

/// One navigable row in the popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupItem {
    pub memory_id: String,
    pub title: String,
    pub date: String,
    pub location: String,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupView {
    pub key: ClusterKey,
    pub header: PopupHeader,
    pub items: Vec<PopupItem>,
}

impl PopupView {
    pub fn from_cluster(cluster: &Cluster) -> Self {
        let header = if cluster.is_group() {
            let names = &cluster.unique_location_names;
            PopupHeader::Group {
                title: format!("{} Stories in this region", cluster.count()),
                chips: names.iter().take(MAX_LOCATION_CHIPS).cloned().collect(),
                more: (names.len() > MAX_LOCATION_CHIPS).then(|| names.len() - MAX_LOCATION_CHIPS),
            }
        } else {
            PopupHeader::Single {
                location: cluster.label(),
            }
        };

        let items = cluster
            .memories
            .iter()
            .map(|m| PopupItem {
                memory_id: m.id.clone(),
                title: m.title.clone(),
                date: m.formatted_date(),
                location: m.location.clone(),
                thumbnail: m.thumbnail().map(str::to_string),
            })
            .collect();

        Self {
            key: cluster.key.clone(),
            header,
            items,
        }
    }
}
