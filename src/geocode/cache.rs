//! Session-scoped coordinate cache.

use std::collections::HashMap;

use crate::geo::GeoPoint;

/// State of one cached name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheEntry {
    Resolved(GeoPoint),
    /// Lookup queued, in flight, or failed. Either way the name is not queued again.
    Unresolved,
}

impl CacheEntry {
    pub fn point(&self) -> Option<GeoPoint> {
        match self {
            Self::Resolved(p) => Some(*p),
            Self::Unresolved => None,
        }
    }
}

/// Normalized place name → coordinate (or the unresolved sentinel).
///
/// Entries are only ever added or upgraded from [`CacheEntry::Unresolved`] to
/// [`CacheEntry::Resolved`]; nothing is evicted for the lifetime of the session.
/// Every change bumps [`CoordinateCache::revision`] so renderers can tell
/// whether their last snapshot is stale.
#[derive(Debug, Default)]
pub struct CoordinateCache {
    entries: HashMap<String, CacheEntry>,
    revision: u64,
}

/// Cache keys are the trimmed name.
pub fn normalize(name: &str) -> &str {
    name.trim()
}

impl CoordinateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<CacheEntry> {
        self.entries.get(normalize(name)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(normalize(name))
    }

    /// Insert the sentinel if the name is unknown. Returns `true` if it was inserted.
    pub fn mark_unresolved(&mut self, name: &str) -> bool {
        let key = normalize(name);
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.to_string(), CacheEntry::Unresolved);
        self.revision += 1;
        true
    }

    /// Record a successful lookup, replacing the sentinel.
    pub fn resolve(&mut self, name: &str, point: GeoPoint) {
        self.entries
            .insert(normalize(name).to_string(), CacheEntry::Resolved(point));
        self.revision += 1;
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolved_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e, CacheEntry::Resolved(_)))
            .count()
    }
}
