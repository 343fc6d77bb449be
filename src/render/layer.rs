//! Keyed memoization for render lists.
//!
//! Each layer remembers the items it emitted last pass by key. A new pass is
//! diffed against that: items whose key and value are unchanged are retained
//! as-is, so the host never tears down and recreates them.

use std::collections::HashMap;

use serde::Serialize;

/// Something with a stable identity across render passes.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// How a layer changed between two passes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayerDiff {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub retained: usize,
}

impl LayerDiff {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct KeyedLayer<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for KeyedLayer<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Keyed + PartialEq> KeyedLayer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the layer's contents with `next`, reporting what changed.
    ///
    /// Order follows `next`. If `next` repeats a key, the first one wins.
    pub fn update(&mut self, next: Vec<T>) -> LayerDiff {
        let mut diff = LayerDiff::default();
        let mut items = Vec::with_capacity(next.len());
        let mut index = HashMap::with_capacity(next.len());

        for item in next {
            let key = item.key().to_string();
            if index.contains_key(&key) {
                tracing::trace!(key = %key, "duplicate key in layer, dropping");
                continue;
            }
            match self.index.get(&key).map(|&i| &self.items[i]) {
                Some(previous) if *previous == item => diff.retained += 1,
                Some(_) => diff.updated.push(key.clone()),
                None => diff.added.push(key.clone()),
            }
            index.insert(key, items.len());
            items.push(item);
        }

        for old in &self.items {
            if !index.contains_key(old.key()) {
                diff.removed.push(old.key().to_string());
            }
        }

        self.items = items;
        self.index = index;
        diff
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(String, u32);

    impl Keyed for Item {
        fn key(&self) -> &str {
            &self.0
        }
    }

    fn item(key: &str, v: u32) -> Item {
        Item(key.into(), v)
    }

    #[test]
    fn first_pass_adds_everything() {
        let mut layer = KeyedLayer::new();
        let diff = layer.update(vec![item("a", 1), item("b", 2)]);
        assert_eq!(diff.added, vec!["a", "b"]);
        assert_eq!(diff.retained, 0);
        assert_eq!(layer.len(), 2);
    }

    #[test]
    fn identical_pass_retains_all() {
        let mut layer = KeyedLayer::new();
        layer.update(vec![item("a", 1), item("b", 2)]);
        let diff = layer.update(vec![item("a", 1), item("b", 2)]);
        assert!(diff.is_unchanged());
        assert_eq!(diff.retained, 2);
    }

    #[test]
    fn reports_updates_and_removals() {
        let mut layer = KeyedLayer::new();
        layer.update(vec![item("a", 1), item("b", 2), item("c", 3)]);
        let diff = layer.update(vec![item("a", 1), item("b", 20), item("d", 4)]);
        assert_eq!(diff.added, vec!["d"]);
        assert_eq!(diff.updated, vec!["b"]);
        assert_eq!(diff.removed, vec!["c"]);
        assert_eq!(diff.retained, 1);
        assert_eq!(layer.get("b"), Some(&item("b", 20)));
    }

    #[test]
    fn duplicate_keys_keep_first() {
        let mut layer = KeyedLayer::new();
        layer.update(vec![item("a", 1), item("a", 2)]);
        assert_eq!(layer.items(), &[item("a", 1)]);
    }
}
