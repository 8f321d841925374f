//! # Link Store
//!
//! Bindings between design layers and stylesheet selectors. Both sides are
//! unique: a layer has at most one selector and a selector belongs to at most
//! one layer. Iteration follows insertion order so bulk re-renders are
//! deterministic.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A binding of one layer to one selector.
///
/// `layer_path` is the breadcrumb of display names captured when the link was
/// made. It is not refreshed when the remote tree changes, so a layer renamed
/// upstream keeps showing its old name until it is re-linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub layer_id: String,
    pub selector: String,
    #[serde(default)]
    pub layer_path: Vec<String>,
}

impl Link {
    pub fn new(
        layer_id: impl Into<String>,
        selector: impl Into<String>,
        layer_path: Vec<String>,
    ) -> Self {
        Self {
            layer_id: layer_id.into(),
            selector: selector.into(),
            layer_path,
        }
    }

    /// Hover text shown on the decorated rule
    pub fn hover_text(&self) -> String {
        let path = if self.layer_path.is_empty() {
            self.layer_id.clone()
        } else {
            self.layer_path.join(" › ")
        };
        format!("Linked layer: {}\nLayer id: {}", path, self.layer_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "IndexMap<String, Link>", into = "IndexMap<String, Link>")]
pub struct LinkStore {
    links: IndexMap<String, Link>,
}

impl LinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `link`, first removing any link that shares its layer or its
    /// selector. Returns the links that were displaced. Re-adding an identical
    /// link is a no-op that displaces nothing.
    pub fn add_or_replace(&mut self, link: Link) -> Vec<Link> {
        if self.links.get(&link.layer_id) == Some(&link) {
            return Vec::new();
        }

        let mut displaced = Vec::new();

        if let Some(previous) = self.links.shift_remove(&link.layer_id) {
            displaced.push(previous);
        }

        if let Some(owner) = self.owner_of(&link.selector).map(str::to_owned) {
            if let Some(previous) = self.links.shift_remove(&owner) {
                displaced.push(previous);
            }
        }

        self.links.insert(link.layer_id.clone(), link);
        displaced
    }

    pub fn remove(&mut self, layer_id: &str) -> Option<Link> {
        self.links.shift_remove(layer_id)
    }

    pub fn get(&self, layer_id: &str) -> Option<&Link> {
        self.links.get(layer_id)
    }

    /// Layer currently bound to `selector`
    pub fn owner_of(&self, selector: &str) -> Option<&str> {
        self.links
            .values()
            .find(|link| link.selector == selector)
            .map(|link| link.layer_id.as_str())
    }

    /// Links in insertion order
    pub fn all(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl From<IndexMap<String, Link>> for LinkStore {
    /// Rebuild through `add_or_replace` so a hand-edited or corrupted record
    /// cannot smuggle in duplicate selectors
    fn from(links: IndexMap<String, Link>) -> Self {
        let mut store = LinkStore::new();
        for (layer_id, mut link) in links {
            link.layer_id = layer_id;
            store.add_or_replace(link);
        }
        store
    }
}

impl From<LinkStore> for IndexMap<String, Link> {
    fn from(store: LinkStore) -> Self {
        store.links
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn link(layer: &str, selector: &str) -> Link {
        Link::new(layer, selector, vec!["Page".to_string(), layer.to_string()])
    }

    fn assert_unique(store: &LinkStore) {
        let selectors: HashSet<&str> = store.all().map(|l| l.selector.as_str()).collect();
        let layers: HashSet<&str> = store.all().map(|l| l.layer_id.as_str()).collect();
        assert_eq!(selectors.len(), store.len());
        assert_eq!(layers.len(), store.len());
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut store = LinkStore::new();

        assert!(store.add_or_replace(link("L1", ".header")).is_empty());
        assert!(store.add_or_replace(link("L1", ".header")).is_empty());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("L1").unwrap().selector, ".header");
    }

    #[test]
    fn test_relinking_layer_replaces_selector() {
        let mut store = LinkStore::new();
        store.add_or_replace(link("L1", ".header"));

        let displaced = store.add_or_replace(link("L1", ".banner"));

        assert_eq!(displaced, vec![link("L1", ".header")]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("L1").unwrap().selector, ".banner");
    }

    #[test]
    fn test_selector_steal_detaches_previous_owner() {
        let mut store = LinkStore::new();
        store.add_or_replace(link("L1", ".header"));

        let displaced = store.add_or_replace(link("L2", ".header"));

        assert_eq!(displaced, vec![link("L1", ".header")]);
        assert!(store.get("L1").is_none());
        assert_eq!(store.owner_of(".header"), Some("L2"));
    }

    #[test]
    fn test_relink_displacing_both_sides() {
        let mut store = LinkStore::new();
        store.add_or_replace(link("L1", ".a"));
        store.add_or_replace(link("L2", ".b"));

        // L1 takes .b: its own .a link and L2's .b link both go
        let displaced = store.add_or_replace(link("L1", ".b"));

        assert_eq!(displaced.len(), 2);
        assert_eq!(store.len(), 1);
        assert_unique(&store);
    }

    #[test]
    fn test_invariants_hold_over_random_sequence() {
        let mut store = LinkStore::new();
        let layers = ["L1", "L2", "L3", "L4"];
        let selectors = [".a", ".b", ".c"];

        // Deterministic pseudo-random walk over add/remove operations
        let mut seed: u32 = 17;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let layer = layers[(seed >> 8) as usize % layers.len()];
            let selector = selectors[(seed >> 16) as usize % selectors.len()];
            if seed % 5 == 0 {
                store.remove(layer);
            } else {
                store.add_or_replace(link(layer, selector));
            }
            assert_unique(&store);
        }
    }

    #[test]
    fn test_insertion_order() {
        let mut store = LinkStore::new();
        store.add_or_replace(link("L3", ".c"));
        store.add_or_replace(link("L1", ".a"));
        store.add_or_replace(link("L2", ".b"));
        store.remove("L1");

        let order: Vec<&str> = store.all().map(|l| l.layer_id.as_str()).collect();
        assert_eq!(order, vec!["L3", "L2"]);
    }

    #[test]
    fn test_deserialize_repairs_duplicates() {
        let json = r#"{
            "L1": { "layerId": "L1", "selector": ".a", "layerPath": ["Page"] },
            "L2": { "layerId": "L2", "selector": ".a", "layerPath": ["Page"] }
        }"#;

        let store: LinkStore = serde_json::from_str(json).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.owner_of(".a"), Some("L2"));
    }

    #[test]
    fn test_hover_text_uses_captured_path() {
        let link = Link::new("1:2", ".header", vec!["Page".into(), "Header".into()]);
        let hover = link.hover_text();

        assert!(hover.contains("Page"));
        assert!(hover.contains("Header"));
        assert!(hover.contains("1:2"));
    }
}
