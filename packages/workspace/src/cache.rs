//! # Remote Tree Cache
//!
//! Holds the last-fetched design document for one synced file and decides
//! whether a freshly reported revision makes it stale. The document is only
//! ever swapped as a whole, so readers never observe a half-updated tree.

use crate::layers::{LayerIndex, LayerTree};
use crate::links::LinkStore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use stylesync_common::RemoteDocument;

/// True when nothing is cached or the remote has moved on
pub fn should_refetch(cached: Option<&RemoteDocument>, remote_revision_stamp: &str) -> bool {
    match cached {
        None => true,
        Some(document) => document.revision_stamp != remote_revision_stamp,
    }
}

/// What happened when a fetched document was offered to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheUpdate {
    /// The stored document was swapped for the fetched one
    Replaced,
    /// The fetched document has the cached revision; nothing changed
    Unchanged,
}

/// Serialized as the bare document (or `null`); the layer index is rebuilt
/// whenever the document changes, including on load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteTreeCache {
    document: Option<RemoteDocument>,
    layers: LayerIndex,
}

impl RemoteTreeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: RemoteDocument) -> Self {
        Self::from_document(Some(document))
    }

    fn from_document(document: Option<RemoteDocument>) -> Self {
        let layers = LayerIndex::build(document.as_ref());
        Self { document, layers }
    }

    pub fn document(&self) -> Option<&RemoteDocument> {
        self.document.as_ref()
    }

    pub fn revision_stamp(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.revision_stamp.as_str())
    }

    pub fn should_refetch(&self, remote_revision_stamp: &str) -> bool {
        should_refetch(self.document.as_ref(), remote_revision_stamp)
    }

    pub fn layer_index(&self) -> &LayerIndex {
        &self.layers
    }

    /// View of the cached document with `links` applied
    pub fn layer_tree<'a>(&'a self, links: &'a LinkStore) -> LayerTree<'a> {
        LayerTree::new(self.document.as_ref(), &self.layers, links)
    }

    /// Swap in a new document, returning the previous one
    pub fn replace(&mut self, document: RemoteDocument) -> Option<RemoteDocument> {
        self.layers = LayerIndex::build(Some(&document));
        self.document.replace(document)
    }

    /// Store `fetched` only if it is newer than what is cached
    pub fn offer(&mut self, fetched: RemoteDocument) -> CacheUpdate {
        if !self.should_refetch(&fetched.revision_stamp) {
            return CacheUpdate::Unchanged;
        }

        tracing::info!(
            from = self.revision_stamp().unwrap_or("<none>"),
            to = %fetched.revision_stamp,
            "Replacing cached design document"
        );
        self.replace(fetched);
        CacheUpdate::Replaced
    }

    pub fn clear(&mut self) {
        self.document = None;
        self.layers = LayerIndex::default();
    }
}

impl Serialize for RemoteTreeCache {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.document.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RemoteTreeCache {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<RemoteDocument>::deserialize(deserializer).map(Self::from_document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stylesync_common::{NodeKind, RawNode};

    fn document(stamp: &str) -> RemoteDocument {
        RemoteDocument::new(stamp, vec![RawNode::new("1:1", "Page", NodeKind::Frame)])
    }

    #[test]
    fn test_should_refetch_rules() {
        let doc = document("2024-05-01T10:00:00Z");

        assert!(should_refetch(None, "anything"));
        assert!(!should_refetch(Some(&doc), "2024-05-01T10:00:00Z"));
        assert!(should_refetch(Some(&doc), "2024-05-02T09:00:00Z"));
    }

    #[test]
    fn test_offer_same_revision_is_unchanged() {
        let mut cache = RemoteTreeCache::with_document(document("rev-1"));

        let mut same = document("rev-1");
        same.root_nodes.clear();

        assert_eq!(cache.offer(same), CacheUpdate::Unchanged);
        // The stored tree is untouched even though the offered one differs
        assert_eq!(cache.document().unwrap().root_nodes.len(), 1);
    }

    #[test]
    fn test_offer_new_revision_replaces() {
        let mut cache = RemoteTreeCache::new();
        assert_eq!(cache.offer(document("rev-1")), CacheUpdate::Replaced);
        assert_eq!(cache.offer(document("rev-2")), CacheUpdate::Replaced);
        assert_eq!(cache.revision_stamp(), Some("rev-2"));
    }

    #[test]
    fn test_replace_returns_previous() {
        let mut cache = RemoteTreeCache::with_document(document("rev-1"));
        let previous = cache.replace(document("rev-2"));

        assert_eq!(previous.map(|d| d.revision_stamp), Some("rev-1".to_string()));
        cache.clear();
        assert!(cache.document().is_none());
    }

    #[test]
    fn test_serializes_as_bare_document() {
        let cache = RemoteTreeCache::with_document(document("rev-1"));
        let json = serde_json::to_value(&cache).unwrap();
        assert_eq!(json["revisionStamp"], "rev-1");

        let empty = serde_json::to_value(RemoteTreeCache::new()).unwrap();
        assert!(empty.is_null());
    }

    #[test]
    fn test_layer_index_follows_document() {
        let mut cache = RemoteTreeCache::new();
        let links = LinkStore::new();
        assert!(cache.layer_index().is_empty());

        cache.offer(RemoteDocument::new(
            "rev-1",
            vec![RawNode::new("1:1", "Page", NodeKind::Frame)
                .with_children(vec![RawNode::new("1:2", "Hero", NodeKind::Group)])],
        ));
        assert_eq!(cache.layer_index().len(), 2);
        assert!(cache.layer_tree(&links).find("1:2").is_some());

        cache.offer(document("rev-2"));
        assert_eq!(cache.layer_index().len(), 1);
        assert!(cache.layer_tree(&links).find("1:2").is_none());

        // Unchanged offers keep the index that was already built
        let before = cache.layer_index().clone();
        assert_eq!(cache.offer(document("rev-2")), CacheUpdate::Unchanged);
        assert_eq!(cache.layer_index(), &before);

        cache.clear();
        assert!(cache.layer_index().is_empty());
    }

    #[test]
    fn test_layer_index_rebuilt_on_load() {
        let json = r#"{
            "revisionStamp": "rev-1",
            "rootNodes": [{ "id": "1:1", "name": "Page", "kind": "FRAME",
                "children": [{ "id": "1:2", "name": "Hero", "kind": "GROUP" }] }]
        }"#;
        let cache: RemoteTreeCache = serde_json::from_str(json).unwrap();
        let links = LinkStore::new();

        assert_eq!(cache.layer_index().len(), 2);
        assert_eq!(
            cache.layer_tree(&links).path_to("1:2"),
            Some(vec!["Page".to_string(), "Hero".to_string()])
        );
        assert_eq!(cache, RemoteTreeCache::with_document(cache.document().unwrap().clone()));
    }
}
