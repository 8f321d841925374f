use crate::cache::RemoteTreeCache;
use crate::layers::LayerTree;
use crate::links::LinkStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything remembered about one synced stylesheet.
///
/// This is the unit of persistence: it is loaded when the file is activated,
/// written back after every mutation, and reset by "remove sync".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSyncState {
    #[serde(default)]
    pub file_key: Option<String>,

    #[serde(default)]
    pub file_display_name: Option<String>,

    #[serde(rename = "cachedDocument", default)]
    pub cache: RemoteTreeCache,

    #[serde(default)]
    pub links: LinkStore,

    /// When a fetch last completed, whether or not it replaced the document
    #[serde(default)]
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

impl FileSyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attached(file_key: impl Into<String>) -> Self {
        Self {
            file_key: Some(file_key.into()),
            ..Self::default()
        }
    }

    pub fn is_attached(&self) -> bool {
        self.file_key.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn layer_tree(&self) -> LayerTree<'_> {
        self.cache.layer_tree(&self.links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::Link;
    use stylesync_common::{NodeKind, RawNode, RemoteDocument};

    fn populated() -> FileSyncState {
        let mut state = FileSyncState::attached("abc123");
        state.file_display_name = Some("Marketing Site".to_string());
        state.cache = RemoteTreeCache::with_document(RemoteDocument::new(
            "2024-05-01T10:00:00Z",
            vec![RawNode::new("1:1", "Page", NodeKind::Frame).with_children(vec![
                RawNode::new("1:2", "Header", NodeKind::from("SECTION")),
            ])],
        ));
        state.links.add_or_replace(Link::new(
            "1:2",
            ".header",
            vec!["Page".into(), "Header".into()],
        ));
        state
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let state = populated();
        let json = serde_json::to_string(&state).unwrap();
        let restored: FileSyncState = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, state);
    }

    #[test]
    fn test_record_field_names() {
        let json = serde_json::to_value(populated()).unwrap();

        assert_eq!(json["fileKey"], "abc123");
        assert_eq!(json["fileDisplayName"], "Marketing Site");
        assert_eq!(json["cachedDocument"]["revisionStamp"], "2024-05-01T10:00:00Z");
        assert_eq!(json["links"]["1:2"]["selector"], ".header");
        // Unknown kinds are stored verbatim
        assert_eq!(
            json["cachedDocument"]["rootNodes"][0]["children"][0]["kind"],
            "SECTION"
        );
    }

    #[test]
    fn test_missing_fields_default() {
        let state: FileSyncState = serde_json::from_str("{}").unwrap();

        assert_eq!(state, FileSyncState::default());
        assert!(!state.is_attached());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut state = populated();
        state.clear();

        assert_eq!(state, FileSyncState::default());
        assert!(state.layer_tree().roots().is_empty());
    }

    #[test]
    fn test_layer_tree_sees_links() {
        let state = populated();
        let tree = state.layer_tree();

        assert_eq!(
            tree.find("1:2").unwrap().linked_selector.as_deref(),
            Some(".header")
        );
    }
}
