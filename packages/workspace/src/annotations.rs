//! # Annotations
//!
//! Decorations are derived state: the join of the link store with the current
//! selector index. The manager is the only owner of decoration handles, so a
//! handle is disposed exactly once and never outlives the link it marks.
//!
//! Per layer the lifecycle is `Unlinked -> Linked -> Unlinked`. A linked layer
//! whose selector is not in the current index stays linked but has no
//! decoration until the selector reappears.

use crate::links::{Link, LinkStore};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use stylesync_parser::{SelectorIndex, SourceRange};

/// Opaque token returned by the host for a rendered decoration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DecorationHandle(pub u64);

/// The editor surface that actually draws decorations
pub trait DecorationHost: Send {
    fn render(&mut self, range: SourceRange, hover_text: &str, style_token: &str)
        -> DecorationHandle;

    fn dispose(&mut self, handle: DecorationHandle);
}

/// A decoration currently live in the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decoration {
    pub layer_id: String,
    pub selector: String,
    pub range: SourceRange,
    pub hover_text: String,
    pub handle: DecorationHandle,
}

pub struct AnnotationManager<H> {
    host: H,
    style_token: String,
    live: IndexMap<String, Decoration>,
}

impl<H: DecorationHost> AnnotationManager<H> {
    pub fn new(host: H, style_token: impl Into<String>) -> Self {
        Self {
            host,
            style_token: style_token.into(),
            live: IndexMap::new(),
        }
    }

    /// (Re)draw one link. Any decoration the layer already had is disposed
    /// first. Returns whether the selector resolved.
    pub fn render_link(&mut self, link: &Link, index: &SelectorIndex) -> bool {
        self.unlink(&link.layer_id);

        let Some(range) = index.range_of(&link.selector) else {
            tracing::debug!(
                layer_id = %link.layer_id,
                selector = %link.selector,
                "Linked selector not found in stylesheet"
            );
            return false;
        };

        let hover_text = link.hover_text();
        let handle = self.host.render(range, &hover_text, &self.style_token);
        self.live.insert(
            link.layer_id.clone(),
            Decoration {
                layer_id: link.layer_id.clone(),
                selector: link.selector.clone(),
                range,
                hover_text,
                handle,
            },
        );
        true
    }

    /// Dispose the decoration of one layer, if it has one
    pub fn unlink(&mut self, layer_id: &str) -> bool {
        match self.live.shift_remove(layer_id) {
            Some(decoration) => {
                self.host.dispose(decoration.handle);
                true
            }
            None => false,
        }
    }

    /// Dispose every live decoration, then render every resolvable link
    pub fn reconcile_all(&mut self, links: &LinkStore, index: &SelectorIndex) {
        self.clear();

        let mut rendered = 0;
        for link in links.all() {
            if self.render_link(link, index) {
                rendered += 1;
            }
        }

        tracing::debug!(links = links.len(), rendered, "Reconciled all decorations");
    }

    /// Narrow re-render: each layer is redrawn from its link, or disposed if
    /// it no longer has one
    pub fn reconcile_layers<'a>(
        &mut self,
        layer_ids: impl IntoIterator<Item = &'a str>,
        links: &LinkStore,
        index: &SelectorIndex,
    ) {
        for layer_id in layer_ids {
            match links.get(layer_id) {
                Some(link) => {
                    self.render_link(link, index);
                }
                None => {
                    self.unlink(layer_id);
                }
            }
        }
    }

    /// Layers whose decoration would change under `index`: the resolved range
    /// moved, disappeared or reappeared, or the link itself is gone
    pub fn stale_layers(&self, links: &LinkStore, index: &SelectorIndex) -> Vec<String> {
        let mut stale: Vec<String> = links
            .all()
            .filter(|link| {
                let resolved = index.range_of(&link.selector);
                let drawn = self
                    .live
                    .get(&link.layer_id)
                    .filter(|decoration| decoration.selector == link.selector)
                    .map(|decoration| decoration.range);
                resolved != drawn
            })
            .map(|link| link.layer_id.clone())
            .collect();

        stale.extend(
            self.live
                .keys()
                .filter(|layer_id| links.get(layer_id).is_none())
                .cloned(),
        );
        stale
    }

    pub fn clear(&mut self) {
        for (_, decoration) in self.live.drain(..) {
            self.host.dispose(decoration.handle);
        }
    }

    /// Live decorations, in render order
    pub fn decorations(&self) -> impl Iterator<Item = &Decoration> {
        self.live.values()
    }

    pub fn decoration(&self, layer_id: &str) -> Option<&Decoration> {
        self.live.get(layer_id)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn style_token(&self) -> &str {
        &self.style_token
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

/// A host that draws nothing and remembers everything. Useful wherever
/// decorations only need to be inspected, such as one-shot CLI commands.
#[derive(Debug, Default)]
pub struct RecordingHost {
    next_handle: u64,
    live: HashMap<DecorationHandle, (SourceRange, String)>,
    pub rendered: usize,
    pub disposed: usize,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, handle: DecorationHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Ranges of live decorations, sorted by start
    pub fn live_ranges(&self) -> Vec<SourceRange> {
        let mut ranges: Vec<SourceRange> = self.live.values().map(|(range, _)| *range).collect();
        ranges.sort_by_key(|range| range.start);
        ranges
    }
}

impl DecorationHost for RecordingHost {
    fn render(
        &mut self,
        range: SourceRange,
        hover_text: &str,
        _style_token: &str,
    ) -> DecorationHandle {
        self.next_handle += 1;
        let handle = DecorationHandle(self.next_handle);
        self.live.insert(handle, (range, hover_text.to_string()));
        self.rendered += 1;
        handle
    }

    fn dispose(&mut self, handle: DecorationHandle) {
        let existed = self.live.remove(&handle).is_some();
        debug_assert!(existed, "decoration {handle:?} disposed twice");
        self.disposed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = ".header { color: red; }\n.footer { margin: 0; }\n";

    fn manager() -> AnnotationManager<RecordingHost> {
        AnnotationManager::new(RecordingHost::new(), "stylesync.linked")
    }

    fn links(pairs: &[(&str, &str)]) -> LinkStore {
        let mut store = LinkStore::new();
        for (layer, selector) in pairs {
            store.add_or_replace(Link::new(*layer, *selector, vec![layer.to_string()]));
        }
        store
    }

    #[test]
    fn test_render_resolvable_link() {
        let index = SelectorIndex::parse(SHEET);
        let mut manager = manager();
        let link = Link::new("L1", ".header", vec!["Page".into(), "Header".into()]);

        assert!(manager.render_link(&link, &index));

        let decoration = manager.decoration("L1").unwrap();
        assert_eq!(decoration.range, index.range_of(".header").unwrap());
        assert!(decoration.hover_text.contains("Page"));
        assert_eq!(manager.host().live_count(), 1);
    }

    #[test]
    fn test_unresolvable_link_renders_nothing() {
        let index = SelectorIndex::parse(SHEET);
        let mut manager = manager();

        assert!(!manager.render_link(&Link::new("L1", ".missing", vec![]), &index));
        assert!(manager.is_empty());
        assert_eq!(manager.host().rendered, 0);
    }

    #[test]
    fn test_rerender_disposes_previous() {
        let index = SelectorIndex::parse(SHEET);
        let mut manager = manager();

        manager.render_link(&Link::new("L1", ".header", vec![]), &index);
        manager.render_link(&Link::new("L1", ".footer", vec![]), &index);

        assert_eq!(manager.len(), 1);
        assert_eq!(manager.host().live_count(), 1);
        assert_eq!(manager.host().disposed, 1);
    }

    #[test]
    fn test_unlink_disposes_exactly_one() {
        let index = SelectorIndex::parse(SHEET);
        let store = links(&[("L1", ".header"), ("L2", ".footer")]);
        let mut manager = manager();
        manager.reconcile_all(&store, &index);

        assert!(manager.unlink("L1"));
        assert!(!manager.unlink("L1"));

        assert_eq!(manager.host().disposed, 1);
        assert!(manager.decoration("L2").is_some());
    }

    #[test]
    fn test_reconcile_all_is_idempotent_and_leak_free() {
        let index = SelectorIndex::parse(SHEET);
        let store = links(&[("L1", ".header"), ("L2", ".footer"), ("L3", ".gone")]);
        let mut manager = manager();

        manager.reconcile_all(&store, &index);
        let first: Vec<(String, SourceRange)> = manager
            .decorations()
            .map(|d| (d.layer_id.clone(), d.range))
            .collect();
        let rendered_before = manager.host().rendered;

        manager.reconcile_all(&store, &index);
        let second: Vec<(String, SourceRange)> = manager
            .decorations()
            .map(|d| (d.layer_id.clone(), d.range))
            .collect();

        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(manager.host().disposed, rendered_before);
        assert_eq!(manager.host().live_count(), 2);
    }

    #[test]
    fn test_stale_layers_detects_moves_and_disappearance() {
        let store = links(&[("L1", ".header"), ("L2", ".footer")]);
        let mut manager = manager();
        manager.reconcile_all(&store, &SelectorIndex::parse(SHEET));

        // Unchanged text: nothing stale
        assert!(manager
            .stale_layers(&store, &SelectorIndex::parse(SHEET))
            .is_empty());

        // .header shrinks, .footer moves with it
        let edited = SelectorIndex::parse(".header { }\n.footer { margin: 0; }\n");
        assert_eq!(manager.stale_layers(&store, &edited), vec!["L1", "L2"]);

        // .header removed entirely
        let removed = SelectorIndex::parse(".banner { color: red; }\n.footer { margin: 0; }\n");
        assert_eq!(manager.stale_layers(&store, &removed), vec!["L1"]);
    }

    #[test]
    fn test_stale_layers_detects_reappearance() {
        let store = links(&[("L1", ".header")]);
        let mut manager = manager();
        manager.reconcile_all(&store, &SelectorIndex::parse(".other { }"));
        assert!(manager.is_empty());

        let back = SelectorIndex::parse(".header { }");
        assert_eq!(manager.stale_layers(&store, &back), vec!["L1"]);

        manager.reconcile_layers(["L1"], &store, &back);
        assert!(manager.decoration("L1").is_some());
    }

    #[test]
    fn test_reconcile_layers_disposes_removed_links() {
        let index = SelectorIndex::parse(SHEET);
        let mut store = links(&[("L1", ".header")]);
        let mut manager = manager();
        manager.reconcile_all(&store, &index);

        store.remove("L1");
        assert_eq!(manager.stale_layers(&store, &index), vec!["L1"]);

        manager.reconcile_layers(["L1"], &store, &index);
        assert!(manager.is_empty());
        assert_eq!(manager.host().live_count(), 0);
    }
}
