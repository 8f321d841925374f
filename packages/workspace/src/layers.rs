//! # Layer Tree
//!
//! Presentation view over a cached `RemoteDocument`. Layers are wrapped on
//! demand: asking for the roots wraps only the root nodes, and a layer's
//! children are wrapped only when that layer is expanded. Wrapping is a pure
//! function of the raw node (plus the link store), so two wraps of the same
//! node compare equal; identity is always the layer id.

use crate::links::LinkStore;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use stylesync_common::{NodeKind, RawNode, RemoteDocument, SyncError, SyncResult};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: String,
    pub display_name: String,
    pub kind: NodeKind,
    pub expandable: bool,
    pub linked_selector: Option<String>,
}

impl Layer {
    pub fn wrap(node: &RawNode, links: &LinkStore) -> Self {
        Self {
            id: node.id.clone(),
            display_name: node.name.clone(),
            kind: node.kind.clone(),
            expandable: node.kind.is_expandable(),
            linked_selector: links.get(&node.id).map(|link| link.selector.clone()),
        }
    }
}

impl PartialEq for Layer {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Layer {}

impl Hash for Layer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    parent: Option<String>,
    position: usize,
}

/// Where every node of a document sits, keyed by layer id.
///
/// Owned so it can live next to the document it describes; built once per
/// document and reused by every `LayerTree` until the document is swapped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerIndex {
    slots: HashMap<String, Slot>,
}

impl LayerIndex {
    pub fn build(document: Option<&RemoteDocument>) -> Self {
        let mut slots = HashMap::new();

        if let Some(document) = document {
            let mut stack: Vec<(&RawNode, Option<&str>, usize)> = document
                .root_nodes
                .iter()
                .enumerate()
                .map(|(position, node)| (node, None, position))
                .collect();
            while let Some((node, parent, position)) = stack.pop() {
                stack.extend(
                    node.children()
                        .iter()
                        .enumerate()
                        .map(|(position, child)| (child, Some(node.id.as_str()), position)),
                );
                slots.insert(
                    node.id.clone(),
                    Slot {
                        parent: parent.map(str::to_string),
                        position,
                    },
                );
            }
        }

        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Nodes from the root down to `layer_id`, inclusive
    fn ancestry<'d>(
        &self,
        document: &'d RemoteDocument,
        layer_id: &str,
    ) -> Option<Vec<&'d RawNode>> {
        let mut positions = Vec::new();
        let mut current = layer_id;
        loop {
            let slot = self.slots.get(current)?;
            positions.push(slot.position);
            match slot.parent.as_deref() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        let mut nodes = document.root_nodes.as_slice();
        let mut chain = Vec::with_capacity(positions.len());
        for position in positions.into_iter().rev() {
            let node = nodes.get(position)?;
            nodes = node.children();
            chain.push(node);
        }

        if chain.last()?.id != layer_id {
            return None;
        }
        Some(chain)
    }
}

/// Addressable view of a document's nodes.
///
/// Borrows a prebuilt `LayerIndex`, so constructing one is free; no `Layer`
/// values are created until a caller asks for them.
pub struct LayerTree<'a> {
    document: Option<&'a RemoteDocument>,
    index: &'a LayerIndex,
    links: &'a LinkStore,
}

impl<'a> LayerTree<'a> {
    pub fn new(
        document: Option<&'a RemoteDocument>,
        index: &'a LayerIndex,
        links: &'a LinkStore,
    ) -> Self {
        Self {
            document,
            index,
            links,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Top-level layers, in display order
    pub fn roots(&self) -> Vec<Layer> {
        match self.document {
            Some(document) => self.wrap_all(&document.root_nodes),
            None => Vec::new(),
        }
    }

    /// Children of an expandable layer, in display order
    pub fn children_of(&self, layer: &Layer) -> SyncResult<Vec<Layer>> {
        if !layer.expandable {
            return Err(SyncError::not_expandable(&layer.id));
        }

        let node = self
            .node(&layer.id)
            .ok_or_else(|| SyncError::unknown_layer(&layer.id))?;
        Ok(self.wrap_all(node.children()))
    }

    /// Host tree-view entry point. Asking a leaf for children is a caller bug:
    /// it trips an assertion in debug builds and yields nothing in release.
    pub fn get_children(&self, layer_id: &str) -> Vec<Layer> {
        let Some(layer) = self.find(layer_id) else {
            tracing::debug!(layer_id, "Children requested for unknown layer");
            return Vec::new();
        };

        match self.children_of(&layer) {
            Ok(children) => children,
            Err(err) => {
                debug_assert!(false, "tree view contract violated: {err}");
                tracing::warn!(layer_id, error = %err, "Ignoring children request");
                Vec::new()
            }
        }
    }

    pub fn find(&self, layer_id: &str) -> Option<Layer> {
        self.node(layer_id).map(|node| Layer::wrap(node, self.links))
    }

    /// Display names from the root down to `layer_id`, inclusive
    pub fn path_to(&self, layer_id: &str) -> Option<Vec<String>> {
        let chain = self.index.ancestry(self.document?, layer_id)?;
        Some(chain.into_iter().map(|node| node.name.clone()).collect())
    }

    fn node(&self, layer_id: &str) -> Option<&'a RawNode> {
        self.index.ancestry(self.document?, layer_id)?.pop()
    }

    fn wrap_all(&self, nodes: &[RawNode]) -> Vec<Layer> {
        nodes
            .iter()
            .map(|node| Layer::wrap(node, self.links))
            .collect()
    }
}
