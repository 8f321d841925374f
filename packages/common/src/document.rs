//! # Remote Document Model
//!
//! The component tree fetched from the design service. A `RemoteDocument` is
//! immutable once fetched and is replaced wholesale on refresh, so every
//! consumer can hold plain references into it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deepest node nesting accepted from the service or a state record. Roots
/// sit at depth 1. Deeper trees are rejected when decoded or saved, before
/// any recursive code walks them.
pub const MAX_TREE_DEPTH: usize = 128;

/// A fetched design document plus the revision stamp it was fetched at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    /// Opaque freshness token (the service's last-modified marker)
    pub revision_stamp: String,

    /// Top-level nodes, in display order
    #[serde(default)]
    pub root_nodes: Vec<RawNode>,
}

impl RemoteDocument {
    pub fn new(revision_stamp: impl Into<String>, root_nodes: Vec<RawNode>) -> Self {
        Self {
            revision_stamp: revision_stamp.into(),
            root_nodes,
        }
    }

    /// Total number of nodes in the document
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&RawNode> = self.root_nodes.iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children());
        }
        count
    }

    /// Nesting depth of the deepest node, 0 for an empty document
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(&RawNode, usize)> =
            self.root_nodes.iter().map(|node| (node, 1)).collect();
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.children().iter().map(|child| (child, depth + 1)));
        }
        deepest
    }
}

/// One element of the remote tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    /// Unique within one document
    pub id: String,

    pub name: String,

    /// The design service calls this field `type`
    #[serde(alias = "type")]
    pub kind: NodeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RawNode>>,
}

impl RawNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            children: None,
        }
    }

    pub fn with_children(mut self, children: Vec<RawNode>) -> Self {
        self.children = Some(children);
        self
    }

    /// Children in display order (empty when absent)
    pub fn children(&self) -> &[RawNode] {
        self.children.as_deref().unwrap_or(&[])
    }
}

/// Node classification as reported by the design service.
///
/// Kinds the engine does not care about are kept verbatim in `Other` so the
/// persisted tree round-trips losslessly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeKind {
    Frame,
    Group,
    Component,
    Instance,
    Leaf,
    Other(String),
}

impl NodeKind {
    /// Only containers offer an expand affordance
    pub fn is_expandable(&self) -> bool {
        matches!(
            self,
            NodeKind::Frame | NodeKind::Group | NodeKind::Component | NodeKind::Instance
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            NodeKind::Frame => "FRAME",
            NodeKind::Group => "GROUP",
            NodeKind::Component => "COMPONENT",
            NodeKind::Instance => "INSTANCE",
            NodeKind::Leaf => "LEAF",
            NodeKind::Other(kind) => kind,
        }
    }
}

impl From<String> for NodeKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "FRAME" => NodeKind::Frame,
            "GROUP" => NodeKind::Group,
            "COMPONENT" => NodeKind::Component,
            "INSTANCE" => NodeKind::Instance,
            "LEAF" => NodeKind::Leaf,
            _ => NodeKind::Other(kind),
        }
    }
}

impl From<&str> for NodeKind {
    fn from(kind: &str) -> Self {
        NodeKind::from(kind.to_string())
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expandable_kinds() {
        assert!(NodeKind::Frame.is_expandable());
        assert!(NodeKind::Group.is_expandable());
        assert!(NodeKind::Component.is_expandable());
        assert!(NodeKind::Instance.is_expandable());

        assert!(!NodeKind::Leaf.is_expandable());
        assert!(!NodeKind::from("TEXT").is_expandable());
        assert!(!NodeKind::from("COMPONENT_SET").is_expandable());
        assert!(!NodeKind::from("CANVAS").is_expandable());
    }

    #[test]
    fn test_unknown_kind_round_trips() {
        let node = RawNode::new("1:2", "Title", NodeKind::from("TEXT"));
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains(r#""kind":"TEXT""#));

        let back: RawNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
        assert_eq!(back.kind, NodeKind::Other("TEXT".to_string()));
    }

    #[test]
    fn test_accepts_service_type_field() {
        let json = r#"{
            "id": "1:1",
            "name": "Header",
            "type": "FRAME",
            "absoluteBoundingBox": { "x": 0, "y": 0 },
            "children": [
                { "id": "1:2", "name": "Logo", "type": "VECTOR" }
            ]
        }"#;

        let node: RawNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.kind, NodeKind::Frame);
        assert_eq!(node.children().len(), 1);
        assert_eq!(node.children()[0].kind.as_str(), "VECTOR");
    }

    #[test]
    fn test_node_count() {
        let doc = RemoteDocument::new(
            "rev-1",
            vec![
                RawNode::new("1", "Page", NodeKind::Frame).with_children(vec![
                    RawNode::new("2", "Header", NodeKind::Group)
                        .with_children(vec![RawNode::new("3", "Logo", NodeKind::Leaf)]),
                    RawNode::new("4", "Body", NodeKind::Leaf),
                ]),
                RawNode::new("5", "Footer", NodeKind::Leaf),
            ],
        );

        assert_eq!(doc.node_count(), 5);
        assert_eq!(doc.depth(), 3);
        assert_eq!(RemoteDocument::new("rev-1", vec![]).depth(), 0);
    }

    #[test]
    fn test_missing_children_stays_absent() {
        let leaf = RawNode::new("1", "Dot", NodeKind::Leaf);
        let json = serde_json::to_string(&leaf).unwrap();
        assert!(!json.contains("children"));

        let empty = RawNode::new("2", "Box", NodeKind::Frame).with_children(vec![]);
        let back: RawNode = serde_json::from_str(&serde_json::to_string(&empty).unwrap()).unwrap();
        assert_eq!(back.children, Some(vec![]));
    }
}
