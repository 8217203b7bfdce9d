//! Node identity and per-node data.

use serde::{Deserialize, Serialize};

/// Handle to a live node in a [`Dom`](crate::Dom) arena.
///
/// A `NodeId` is the node's identity: records and caret anchors hold ids,
/// never copies of content. Ids stay valid for the lifetime of the tree;
/// a removed node is detached, not destroyed, so replay can re-attach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    Cdata,
}

/// Attribute key: a name with an optional namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttrName {
    pub name: String,
    pub namespace: Option<String>,
}

impl AttrName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    pub fn namespaced(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }
}

/// Tag name used for paragraph containers.
pub const PARAGRAPH_TAG: &str = "p";

/// Tag name used for line-break markers.
pub const LINE_BREAK_TAG: &str = "br";

/// Element tags treated as generic block containers (candidates for
/// paragraph replacement during normalization).
pub const GENERIC_CONTAINER_TAGS: &[&str] = &["div", "section", "article", "blockquote", "pre"];

#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    /// Tag name; empty for non-elements.
    pub(crate) tag: String,
    /// Ordered attribute list; elements only.
    pub(crate) attributes: Vec<(AttrName, String)>,
    /// Character data; empty for elements.
    pub(crate) text: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl NodeData {
    pub(crate) fn element(tag: &str) -> Self {
        Self {
            kind: NodeKind::Element,
            tag: tag.to_string(),
            attributes: Vec::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub(crate) fn character_data(kind: NodeKind, value: &str) -> Self {
        Self {
            kind,
            tag: String::new(),
            attributes: Vec::new(),
            text: value.to_string(),
            parent: None,
            children: Vec::new(),
        }
    }
}
