//! The live document tree.
//!
//! An arena of nodes under a fixed root element (the editable surface).
//! Nodes are addressed by [`NodeId`] and never freed: removing a child
//! detaches it, and a detached node can be re-attached later; replay of
//! logged edits depends on detached nodes keeping their identity.
//!
//! Every mutating operation emits one [`RawMutation`](crate::RawMutation)
//! to each enabled, in-scope observer before returning.

use crate::error::DomError;
use crate::node::{
    AttrName, NodeData, NodeId, NodeKind, GENERIC_CONTAINER_TAGS, LINE_BREAK_TAG, PARAGRAPH_TAG,
};
use crate::observer::{ObserverSlot, RawMutation};
use crate::selection::CaretAnchor;

const ROOT_TAG: &str = "body";

#[derive(Debug)]
pub struct Dom {
    nodes: Vec<NodeData>,
    pub(crate) root: NodeId,
    pub(crate) selection: Option<CaretAnchor>,
    pub(crate) observers: Vec<ObserverSlot>,
    pub(crate) next_observer_id: u32,
}

impl Dom {
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            selection: None,
            observers: Vec::new(),
            next_observer_id: 0,
        };
        dom.root = dom.alloc(NodeData::element(ROOT_TAG));
        dom
    }

    /// The editable root. Always an element; never has a parent.
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    // ---- node creation ----------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::element(tag))
    }

    pub fn create_text(&mut self, value: &str) -> NodeId {
        self.alloc(NodeData::character_data(NodeKind::Text, value))
    }

    pub fn create_comment(&mut self, value: &str) -> NodeId {
        self.alloc(NodeData::character_data(NodeKind::Comment, value))
    }

    pub fn create_cdata(&mut self, value: &str) -> NodeId {
        self.alloc(NodeData::character_data(NodeKind::Cdata, value))
    }

    /// Create a paragraph container, one of the two schema element kinds.
    pub fn create_paragraph(&mut self) -> NodeId {
        self.create_element(PARAGRAPH_TAG)
    }

    /// Create a line-break marker, the other schema element kind.
    pub fn create_line_break(&mut self) -> NodeId {
        self.create_element(LINE_BREAK_TAG)
    }

    // ---- queries ----------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    /// Tag name; `None` for non-elements.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        let node = self.node(id);
        match node.kind {
            NodeKind::Element => Some(node.tag.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.node(id).kind == NodeKind::Element
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.node(id).kind == NodeKind::Text
    }

    pub fn is_paragraph(&self, id: NodeId) -> bool {
        self.tag(id) == Some(PARAGRAPH_TAG)
    }

    pub fn is_line_break(&self, id: NodeId) -> bool {
        self.tag(id) == Some(LINE_BREAK_TAG)
    }

    pub fn is_generic_container(&self, id: NodeId) -> bool {
        self.tag(id)
            .map(|tag| GENERIC_CONTAINER_TAGS.contains(&tag))
            .unwrap_or(false)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.node(id).children.len()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.last().copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        let siblings = &self.node(parent).children;
        let idx = siblings.iter().position(|&c| c == id)?;
        if idx > 0 {
            Some(siblings[idx - 1])
        } else {
            None
        }
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        let siblings = &self.node(parent).children;
        let idx = siblings.iter().position(|&c| c == id)?;
        siblings.get(idx + 1).copied()
    }

    /// Position of `child` in `parent`'s child list.
    pub fn index_of(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.node(parent).children.iter().position(|&c| c == child)
    }

    /// True when `node` is `ancestor` or lies in its subtree.
    pub fn subtree_contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.node(id).parent;
        }
        false
    }

    /// True when `node` or any descendant is a character-data leaf that
    /// renders as text (a Text or CDATA node).
    pub fn has_text_descendant(&self, node: NodeId) -> bool {
        match self.node(node).kind {
            NodeKind::Text | NodeKind::Cdata => true,
            NodeKind::Comment => false,
            NodeKind::Element => self
                .node(node)
                .children
                .iter()
                .any(|&child| self.has_text_descendant(child)),
        }
    }

    // ---- child-list mutation ----------------------------------------------

    /// Insert `node` into `parent`'s child list, before `reference`
    /// (appends when `reference` is `None`).
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        if !self.is_element(parent) {
            return Err(DomError::NotAnElement(parent));
        }
        if self.node(node).parent.is_some() {
            return Err(DomError::AlreadyAttached(node));
        }
        if self.subtree_contains(node, parent) {
            return Err(DomError::WouldCycle(node, parent));
        }
        let idx = match reference {
            Some(reference) => self
                .index_of(parent, reference)
                .ok_or(DomError::NotAChild(reference, parent))?,
            None => self.child_count(parent),
        };

        self.node_mut(parent).children.insert(idx, node);
        self.node_mut(node).parent = Some(parent);

        let prev_sibling = if idx > 0 {
            Some(self.node(parent).children[idx - 1])
        } else {
            None
        };
        tracing::debug!(?parent, ?node, index = idx, "insert child");
        self.notify(RawMutation::Children {
            target: parent,
            added: vec![node],
            removed: Vec::new(),
            prev_sibling,
            next_sibling: reference,
        });
        Ok(())
    }

    /// Detach `node` from `parent`. The node keeps its identity and may be
    /// re-inserted later.
    pub fn remove_child(&mut self, parent: NodeId, node: NodeId) -> Result<(), DomError> {
        let idx = self
            .index_of(parent, node)
            .ok_or(DomError::NotAChild(node, parent))?;

        let siblings = &self.node(parent).children;
        let prev_sibling = if idx > 0 { Some(siblings[idx - 1]) } else { None };
        let next_sibling = siblings.get(idx + 1).copied();

        self.node_mut(parent).children.remove(idx);
        self.node_mut(node).parent = None;

        tracing::debug!(?parent, ?node, index = idx, "remove child");
        self.notify(RawMutation::Children {
            target: parent,
            added: Vec::new(),
            removed: vec![node],
            prev_sibling,
            next_sibling,
        });
        Ok(())
    }

    /// Replace `old` with `new` in `parent`'s child list, as one mutation.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new: NodeId,
        old: NodeId,
    ) -> Result<(), DomError> {
        let idx = self
            .index_of(parent, old)
            .ok_or(DomError::NotAChild(old, parent))?;
        if self.node(new).parent.is_some() {
            return Err(DomError::AlreadyAttached(new));
        }
        if self.subtree_contains(new, parent) {
            return Err(DomError::WouldCycle(new, parent));
        }

        let siblings = &self.node(parent).children;
        let prev_sibling = if idx > 0 { Some(siblings[idx - 1]) } else { None };
        let next_sibling = siblings.get(idx + 1).copied();

        self.node_mut(parent).children[idx] = new;
        self.node_mut(old).parent = None;
        self.node_mut(new).parent = Some(parent);

        tracing::debug!(?parent, ?new, ?old, "replace child");
        self.notify(RawMutation::Children {
            target: parent,
            added: vec![new],
            removed: vec![old],
            prev_sibling,
            next_sibling,
        });
        Ok(())
    }

    // ---- attributes -------------------------------------------------------

    pub fn attribute(&self, id: NodeId, attr: &AttrName) -> Option<&str> {
        self.node(id)
            .attributes
            .iter()
            .find(|(name, _)| name == attr)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(
        &mut self,
        id: NodeId,
        attr: AttrName,
        value: &str,
    ) -> Result<(), DomError> {
        if !self.is_element(id) {
            return Err(DomError::NotAnElement(id));
        }
        let node = self.node_mut(id);
        let old_value = match node.attributes.iter_mut().find(|(name, _)| *name == attr) {
            Some((_, slot)) => Some(std::mem::replace(slot, value.to_string())),
            None => {
                node.attributes.push((attr.clone(), value.to_string()));
                None
            }
        };
        self.notify(RawMutation::Attribute {
            target: id,
            attr,
            old_value,
        });
        Ok(())
    }

    /// Remove an attribute. Removing an absent attribute is a no-op and
    /// emits nothing.
    pub fn remove_attribute(&mut self, id: NodeId, attr: &AttrName) -> Result<(), DomError> {
        if !self.is_element(id) {
            return Err(DomError::NotAnElement(id));
        }
        let node = self.node_mut(id);
        let Some(idx) = node.attributes.iter().position(|(name, _)| name == attr) else {
            return Ok(());
        };
        let (_, old_value) = node.attributes.remove(idx);
        self.notify(RawMutation::Attribute {
            target: id,
            attr: attr.clone(),
            old_value: Some(old_value),
        });
        Ok(())
    }

    // ---- character data ---------------------------------------------------

    /// Character data of a node; empty for elements.
    pub fn text_value(&self, id: NodeId) -> &str {
        self.node(id).text.as_str()
    }

    pub fn set_text_value(&mut self, id: NodeId, value: &str) -> Result<(), DomError> {
        if self.is_element(id) {
            return Err(DomError::NotCharacterData(id));
        }
        let old_value = std::mem::replace(&mut self.node_mut(id).text, value.to_string());
        self.notify(RawMutation::CharacterData {
            target: id,
            old_value,
        });
        Ok(())
    }

    // ---- debug rendering --------------------------------------------------

    /// Render a subtree as compact markup, mainly for tests and debug
    /// output. Attributes are emitted in document order.
    pub fn markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let node = self.node(id);
        match node.kind {
            NodeKind::Element => {
                out.push('<');
                out.push_str(&node.tag);
                for (attr, value) in &node.attributes {
                    out.push(' ');
                    if let Some(ns) = &attr.namespace {
                        out.push_str(ns);
                        out.push(':');
                    }
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    out.push_str(value);
                    out.push('"');
                }
                if node.children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for &child in &node.children {
                        self.write_markup(child, out);
                    }
                    out.push_str("</");
                    out.push_str(&node.tag);
                    out.push('>');
                }
            }
            NodeKind::Text => out.push_str(&node.text),
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(&node.text);
                out.push_str("-->");
            }
            NodeKind::Cdata => {
                out.push_str("<![CDATA[");
                out.push_str(&node.text);
                out.push_str("]]>");
            }
        }
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}
