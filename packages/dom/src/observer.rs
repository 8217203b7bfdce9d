//! Change notification.
//!
//! Observers subscribe to tree mutations with a scope ([`ObserveOptions`])
//! and receive one [`RawMutation`] per edit in a per-observer queue. The
//! queue is drained with [`Dom::take_records`]; everything drained together
//! is one atomic batch. This is the synchronous stand-in for a host's
//! batched, microtask-delivered notification stream: the host decides when
//! to drain, and may let any finite number of edits accumulate first.
//!
//! Observers are explicitly owned handles: registered, paused and
//! disconnected by id, never ambient state. A paused observer misses the
//! edits performed while it is paused; suspension of self-observation
//! during replay is built on exactly that.

use crate::node::{AttrName, NodeId};
use crate::Dom;
use serde::{Deserialize, Serialize};

/// Handle to a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObserverId(pub(crate) u32);

/// Which mutations an observer receives.
///
/// With `subtree` false, only mutations targeting the root are delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveOptions {
    pub children: bool,
    pub attributes: bool,
    pub text: bool,
    pub subtree: bool,
}

impl ObserveOptions {
    /// Everything: child-list, attribute and character-data mutations,
    /// across the whole subtree.
    pub fn all() -> Self {
        Self {
            children: true,
            attributes: true,
            text: true,
            subtree: true,
        }
    }

    /// Child-list mutations only, across the whole subtree.
    pub fn children_only() -> Self {
        Self {
            children: true,
            attributes: false,
            text: false,
            subtree: true,
        }
    }
}

/// One observed tree mutation, before any normalization.
///
/// Sibling anchors are captured at mutation time: before the removal for
/// removals, after the insertion for insertions. Old values are always
/// included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RawMutation {
    /// Child-list change on `target`.
    Children {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
        prev_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    },
    /// Attribute change on `target`; `old_value` is `None` when the
    /// attribute was absent.
    Attribute {
        target: NodeId,
        attr: AttrName,
        old_value: Option<String>,
    },
    /// Character-data change on `target`.
    CharacterData { target: NodeId, old_value: String },
}

impl RawMutation {
    pub fn target(&self) -> NodeId {
        match self {
            RawMutation::Children { target, .. }
            | RawMutation::Attribute { target, .. }
            | RawMutation::CharacterData { target, .. } => *target,
        }
    }

    fn in_scope(&self, options: &ObserveOptions) -> bool {
        match self {
            RawMutation::Children { .. } => options.children,
            RawMutation::Attribute { .. } => options.attributes,
            RawMutation::CharacterData { .. } => options.text,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ObserverSlot {
    pub(crate) id: ObserverId,
    pub(crate) options: ObserveOptions,
    pub(crate) enabled: bool,
    pub(crate) queue: Vec<RawMutation>,
}

impl Dom {
    /// Register an observer. It starts enabled with an empty queue.
    pub fn observe(&mut self, options: ObserveOptions) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push(ObserverSlot {
            id,
            options,
            enabled: true,
            queue: Vec::new(),
        });
        id
    }

    /// Unregister an observer, discarding anything left in its queue.
    pub fn disconnect(&mut self, id: ObserverId) {
        self.observers.retain(|slot| slot.id != id);
    }

    /// Pause or resume delivery to one observer. Returns the previous
    /// state so a scoped guard can restore rather than assume.
    pub fn set_observer_enabled(&mut self, id: ObserverId, enabled: bool) -> bool {
        for slot in &mut self.observers {
            if slot.id == id {
                let previous = slot.enabled;
                slot.enabled = enabled;
                return previous;
            }
        }
        false
    }

    /// Drain an observer's queue. The returned mutations form one atomic
    /// batch.
    pub fn take_records(&mut self, id: ObserverId) -> Vec<RawMutation> {
        for slot in &mut self.observers {
            if slot.id == id {
                return std::mem::take(&mut slot.queue);
            }
        }
        Vec::new()
    }

    pub fn has_pending_records(&self, id: ObserverId) -> bool {
        self.observers
            .iter()
            .any(|slot| slot.id == id && !slot.queue.is_empty())
    }

    pub(crate) fn notify(&mut self, mutation: RawMutation) {
        let root = self.root;
        let target = mutation.target();
        // Only the attached editable subtree is observed; edits inside a
        // detached scaffold surface as one mutation when it is attached.
        if !self.subtree_contains(root, target) {
            return;
        }
        for slot in &mut self.observers {
            if slot.enabled
                && mutation.in_scope(&slot.options)
                && (slot.options.subtree || target == root)
            {
                slot.queue.push(mutation.clone());
            }
        }
    }
}
