//! # Edit Records
//!
//! The atomic unit of logged change: one observed (or synthesized) tree
//! mutation, in a form the engine can replay in either direction.
//!
//! ## Design
//!
//! - A record is pure data; applying and reverting it lives in the
//!   history engine.
//! - `added`/`removed` hold node ids in document order at capture time.
//!   Replay must walk them in matching (redo) or reversed (undo) order to
//!   reproduce exact sibling positions.
//! - Forward ("new") values are *lazy*: a record is captured knowing only
//!   the old value, and the first undo stores the then-live value so the
//!   subsequent redo can restore it. This keeps capture cheap and makes
//!   redo exact even when several raw mutations were coalesced.

use scribble_dom::{AttrName, CaretAnchor, NodeId, RawMutation};
use serde::{Deserialize, Serialize};

/// One replayable tree change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EditRecord {
    /// Child-list change on `target`.
    Structural {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
        prev_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    },

    /// Attribute change on `target`. `old_value: None` means the
    /// attribute was absent before the change, so undo must *remove* it,
    /// not write an empty string. The outer `Option` of `new_value` is
    /// the lazy slot (`None` until the record has been undone once); the
    /// inner one is absence, as for `old_value`.
    Attribute {
        target: NodeId,
        attr: AttrName,
        old_value: Option<String>,
        new_value: Option<Option<String>>,
    },

    /// Character-data change on `target`. `new_value` is the lazy slot.
    TextContent {
        target: NodeId,
        old_value: String,
        new_value: Option<String>,
    },
}

impl EditRecord {
    pub fn target(&self) -> NodeId {
        match self {
            EditRecord::Structural { target, .. }
            | EditRecord::Attribute { target, .. }
            | EditRecord::TextContent { target, .. } => *target,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, EditRecord::Structural { .. })
    }
}

impl From<RawMutation> for EditRecord {
    fn from(raw: RawMutation) -> Self {
        match raw {
            RawMutation::Children {
                target,
                added,
                removed,
                prev_sibling,
                next_sibling,
            } => EditRecord::Structural {
                target,
                added,
                removed,
                prev_sibling,
                next_sibling,
            },
            RawMutation::Attribute {
                target,
                attr,
                old_value,
            } => EditRecord::Attribute {
                target,
                attr,
                old_value,
                new_value: None,
            },
            RawMutation::CharacterData { target, old_value } => EditRecord::TextContent {
                target,
                old_value,
                new_value: None,
            },
        }
    }
}

/// One undo step: a run of records applied and reverted atomically, with
/// the caret snapshots to restore on either side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditBatch {
    pub records: Vec<EditRecord>,
    /// Caret as last observed before the batch's edits.
    pub before_caret: Option<CaretAnchor>,
    /// Caret after the batch's edits (and their normalization).
    pub after_caret: Option<CaretAnchor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribble_dom::{Dom, ObserveOptions};

    #[test]
    fn test_record_from_raw_children() {
        let mut dom = Dom::new();
        let root = dom.root();
        let obs = dom.observe(ObserveOptions::all());
        let p = dom.create_paragraph();
        dom.insert_before(root, p, None).unwrap();

        let raw = dom.take_records(obs);
        let record = EditRecord::from(raw.into_iter().next().unwrap());
        match record {
            EditRecord::Structural { target, added, .. } => {
                assert_eq!(target, root);
                assert_eq!(added, vec![p]);
            }
            other => panic!("expected structural record, got {:?}", other),
        }
    }

    #[test]
    fn test_lazy_values_start_unset() {
        let mut dom = Dom::new();
        let root = dom.root();
        let text = dom.create_text("a");
        dom.insert_before(root, text, None).unwrap();

        let obs = dom.observe(ObserveOptions::all());
        dom.set_text_value(text, "b").unwrap();

        let record = EditRecord::from(dom.take_records(obs).into_iter().next().unwrap());
        assert_eq!(
            record,
            EditRecord::TextContent {
                target: text,
                old_value: "a".to_string(),
                new_value: None,
            }
        );
    }

    #[test]
    fn test_record_serialization_round_trip() {
        let mut dom = Dom::new();
        let p = dom.create_paragraph();
        let record = EditRecord::Attribute {
            target: p,
            attr: AttrName::new("class"),
            old_value: None,
            new_value: Some(Some("note".to_string())),
        };

        let json = serde_json::to_string(&record).unwrap();
        let back: EditRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
