//! # Undo History
//!
//! Fixed-capacity ring buffer of [`EditBatch`]es with undo/redo replay.
//!
//! ## Design
//!
//! - Storage is a circular slot array; three circular indices track it:
//!   `offset` (oldest batch still undoable), `pos` (next slot to write /
//!   next batch to redo) and `end_pos` (one past the newest batch). The
//!   set of live batches is exactly the circular half-open window
//!   `[offset, end_pos)`, and `pos` always lies in `[offset, end_pos]`.
//! - Writing a new batch while `pos != end_pos` (the user undid, then
//!   edited) starts a new branch: every slot that falls outside the new
//!   window is cleared so stale redo data can never be replayed.
//! - The slot array carries one more slot than the configured undo depth;
//!   a full wrap advances `offset` past the evicted batch, so `capacity`
//!   batches always stay reachable.
//! - Undo replays a batch's records in reverse, redo forward. The first
//!   undo of a record stores the then-live value into its lazy `new_value`
//!   slot; redo consumes it.
//! - Undo/redo at a window boundary returns `Ok(false)`: a normal UI
//!   state, never an error.
//!
//! Callers that observe the tree must suspend their own capture around
//! `undo`/`redo`; replay mutates the tree like any other edit source.

use crate::records::{EditBatch, EditRecord};
use crate::EditorError;
use scribble_dom::{CaretAnchor, Dom};
use serde::{Deserialize, Serialize};

/// History configuration. Recognized option: `{"capacity": N}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryOptions {
    /// Maximum number of undoable batches. `0` disables logging entirely.
    pub capacity: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self { capacity: 50 }
    }
}

/// Ring-buffer undo engine.
#[derive(Debug)]
pub struct History {
    slots: Vec<Option<EditBatch>>,
    offset: usize,
    pos: usize,
    end_pos: usize,
}

impl History {
    pub fn new(options: HistoryOptions) -> Self {
        let slots = if options.capacity == 0 {
            Vec::new()
        } else {
            // One spare slot: the window is half-open, so a buffer of N
            // undoable batches needs N + 1 slots.
            (0..options.capacity + 1).map(|_| None).collect()
        };
        Self {
            slots,
            offset: 0,
            pos: 0,
            end_pos: 0,
        }
    }

    /// Number of batches currently reachable by undo plus redo.
    pub fn len(&self) -> usize {
        let c = self.slots.len();
        if c == 0 || self.offset == self.end_pos {
            0
        } else if self.offset < self.end_pos {
            self.end_pos - self.offset
        } else {
            c - self.offset + self.end_pos
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True iff slot `i` lies in the circular half-open window
    /// `[offset, end_pos)`.
    fn is_valid(&self, i: usize) -> bool {
        if self.offset == self.end_pos {
            return false;
        }
        if self.offset < self.end_pos {
            self.offset <= i && i < self.end_pos
        } else {
            i >= self.offset || i < self.end_pos
        }
    }

    pub fn can_undo(&self) -> bool {
        let c = self.slots.len();
        c > 0 && self.is_valid((self.pos + c - 1) % c)
    }

    pub fn can_redo(&self) -> bool {
        self.is_valid(self.pos)
    }

    /// The newest batch still reachable by undo, if any.
    pub fn last_batch(&self) -> Option<&EditBatch> {
        let c = self.slots.len();
        if c == 0 {
            return None;
        }
        let last = (self.pos + c - 1) % c;
        if self.is_valid(last) {
            self.slots[last].as_ref()
        } else {
            None
        }
    }

    /// Store a batch.
    ///
    /// With `append_to_last` set and a valid most-recently-written slot,
    /// the records are merged into that slot instead (a continuation of
    /// the previous user-visible step; its caret snapshots stand).
    /// Otherwise the batch is written at `pos`; if the write wraps onto
    /// `offset` the oldest batch is evicted, and every slot outside the
    /// new window is cleared.
    pub fn push(
        &mut self,
        records: Vec<EditRecord>,
        before_caret: Option<CaretAnchor>,
        after_caret: Option<CaretAnchor>,
        append_to_last: bool,
    ) {
        let c = self.slots.len();
        if c == 0 {
            return;
        }
        if append_to_last {
            let last = (self.pos + c - 1) % c;
            if self.is_valid(last) {
                if let Some(batch) = self.slots[last].as_mut() {
                    tracing::debug!(count = records.len(), "append records to last batch");
                    batch.records.extend(records);
                    return;
                }
            }
        }

        tracing::debug!(count = records.len(), slot = self.pos, "push batch");
        self.slots[self.pos] = Some(EditBatch {
            records,
            before_caret,
            after_caret,
        });
        self.pos = (self.pos + 1) % c;
        if self.pos == self.offset {
            tracing::warn!(slot = self.offset, "history full, evicting oldest batch");
            self.offset = (self.offset + 1) % c;
        }
        self.end_pos = self.pos;

        for i in 0..c {
            if !self.is_valid(i) {
                self.slots[i] = None;
            }
        }
    }

    /// Revert the newest batch against the tree and restore its
    /// before-caret. Returns `Ok(false)` when there is nothing to undo.
    pub fn undo(&mut self, dom: &mut Dom) -> Result<bool, EditorError> {
        let c = self.slots.len();
        if c == 0 {
            return Ok(false);
        }
        let r = (self.pos + c - 1) % c;
        if !self.is_valid(r) {
            return Ok(false);
        }
        let Some(mut batch) = self.slots[r].take() else {
            return Ok(false);
        };

        tracing::debug!(slot = r, records = batch.records.len(), "undo");
        let outcome = batch
            .records
            .iter_mut()
            .rev()
            .try_for_each(|record| revert_record(dom, record));
        let caret = batch.before_caret;
        self.slots[r] = Some(batch);
        outcome?;

        if let Some(caret) = caret {
            dom.set_caret(caret);
        }
        self.pos = r;
        Ok(true)
    }

    /// Re-apply the batch at `pos` and restore its after-caret. Returns
    /// `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self, dom: &mut Dom) -> Result<bool, EditorError> {
        let c = self.slots.len();
        if c == 0 {
            return Ok(false);
        }
        let r = self.pos;
        if !self.is_valid(r) {
            return Ok(false);
        }
        let Some(batch) = self.slots[r].take() else {
            return Ok(false);
        };

        tracing::debug!(slot = r, records = batch.records.len(), "redo");
        let outcome = batch
            .records
            .iter()
            .try_for_each(|record| apply_record(dom, record));
        let caret = batch.after_caret;
        self.slots[r] = Some(batch);
        outcome?;

        if let Some(caret) = caret {
            dom.set_caret(caret);
        }
        self.pos = (self.pos + 1) % c;
        Ok(true)
    }

    /// Drop all batches and reset the cursors.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.offset = 0;
        self.pos = 0;
        self.end_pos = 0;
    }
}

/// Reverse-apply one record against the live tree, capturing the live
/// value into the record's lazy forward slot first.
///
/// Also used directly by the capture controller to roll back a cancelled
/// composition without logging it.
pub(crate) fn revert_record(dom: &mut Dom, record: &mut EditRecord) -> Result<(), EditorError> {
    match record {
        EditRecord::TextContent {
            target,
            old_value,
            new_value,
        } => {
            *new_value = Some(dom.text_value(*target).to_string());
            dom.set_text_value(*target, old_value)?;
        }
        EditRecord::Attribute {
            target,
            attr,
            old_value,
            new_value,
        } => {
            *new_value = Some(dom.attribute(*target, attr).map(str::to_string));
            match old_value {
                Some(value) => dom.set_attribute(*target, attr.clone(), value)?,
                None => dom.remove_attribute(*target, attr)?,
            }
        }
        EditRecord::Structural {
            target,
            added,
            removed,
            next_sibling,
            ..
        } => {
            for &node in added.iter().rev() {
                dom.remove_child(*target, node)?;
            }
            for &node in removed.iter().rev() {
                dom.insert_before(*target, node, *next_sibling)?;
            }
        }
    }
    Ok(())
}

/// Forward-apply one record against the live tree.
fn apply_record(dom: &mut Dom, record: &EditRecord) -> Result<(), EditorError> {
    match record {
        EditRecord::TextContent {
            target, new_value, ..
        } => {
            let value = new_value.as_ref().ok_or(EditorError::IncompleteRecord)?;
            dom.set_text_value(*target, value)?;
        }
        EditRecord::Attribute {
            target,
            attr,
            new_value,
            ..
        } => match new_value.as_ref().ok_or(EditorError::IncompleteRecord)? {
            Some(value) => dom.set_attribute(*target, attr.clone(), value)?,
            None => dom.remove_attribute(*target, attr)?,
        },
        EditRecord::Structural {
            target,
            added,
            removed,
            next_sibling,
            ..
        } => {
            for &node in added {
                dom.insert_before(*target, node, *next_sibling)?;
            }
            for &node in removed {
                dom.remove_child(*target, node)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structural_marker(dom: &mut Dom) -> EditRecord {
        // A detached placeholder node gives each test batch a distinct,
        // replay-free record.
        let node = dom.create_comment("marker");
        EditRecord::Structural {
            target: dom.root(),
            added: Vec::new(),
            removed: Vec::new(),
            prev_sibling: None,
            next_sibling: Some(node),
        }
    }

    fn push_marker(history: &mut History, dom: &mut Dom) {
        let record = structural_marker(dom);
        history.push(vec![record], None, None, false);
    }

    #[test]
    fn test_empty_history() {
        let history = History::new(HistoryOptions::default());
        assert!(history.is_empty());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.last_batch().is_none());
    }

    #[test]
    fn test_zero_capacity_disables_logging() {
        let mut dom = Dom::new();
        let mut history = History::new(HistoryOptions { capacity: 0 });
        push_marker(&mut history, &mut dom);
        assert!(history.is_empty());
        assert!(!history.can_undo());
        assert!(!history.undo(&mut dom).unwrap());
        assert!(!history.redo(&mut dom).unwrap());
    }

    #[test]
    fn test_validity_window_empty_and_wrapped() {
        let mut history = History::new(HistoryOptions { capacity: 4 });
        let c = history.slots.len();

        // offset == end_pos: no index is valid.
        for start in 0..c {
            history.offset = start;
            history.end_pos = start;
            for i in 0..c {
                assert!(!history.is_valid(i), "offset == end_pos must invalidate {i}");
            }
        }

        // Every other (offset, end_pos) pair: exactly the circular window.
        for offset in 0..c {
            for end_pos in 0..c {
                if offset == end_pos {
                    continue;
                }
                history.offset = offset;
                history.end_pos = end_pos;
                for i in 0..c {
                    let expected = if offset < end_pos {
                        offset <= i && i < end_pos
                    } else {
                        i >= offset || i < end_pos
                    };
                    assert_eq!(
                        history.is_valid(i),
                        expected,
                        "window [{offset}, {end_pos}) at index {i}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut dom = Dom::new();
        let mut history = History::new(HistoryOptions { capacity: 3 });

        for _ in 0..5 {
            push_marker(&mut history, &mut dom);
        }
        // Only `capacity` batches stay reachable; memory is bounded by
        // the slot array.
        assert_eq!(history.len(), 3);

        let mut undone = 0;
        while history.undo(&mut dom).unwrap() {
            undone += 1;
        }
        assert_eq!(undone, 3);
    }

    #[test]
    fn test_branch_push_discards_redo() {
        let mut dom = Dom::new();
        let mut history = History::new(HistoryOptions { capacity: 8 });

        push_marker(&mut history, &mut dom);
        push_marker(&mut history, &mut dom);
        push_marker(&mut history, &mut dom);

        assert!(history.undo(&mut dom).unwrap());
        assert!(history.undo(&mut dom).unwrap());
        assert!(history.can_redo());

        // A new edit after undo starts a branch: redo history is gone.
        push_marker(&mut history, &mut dom);
        assert!(!history.can_redo());
        assert!(!history.redo(&mut dom).unwrap());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_append_to_last_merges_records() {
        let mut dom = Dom::new();
        let mut history = History::new(HistoryOptions { capacity: 8 });

        push_marker(&mut history, &mut dom);
        let record = structural_marker(&mut dom);
        history.push(vec![record], None, None, true);

        assert_eq!(history.len(), 1);
        assert_eq!(history.last_batch().unwrap().records.len(), 2);
    }

    #[test]
    fn test_append_to_last_without_valid_slot_allocates() {
        let mut dom = Dom::new();
        let mut history = History::new(HistoryOptions { capacity: 8 });

        let record = structural_marker(&mut dom);
        history.push(vec![record], None, None, true);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_undo_boundary_is_noop() {
        let mut dom = Dom::new();
        let root = dom.root();
        let mut history = History::new(HistoryOptions { capacity: 4 });

        let before = dom.markup(root);
        assert!(!history.undo(&mut dom).unwrap());
        assert!(!history.redo(&mut dom).unwrap());
        assert_eq!(dom.markup(root), before);
    }

    #[test]
    fn test_structural_replay_round_trip() {
        let mut dom = Dom::new();
        let root = dom.root();
        let p = dom.create_paragraph();
        let text = dom.create_text("hi");
        dom.insert_before(root, p, None).unwrap();
        dom.insert_before(p, text, None).unwrap();

        let mut history = History::new(HistoryOptions::default());
        history.push(
            vec![
                EditRecord::Structural {
                    target: root,
                    added: vec![p],
                    removed: Vec::new(),
                    prev_sibling: None,
                    next_sibling: None,
                },
                EditRecord::Structural {
                    target: p,
                    added: vec![text],
                    removed: Vec::new(),
                    prev_sibling: None,
                    next_sibling: None,
                },
            ],
            None,
            None,
            false,
        );

        assert!(history.undo(&mut dom).unwrap());
        assert_eq!(dom.markup(root), "<body/>");

        assert!(history.redo(&mut dom).unwrap());
        assert_eq!(dom.markup(root), "<body><p>hi</p></body>");
    }

    #[test]
    fn test_undo_restores_caret_snapshot() {
        let mut dom = Dom::new();
        let root = dom.root();
        let text = dom.create_text("ab");
        dom.insert_before(root, text, None).unwrap();
        dom.set_text_value(text, "abc").unwrap();

        let before = CaretAnchor::collapsed(text, 2);
        let after = CaretAnchor::collapsed(text, 3);
        dom.set_caret(after);

        let mut history = History::new(HistoryOptions::default());
        history.push(
            vec![EditRecord::TextContent {
                target: text,
                old_value: "ab".to_string(),
                new_value: None,
            }],
            Some(before),
            Some(after),
            false,
        );

        history.undo(&mut dom).unwrap();
        assert_eq!(dom.text_value(text), "ab");
        assert_eq!(dom.caret(), Some(before));

        history.redo(&mut dom).unwrap();
        assert_eq!(dom.text_value(text), "abc");
        assert_eq!(dom.caret(), Some(after));
    }
}
