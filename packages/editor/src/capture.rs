//! # Capture Controller
//!
//! Owns the subscription to tree-change notifications and turns raw
//! mutation streams into normalized, logged batches.
//!
//! ## Design
//!
//! - One long-lived *live* observer covers children + attributes + text
//!   across the whole editable subtree, old values included. A second,
//!   short-lived *scratch* observer exists only while an input-method
//!   composition is open. Both are explicitly owned handles on the
//!   controller; there is no ambient subscription state.
//! - `flush` drains the live observer; everything drained together is one
//!   atomic batch. The batch is normalized (which edits the tree) and
//!   pushed as a single undo step.
//! - Replay and normalization must never be observed as new input. Every
//!   programmatic mutation runs inside a [`SuspendCapture`] guard that
//!   disables the controller's observers and restores them on drop, on
//!   every exit path, early returns and panics included.
//! - **Composition**: while a composition is open the controller captures
//!   structural changes only, into the scratch observer, and freezes
//!   caret tracking at the composition-start caret. A non-empty commit
//!   becomes one batch (scratch records plus one synthesized text record
//!   carrying the frozen old value). An empty commit schedules a deferred
//!   rollback: on the host's next idle turn the scratch records are
//!   reverse-applied against the tree and nothing is logged. A new
//!   composition starting first runs the pending rollback, so sessions
//!   sequence deterministically.

use crate::history::{revert_record, History, HistoryOptions};
use crate::normalize::normalize;
use crate::records::{EditBatch, EditRecord};
use crate::EditorError;
use scribble_dom::{CaretAnchor, Dom, NodeId, ObserveOptions, ObserverId};
use std::ops::{Deref, DerefMut};

/// Scoped suspension of the controller's own observers.
///
/// Disables each observer on construction and restores its previous state
/// on drop, so a replay aborted by `?` still resumes capture.
struct SuspendCapture<'a> {
    dom: &'a mut Dom,
    saved: Vec<(ObserverId, bool)>,
}

impl<'a> SuspendCapture<'a> {
    fn new(dom: &'a mut Dom, observers: &[ObserverId]) -> Self {
        let saved = observers
            .iter()
            .map(|&id| (id, dom.set_observer_enabled(id, false)))
            .collect();
        Self { dom, saved }
    }
}

impl Deref for SuspendCapture<'_> {
    type Target = Dom;

    fn deref(&self) -> &Dom {
        self.dom
    }
}

impl DerefMut for SuspendCapture<'_> {
    fn deref_mut(&mut self) -> &mut Dom {
        self.dom
    }
}

impl Drop for SuspendCapture<'_> {
    fn drop(&mut self) {
        for &(id, was_enabled) in &self.saved {
            self.dom.set_observer_enabled(id, was_enabled);
        }
    }
}

#[derive(Debug)]
struct Composition {
    scratch: ObserverId,
    start_caret: Option<CaretAnchor>,
    /// The caret's text container and its value at composition start,
    /// when the caret sat in a text node.
    frozen_text: Option<(NodeId, String)>,
}

#[derive(Debug)]
struct DeferredRollback {
    generation: u64,
    scratch: ObserverId,
}

/// Observes a [`Dom`], batches its raw mutations, normalizes them and
/// feeds the undo history.
#[derive(Debug)]
pub struct CaptureController {
    live: ObserverId,
    history: History,
    /// Caret as last observed outside replay; the next batch's
    /// before-position.
    last_caret: Option<CaretAnchor>,
    composition: Option<Composition>,
    deferred_rollback: Option<DeferredRollback>,
    rollback_generation: u64,
}

impl CaptureController {
    /// Subscribe to `dom` and start capturing.
    pub fn attach(dom: &mut Dom, options: HistoryOptions) -> Self {
        let live = dom.observe(ObserveOptions::all());
        Self {
            live,
            history: History::new(options),
            last_caret: dom.caret(),
            composition: None,
            deferred_rollback: None,
            rollback_generation: 0,
        }
    }

    /// Unsubscribe everything.
    pub fn detach(self, dom: &mut Dom) {
        dom.disconnect(self.live);
        if let Some(composition) = self.composition {
            dom.disconnect(composition.scratch);
        }
        if let Some(pending) = self.deferred_rollback {
            dom.disconnect(pending.scratch);
        }
    }

    fn observer_ids(&self) -> Vec<ObserverId> {
        let mut ids = vec![self.live];
        if let Some(composition) = &self.composition {
            ids.push(composition.scratch);
        }
        if let Some(pending) = &self.deferred_rollback {
            ids.push(pending.scratch);
        }
        ids
    }

    /// Record the host's current caret as the next batch's
    /// before-position. Frozen while a composition (or its deferred
    /// rollback) is open.
    pub fn track_caret(&mut self, dom: &Dom) {
        if self.composition.is_some() || self.deferred_rollback.is_some() {
            return;
        }
        self.last_caret = dom.caret();
    }

    /// Drain pending raw mutations, normalize them, and log the result as
    /// one batch. The host calls this once per notification turn; an
    /// arbitrary number of edits may have accumulated.
    pub fn flush(&mut self, dom: &mut Dom) -> Result<(), EditorError> {
        if self.composition.is_some() || self.deferred_rollback.is_some() {
            return Ok(());
        }
        let raw = dom.take_records(self.live);
        if raw.is_empty() {
            return Ok(());
        }
        let mut records: Vec<EditRecord> = raw.into_iter().map(EditRecord::from).collect();
        let before_caret = self.last_caret;
        let mut caret = dom.caret();
        {
            let mut suspended = SuspendCapture::new(dom, &[self.live]);
            normalize(&mut suspended, &mut records, &mut caret)?;
        }
        let after_caret = dom.caret();
        self.history.push(records, before_caret, after_caret, false);
        self.last_caret = after_caret;
        Ok(())
    }

    /// Undo one step. Pending raw mutations are flushed first. Returns
    /// `Ok(false)` at the history boundary, or during an open
    /// composition.
    pub fn undo(&mut self, dom: &mut Dom) -> Result<bool, EditorError> {
        if self.composition.is_some() {
            return Ok(false);
        }
        self.flush(dom)?;
        let ids = self.observer_ids();
        let undone = {
            let mut suspended = SuspendCapture::new(dom, &ids);
            self.history.undo(&mut suspended)?
        };
        if undone {
            self.last_caret = dom.caret();
        }
        Ok(undone)
    }

    /// Redo one step. Same conventions as [`CaptureController::undo`].
    pub fn redo(&mut self, dom: &mut Dom) -> Result<bool, EditorError> {
        if self.composition.is_some() {
            return Ok(false);
        }
        self.flush(dom)?;
        let ids = self.observer_ids();
        let redone = {
            let mut suspended = SuspendCapture::new(dom, &ids);
            self.history.redo(&mut suspended)?
        };
        if redone {
            self.last_caret = dom.caret();
        }
        Ok(redone)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn is_composing(&self) -> bool {
        self.composition.is_some()
    }

    /// The newest logged batch, if any.
    pub fn last_batch(&self) -> Option<&EditBatch> {
        self.history.last_batch()
    }

    /// Number of batches reachable by undo plus redo.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Begin an input-method composition session: switch to structural
    /// scratch capture and freeze caret tracking.
    pub fn composition_start(&mut self, dom: &mut Dom) -> Result<(), EditorError> {
        if self.composition.is_some() {
            return Ok(());
        }
        // A still-pending cancellation rollback runs first, so the new
        // session starts from the rolled-back tree.
        self.run_deferred(dom)?;
        self.flush(dom)?;

        let start_caret = dom.caret();
        let frozen_text = start_caret.and_then(|anchor| {
            dom.is_text(anchor.start_container).then(|| {
                (
                    anchor.start_container,
                    dom.text_value(anchor.start_container).to_string(),
                )
            })
        });
        dom.set_observer_enabled(self.live, false);
        let scratch = dom.observe(ObserveOptions::children_only());
        self.composition = Some(Composition {
            scratch,
            start_caret,
            frozen_text,
        });
        self.last_caret = start_caret;
        tracing::debug!("composition started");
        Ok(())
    }

    /// End a composition session with the committed text.
    ///
    /// A non-empty commit is logged as one batch. An empty commit is a
    /// cancellation: the in-progress edits are rolled back on the next
    /// call to [`CaptureController::run_deferred`] and nothing is logged.
    pub fn composition_end(&mut self, dom: &mut Dom, committed: &str) -> Result<(), EditorError> {
        let Some(composition) = self.composition.take() else {
            return Ok(());
        };
        if committed.is_empty() {
            self.rollback_generation += 1;
            self.deferred_rollback = Some(DeferredRollback {
                generation: self.rollback_generation,
                scratch: composition.scratch,
            });
            tracing::debug!("composition cancelled, rollback deferred");
            return Ok(());
        }

        let raw = dom.take_records(composition.scratch);
        dom.disconnect(composition.scratch);
        let mut records: Vec<EditRecord> = raw.into_iter().map(EditRecord::from).collect();
        if let Some((target, old_value)) = composition.frozen_text {
            // One synthesized text record makes the whole commit, however
            // many keystrokes it coalesced, a single undo step.
            records.push(EditRecord::TextContent {
                target,
                old_value,
                new_value: None,
            });
        }

        dom.set_observer_enabled(self.live, true);
        if records.is_empty() {
            self.last_caret = dom.caret();
            return Ok(());
        }

        let before_caret = composition.start_caret;
        let mut caret = dom.caret();
        {
            let mut suspended = SuspendCapture::new(dom, &[self.live]);
            normalize(&mut suspended, &mut records, &mut caret)?;
        }
        let after_caret = dom.caret();
        tracing::debug!(records = records.len(), "composition committed as one batch");
        self.history.push(records, before_caret, after_caret, false);
        self.last_caret = after_caret;
        Ok(())
    }

    /// Run a deferred composition rollback, if one is scheduled. The host
    /// calls this on its next idle turn after `composition_end`; calling
    /// it with nothing scheduled is a no-op.
    pub fn run_deferred(&mut self, dom: &mut Dom) -> Result<(), EditorError> {
        let Some(pending) = self.deferred_rollback.take() else {
            return Ok(());
        };
        if pending.generation != self.rollback_generation {
            // Stale token: a newer session superseded this rollback.
            dom.disconnect(pending.scratch);
            return Ok(());
        }
        let raw = dom.take_records(pending.scratch);
        dom.disconnect(pending.scratch);
        let mut records: Vec<EditRecord> = raw.into_iter().map(EditRecord::from).collect();

        // Reverse-apply directly against the tree; the live observer is
        // still off from composition start, so nothing is logged. Capture
        // resumes even if replay fails.
        let outcome = records
            .iter_mut()
            .rev()
            .try_for_each(|record| revert_record(dom, record));
        dom.set_observer_enabled(self.live, true);
        self.last_caret = dom.caret();
        outcome?;
        tracing::debug!(records = records.len(), "cancelled composition rolled back");
        Ok(())
    }
}
