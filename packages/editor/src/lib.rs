//! # Scribble Editor
//!
//! An observing undo engine for a structured document tree: it watches a
//! live [`Dom`] for arbitrary edits, without assuming who made them,
//! normalizes each batch against a small document schema, and keeps a
//! ring-buffer history that can replay every batch in either direction.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ scribble-dom: live tree + selection +       │
//! │ change notification                         │
//! └─────────────────────────────────────────────┘
//!                     ↓ raw mutations
//! ┌─────────────────────────────────────────────┐
//! │ capture: batch raw mutations, composition   │
//! │ policy, suspend self-observation            │
//! └─────────────────────────────────────────────┘
//!                     ↓ records
//! ┌─────────────────────────────────────────────┐
//! │ normalize: rewrite tree + records + caret   │
//! │ until the schema holds                      │
//! └─────────────────────────────────────────────┘
//!                     ↓ one batch
//! ┌─────────────────────────────────────────────┐
//! │ history: ring buffer, undo/redo replay,     │
//! │ caret restore                               │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The tree is the source of truth**: records reference live nodes,
//!    they never copy content. Forward values are captured lazily at
//!    first undo.
//! 2. **Capture is passive**: any edit source (keyboard glue, gestures,
//!    paste handlers) just mutates the tree; the controller logs whatever
//!    arrives through the notification queue.
//! 3. **Replay is silent**: undo, redo, normalization and composition
//!    rollback suspend self-observation around every tree edit.
//! 4. **Boundaries are no-ops**: undo/redo past the history window, a
//!    zero-capacity history, a batch with no applicable schema rule:
//!    none of these are errors.
//!
//! ## Usage
//!
//! ```rust
//! use scribble_dom::Dom;
//! use scribble_editor::{CaptureController, HistoryOptions};
//!
//! let mut dom = Dom::new();
//! let mut controller = CaptureController::attach(&mut dom, HistoryOptions::default());
//!
//! // Any edit source mutates the tree...
//! let root = dom.root();
//! let text = dom.create_text("hello");
//! dom.insert_before(root, text, None).unwrap();
//!
//! // ...the host flushes on its notification turn...
//! controller.flush(&mut dom).unwrap();
//!
//! // ...and the edit (normalized into a paragraph) can be undone.
//! assert!(controller.undo(&mut dom).unwrap());
//! ```

mod capture;
mod errors;
mod gestures;
mod history;
mod normalize;
mod records;

pub use capture::CaptureController;
pub use errors::EditorError;
pub use gestures::{insert_line_break, split_paragraph};
pub use history::{History, HistoryOptions};
pub use normalize::normalize;
pub use records::{EditBatch, EditRecord};

// Re-export the substrate types callers hold alongside the engine.
pub use scribble_dom::{AttrName, CaretAnchor, Dom, NodeId, ObserveOptions, RawMutation};
