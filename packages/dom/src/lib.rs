//! # Scribble DOM
//!
//! The live document tree the Scribble editing engine observes and edits:
//! an arena of element/character-data nodes under a fixed editable root,
//! a selection slot holding plain [`CaretAnchor`] value snapshots, and a
//! change-notification layer of explicitly owned observers.
//!
//! The engine (`scribble-editor`) consumes three capabilities from here:
//!
//! - **Tree**: kind queries, navigation, ordered child-list mutation,
//!   namespaced attributes, text values, and creation of the two schema
//!   element kinds (paragraph container, line-break marker).
//! - **Selection**: read/write the caret as a value snapshot.
//! - **Change notification**: per-observer queues of [`RawMutation`]s
//!   with old values and capture-time sibling anchors, drained in atomic
//!   batches.
//!
//! Nothing here knows about undo, normalization or batching policy; that
//! all lives on the editor side.

mod error;
mod node;
mod observer;
mod selection;
mod tree;

pub use error::DomError;
pub use node::{AttrName, NodeId, NodeKind, GENERIC_CONTAINER_TAGS, LINE_BREAK_TAG, PARAGRAPH_TAG};
pub use observer::{ObserveOptions, ObserverId, RawMutation};
pub use selection::CaretAnchor;
pub use tree::Dom;
