//! Error types for the editor engine.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("tree error: {0}")]
    Dom(#[from] scribble_dom::DomError),

    /// Redo reached a record whose forward value was never captured.
    /// Forward values are filled in lazily by the first undo, so hitting
    /// this means a caller replayed out of order, a contract violation
    /// surfaced as an error rather than a panic.
    #[error("redo value missing: record was never undone")]
    IncompleteRecord,
}
