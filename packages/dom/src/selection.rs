//! Caret anchors and the selection slot.
//!
//! A [`CaretAnchor`] is a plain value snapshot of a selection (container
//! ids plus offsets), never a live handle into a host selection API.
//! Offsets count chars in character-data nodes and child positions in
//! elements. Conversion to and from whatever the host renders is the
//! host's concern; inside the engine only this value type circulates.

use crate::{Dom, NodeId};
use serde::{Deserialize, Serialize};

/// Value snapshot of a selection's start and end positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaretAnchor {
    pub start_container: NodeId,
    pub start_offset: usize,
    pub end_container: NodeId,
    pub end_offset: usize,
}

impl CaretAnchor {
    /// A collapsed caret: start and end at the same position.
    pub fn collapsed(container: NodeId, offset: usize) -> Self {
        Self {
            start_container: container,
            start_offset: offset,
            end_container: container,
            end_offset: offset,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start_container == self.end_container && self.start_offset == self.end_offset
    }
}

impl Dom {
    /// Read the current caret as a value snapshot, if a selection exists.
    pub fn caret(&self) -> Option<CaretAnchor> {
        self.selection
    }

    /// Set the caret from a snapshot.
    ///
    /// Re-setting an identical anchor is meaningful: hosts that key their
    /// rendered caret off anchor identity need the assignment to notice a
    /// tree that changed around an unchanged anchor.
    pub fn set_caret(&mut self, caret: CaretAnchor) {
        self.selection = Some(caret);
    }

    pub fn clear_caret(&mut self) {
        self.selection = None;
    }
}
