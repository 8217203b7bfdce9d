//! # Tree Normalization
//!
//! Rewrites a freshly captured batch, and the live tree, so the tree
//! satisfies the document schema before anything is logged.
//!
//! ## Schema
//!
//! - No bare text and no line breaks directly under the editable root;
//!   content lives in paragraph containers.
//! - Paragraphs never nest.
//! - A lone trailing line break does not render a visible empty line; two
//!   in a row do, so trailing breaks are padded.
//!
//! ## Design
//!
//! The pass walks the batch's structural records. For each inserted node
//! that is still a child of its recorded target (an earlier rewrite may
//! have relocated it; liveness is re-checked every time), the first
//! matching rule fires, and the possibly-replaced node is re-matched until
//! no rule applies. Every rewrite that deletes, replaces or relocates a
//! node also:
//!
//! - rewrites later records in the batch that reference it as a target or
//!   sibling anchor (forward-only scan),
//! - drops later non-structural records whose target died with a removed
//!   wrapper,
//! - translates the caret snapshot through the move, and
//! - reasserts the caret at the end of the pass, because a caret whose
//!   anchors are unchanged in identity still needs re-rendering when the
//!   tree around it changed.
//!
//! The caller must have capture suspended: the pass edits the tree and
//! those edits must not be observed as new input.

use crate::records::EditRecord;
use crate::EditorError;
use scribble_dom::{CaretAnchor, Dom, NodeId};

enum Outcome {
    NoMatch,
    Rewritten,
    RecordDropped,
}

/// How later records should be rewritten after a structural rewrite.
enum Relink {
    /// `node` was deleted and `replacement` occupies its former position;
    /// `node`'s former children (if any) now live under `new_target`.
    Replaced {
        node: NodeId,
        replacement: NodeId,
        new_target: NodeId,
    },
    /// `node` itself moved from `old_parent` to `new_parent`, identity
    /// preserved.
    Relocated {
        node: NodeId,
        old_parent: NodeId,
        new_parent: NodeId,
    },
    /// `node` was deleted and its children spliced into `parent` at its
    /// former position.
    Unwrapped {
        node: NodeId,
        parent: NodeId,
        first_child: Option<NodeId>,
        last_child: Option<NodeId>,
        former_prev: Option<NodeId>,
        former_next: Option<NodeId>,
    },
}

/// Normalize a batch against the live tree.
///
/// Idempotent: running it on a batch whose nodes already satisfy the
/// schema rewrites nothing.
pub fn normalize(
    dom: &mut Dom,
    records: &mut Vec<EditRecord>,
    caret: &mut Option<CaretAnchor>,
) -> Result<(), EditorError> {
    let mut i = 0;
    while i < records.len() {
        if !records[i].is_structural() {
            i += 1;
            continue;
        }
        let mut j = 0;
        let mut record_dropped = false;
        loop {
            let EditRecord::Structural { target, added, .. } = &records[i] else {
                break;
            };
            let target = *target;
            let Some(&node) = added.get(j) else {
                break;
            };
            if dom.parent(node) != Some(target) {
                // Relocated by an earlier rule in this pass; nothing to do.
                j += 1;
                continue;
            }
            match apply_first_rule(dom, records, caret, i, j, node, target)? {
                Outcome::NoMatch => j += 1,
                // Re-match the (possibly replaced) node at the same slot.
                Outcome::Rewritten => {}
                Outcome::RecordDropped => {
                    record_dropped = true;
                    break;
                }
            }
        }
        if !record_dropped {
            i += 1;
        }
    }

    if let Some(anchor) = *caret {
        dom.set_caret(anchor);
    }
    Ok(())
}

fn apply_first_rule(
    dom: &mut Dom,
    records: &mut Vec<EditRecord>,
    caret: &mut Option<CaretAnchor>,
    i: usize,
    j: usize,
    node: NodeId,
    target: NodeId,
) -> Result<Outcome, EditorError> {
    let root = dom.root();

    // Rule 1: bare text directly under the root gets a paragraph.
    if dom.is_text(node) && target == root {
        wrap_in_paragraph(dom, records, caret, i, node)?;
        return Ok(Outcome::Rewritten);
    }

    // Rule 2: a root-level generic container (or non-element) holding
    // text becomes a paragraph; its children are kept, the wrapper is not.
    if target == root
        && dom.has_text_descendant(node)
        && (!dom.is_element(node) || dom.is_generic_container(node))
    {
        return replace_with_paragraph(dom, records, caret, i, j, node);
    }

    // Rule 3: a root-level wrapper around a single line break is deleted
    // and the break spliced into its position.
    if target == root
        && dom.is_element(node)
        && !dom.is_paragraph(node)
        && dom.child_count(node) == 1
        && dom.is_line_break(dom.children(node)[0])
    {
        return unwrap_break_wrapper(dom, records, caret, i, j, node);
    }

    // Rule 4: a line break directly under the root belongs to the
    // preceding paragraph, or to a fresh one.
    if dom.is_line_break(node) && target == root {
        lift_root_break(dom, records, caret, i, node)?;
        return Ok(Outcome::Rewritten);
    }

    // Rule 5: a trailing line break not preceded by another line break
    // gets a synthetic twin, so the empty line it opens actually renders.
    if dom.is_line_break(node)
        && dom.next_sibling(node).is_none()
        && dom.prev_sibling(node).map(|p| !dom.is_line_break(p)).unwrap_or(true)
    {
        pad_trailing_break(dom, records, caret, i, node)?;
        return Ok(Outcome::Rewritten);
    }

    // Rule 6: paragraphs never nest; an inner paragraph is unwrapped.
    if dom.is_paragraph(node) && has_paragraph_ancestor(dom, node) {
        return unwrap_nested_paragraph(dom, records, caret, i, j, node);
    }

    Ok(Outcome::NoMatch)
}

fn has_paragraph_ancestor(dom: &Dom, node: NodeId) -> bool {
    let mut cursor = dom.parent(node);
    while let Some(id) = cursor {
        if dom.is_paragraph(id) {
            return true;
        }
        cursor = dom.parent(id);
    }
    false
}

/// Rules 1 and 4 (no preceding paragraph): move a lone root-level node
/// into a synthesized paragraph and redirect its insertion record there.
///
/// The paragraph's own root-level insertion stays out of the log: the
/// logged step is "content entered the paragraph", and undoing it leaves
/// the empty paragraph behind.
fn wrap_in_paragraph(
    dom: &mut Dom,
    records: &mut Vec<EditRecord>,
    caret: &mut Option<CaretAnchor>,
    i: usize,
    node: NodeId,
) -> Result<(), EditorError> {
    let root = dom.root();
    let Some(idx) = dom.index_of(root, node) else {
        return Ok(());
    };
    let para = dom.create_paragraph();
    dom.insert_before(root, para, Some(node))?;
    dom.remove_child(root, node)?;
    dom.insert_before(para, node, None)?;

    if let EditRecord::Structural {
        target,
        prev_sibling,
        next_sibling,
        ..
    } = &mut records[i]
    {
        *target = para;
        *prev_sibling = None;
        *next_sibling = None;
    }
    move_caret_range(caret, root, idx, 1, para, 0, 1);
    relink_later_records(
        records,
        i + 1,
        &Relink::Relocated {
            node,
            old_parent: root,
            new_parent: para,
        },
    );
    tracing::debug!(?node, ?para, "wrapped root-level node in a paragraph");
    Ok(())
}

/// Rule 2.
fn replace_with_paragraph(
    dom: &mut Dom,
    records: &mut Vec<EditRecord>,
    caret: &mut Option<CaretAnchor>,
    i: usize,
    j: usize,
    node: NodeId,
) -> Result<Outcome, EditorError> {
    let root = dom.root();
    let para = dom.create_paragraph();
    dom.insert_before(root, para, Some(node))?;
    let kids: Vec<NodeId> = dom.children(node).to_vec();
    for &kid in &kids {
        dom.remove_child(node, kid)?;
        dom.insert_before(para, kid, None)?;
    }
    dom.remove_child(root, node)?;

    if let EditRecord::Structural { added, .. } = &mut records[i] {
        added[j] = para;
    }
    remap_caret_container(caret, node, para, 0);
    relink_later_records(
        records,
        i + 1,
        &Relink::Replaced {
            node,
            replacement: para,
            new_target: para,
        },
    );
    tracing::debug!(?node, ?para, "replaced root-level container with a paragraph");
    Ok(Outcome::Rewritten)
}

/// Rule 3: expand and delete the wrapper.
fn unwrap_break_wrapper(
    dom: &mut Dom,
    records: &mut Vec<EditRecord>,
    caret: &mut Option<CaretAnchor>,
    i: usize,
    j: usize,
    node: NodeId,
) -> Result<Outcome, EditorError> {
    let root = dom.root();
    let Some(idx) = dom.index_of(root, node) else {
        return Ok(Outcome::NoMatch);
    };
    let Some(br) = dom.first_child(node) else {
        return Ok(Outcome::NoMatch);
    };
    dom.remove_child(node, br)?;
    dom.insert_before(root, br, Some(node))?;
    dom.remove_child(root, node)?;

    if let EditRecord::Structural { added, .. } = &mut records[i] {
        added[j] = br;
    }
    remap_caret_container(caret, node, root, idx as isize);
    relink_later_records(
        records,
        i + 1,
        &Relink::Replaced {
            node,
            replacement: br,
            new_target: root,
        },
    );
    tracing::debug!(?node, ?br, "unwrapped single line-break wrapper");
    Ok(Outcome::Rewritten)
}

/// Rule 4.
fn lift_root_break(
    dom: &mut Dom,
    records: &mut Vec<EditRecord>,
    caret: &mut Option<CaretAnchor>,
    i: usize,
    br: NodeId,
) -> Result<(), EditorError> {
    let root = dom.root();
    let Some(idx) = dom.index_of(root, br) else {
        return Ok(());
    };
    let preceding = if idx > 0 {
        Some(dom.children(root)[idx - 1])
    } else {
        None
    };
    match preceding.filter(|&p| dom.is_paragraph(p)) {
        Some(para) => {
            let dest = dom.child_count(para);
            dom.remove_child(root, br)?;
            dom.insert_before(para, br, None)?;
            let new_prev = dom.prev_sibling(br);
            if let EditRecord::Structural {
                target,
                prev_sibling,
                next_sibling,
                ..
            } = &mut records[i]
            {
                *target = para;
                *prev_sibling = new_prev;
                *next_sibling = None;
            }
            move_caret_range(caret, root, idx, 1, para, dest, 0);
            relink_later_records(
                records,
                i + 1,
                &Relink::Relocated {
                    node: br,
                    old_parent: root,
                    new_parent: para,
                },
            );
            tracing::debug!(?br, ?para, "moved root-level line break into preceding paragraph");
        }
        None => wrap_in_paragraph(dom, records, caret, i, br)?,
    }
    Ok(())
}

/// Rule 5.
fn pad_trailing_break(
    dom: &mut Dom,
    records: &mut Vec<EditRecord>,
    caret: &mut Option<CaretAnchor>,
    i: usize,
    br: NodeId,
) -> Result<(), EditorError> {
    let Some(parent) = dom.parent(br) else {
        return Ok(());
    };
    let insert_at = dom.child_count(parent);
    let filler = dom.create_line_break();
    dom.insert_before(parent, filler, None)?;

    // The twin joins the same record, in document order.
    if let EditRecord::Structural { added, .. } = &mut records[i] {
        added.push(filler);
    }
    shift_caret_offsets(caret, parent, insert_at, 1);
    tracing::debug!(?br, ?filler, "padded trailing line break");
    Ok(())
}

/// Rule 6.
fn unwrap_nested_paragraph(
    dom: &mut Dom,
    records: &mut Vec<EditRecord>,
    caret: &mut Option<CaretAnchor>,
    i: usize,
    j: usize,
    node: NodeId,
) -> Result<Outcome, EditorError> {
    let Some(parent) = dom.parent(node) else {
        return Ok(Outcome::NoMatch);
    };
    let Some(idx) = dom.index_of(parent, node) else {
        return Ok(Outcome::NoMatch);
    };
    let former_prev = dom.prev_sibling(node);
    let former_next = dom.next_sibling(node);
    let kids: Vec<NodeId> = dom.children(node).to_vec();

    dom.remove_child(parent, node)?;
    for &kid in &kids {
        dom.remove_child(node, kid)?;
        dom.insert_before(parent, kid, former_next)?;
    }

    shift_caret_offsets(caret, parent, idx + 1, kids.len() as isize - 1);
    remap_caret_container(caret, node, parent, idx as isize);

    let record_now_empty = if let EditRecord::Structural { added, removed, .. } = &mut records[i] {
        added.remove(j);
        for (k, &kid) in kids.iter().enumerate() {
            added.insert(j + k, kid);
        }
        added.is_empty() && removed.is_empty()
    } else {
        false
    };
    relink_later_records(
        records,
        i + 1,
        &Relink::Unwrapped {
            node,
            parent,
            first_child: kids.first().copied(),
            last_child: kids.last().copied(),
            former_prev,
            former_next,
        },
    );
    tracing::debug!(?node, ?parent, "unwrapped nested paragraph");
    if record_now_empty {
        records.remove(i);
        return Ok(Outcome::RecordDropped);
    }
    Ok(Outcome::Rewritten)
}

// ---- record relinking ------------------------------------------------------

fn relink_later_records(records: &mut Vec<EditRecord>, start: usize, relink: &Relink) {
    let mut idx = start;
    while idx < records.len() {
        let drop_record = match (&mut records[idx], relink) {
            (
                EditRecord::Structural {
                    target,
                    prev_sibling,
                    next_sibling,
                    ..
                },
                Relink::Replaced {
                    node,
                    replacement,
                    new_target,
                },
            ) => {
                if *target == *node {
                    *target = *new_target;
                }
                if *prev_sibling == Some(*node) {
                    *prev_sibling = Some(*replacement);
                }
                if *next_sibling == Some(*node) {
                    *next_sibling = Some(*replacement);
                }
                false
            }
            (
                EditRecord::Structural {
                    target,
                    prev_sibling,
                    next_sibling,
                    ..
                },
                Relink::Relocated {
                    node,
                    old_parent,
                    new_parent,
                },
            ) => {
                // Anchored on the moved node in its old parent: follow it.
                if *target == *old_parent
                    && (*prev_sibling == Some(*node) || *next_sibling == Some(*node))
                {
                    *target = *new_parent;
                }
                false
            }
            (
                EditRecord::Structural {
                    target,
                    prev_sibling,
                    next_sibling,
                    ..
                },
                Relink::Unwrapped {
                    node,
                    parent,
                    first_child,
                    last_child,
                    former_prev,
                    former_next,
                },
            ) => {
                if *target == *node {
                    *target = *parent;
                }
                if *prev_sibling == Some(*node) {
                    *prev_sibling = last_child.or(*former_prev);
                }
                if *next_sibling == Some(*node) {
                    *next_sibling = first_child.or(*former_next);
                }
                false
            }
            (
                EditRecord::Attribute { target, .. } | EditRecord::TextContent { target, .. },
                Relink::Replaced { node, .. } | Relink::Unwrapped { node, .. },
            ) => *target == *node,
            (
                EditRecord::Attribute { .. } | EditRecord::TextContent { .. },
                Relink::Relocated { .. },
            ) => false,
        };
        if drop_record {
            tracing::warn!(index = idx, "dropping record targeting a removed node");
            records.remove(idx);
        } else {
            idx += 1;
        }
    }
}

// ---- caret translation -----------------------------------------------------

fn for_each_endpoint(
    caret: &mut Option<CaretAnchor>,
    mut f: impl FnMut(&mut NodeId, &mut usize),
) {
    if let Some(anchor) = caret.as_mut() {
        f(&mut anchor.start_container, &mut anchor.start_offset);
        f(&mut anchor.end_container, &mut anchor.end_offset);
    }
}

fn offset_add(offset: usize, delta: isize) -> usize {
    if delta < 0 {
        offset.saturating_sub(delta.unsigned_abs())
    } else {
        offset + delta as usize
    }
}

/// Endpoints inside `from` move to `to`, shifted by `delta`.
fn remap_caret_container(
    caret: &mut Option<CaretAnchor>,
    from: NodeId,
    to: NodeId,
    delta: isize,
) {
    for_each_endpoint(caret, |container, offset| {
        if *container == from {
            *container = to;
            *offset = offset_add(*offset, delta);
        }
    });
}

/// Endpoints in `container` at or past `from_index` shift by `delta`
/// (a pure insertion or removal of siblings at that index).
fn shift_caret_offsets(
    caret: &mut Option<CaretAnchor>,
    container: NodeId,
    from_index: usize,
    delta: isize,
) {
    for_each_endpoint(caret, |c, offset| {
        if *c == container && *offset >= from_index {
            *offset = offset_add(*offset, delta);
        }
    });
}

/// `count` children moved out of `old_parent` starting at `first`, into
/// `new_parent` at `dest`; `replaced_by` children took their place.
/// Endpoints inside the moved range follow it; endpoints past it shift by
/// the vacancy.
fn move_caret_range(
    caret: &mut Option<CaretAnchor>,
    old_parent: NodeId,
    first: usize,
    count: usize,
    new_parent: NodeId,
    dest: usize,
    replaced_by: usize,
) {
    for_each_endpoint(caret, |container, offset| {
        if *container != old_parent {
            return;
        }
        if *offset >= first && *offset <= first + count {
            *container = new_parent;
            *offset = *offset - first + dest;
        } else if *offset > first + count {
            *offset = *offset - count + replaced_by;
        }
    });
}
