//! Schema enforcement through the full capture pipeline: raw edits in,
//! normalized tree and log out.

use anyhow::Result;
use scribble_dom::{CaretAnchor, Dom};
use scribble_editor::{CaptureController, EditRecord, HistoryOptions};

fn editor() -> (Dom, CaptureController) {
    let mut dom = Dom::new();
    let controller = CaptureController::attach(&mut dom, HistoryOptions::default());
    (dom, controller)
}

#[test]
fn test_bare_text_under_root_is_wrapped_and_relogged() -> Result<()> {
    let (mut dom, mut controller) = editor();
    let root = dom.root();

    let text = dom.create_text("hi");
    dom.insert_before(root, text, None)?;
    controller.flush(&mut dom)?;

    assert_eq!(dom.markup(root), "<body><p>hi</p></body>");

    // Exactly one structural record, targeting the synthetic paragraph
    // with the text as its sole added node; no record mentions the root.
    let batch = controller.last_batch().expect("one batch logged");
    assert_eq!(batch.records.len(), 1);
    match &batch.records[0] {
        EditRecord::Structural { target, added, .. } => {
            assert!(dom.is_paragraph(*target));
            assert_ne!(*target, root);
            assert_eq!(added, &[text]);
        }
        other => panic!("expected structural record, got {:?}", other),
    }

    // Undoing removes the text but leaves the synthesized paragraph: its
    // insertion was never part of the log.
    assert!(controller.undo(&mut dom)?);
    assert_eq!(dom.markup(root), "<body><p/></body>");

    assert!(controller.redo(&mut dom)?);
    assert_eq!(dom.markup(root), "<body><p>hi</p></body>");
    Ok(())
}

#[test]
fn test_trailing_break_in_empty_paragraph_doubles() -> Result<()> {
    let (mut dom, mut controller) = editor();
    let root = dom.root();
    let para = dom.create_paragraph();
    dom.insert_before(root, para, None)?;
    controller.flush(&mut dom)?;

    let br = dom.create_line_break();
    dom.insert_before(para, br, None)?;
    controller.flush(&mut dom)?;

    assert_eq!(dom.markup(para), "<p><br/><br/></p>");

    // Both breaks live in one record: a single undo removes them both.
    assert!(controller.undo(&mut dom)?);
    assert_eq!(dom.markup(para), "<p/>");
    Ok(())
}

#[test]
fn test_root_level_break_joins_preceding_paragraph() -> Result<()> {
    let (mut dom, mut controller) = editor();
    let root = dom.root();
    let para = dom.create_paragraph();
    let text = dom.create_text("line");
    dom.insert_before(para, text, None)?;
    dom.insert_before(root, para, None)?;
    controller.flush(&mut dom)?;

    let br = dom.create_line_break();
    dom.insert_before(root, br, None)?;
    controller.flush(&mut dom)?;

    assert_eq!(dom.markup(root), "<body><p>line<br/><br/></p></body>");
    assert!(controller.undo(&mut dom)?);
    assert_eq!(dom.markup(root), "<body><p>line</p></body>");
    Ok(())
}

#[test]
fn test_pasted_container_becomes_paragraph() -> Result<()> {
    let (mut dom, mut controller) = editor();
    let root = dom.root();

    // A paste handler drops a generic container at the root.
    let div = dom.create_element("div");
    let text = dom.create_text("pasted");
    dom.insert_before(div, text, None)?;
    dom.insert_before(root, div, None)?;
    controller.flush(&mut dom)?;

    assert_eq!(dom.markup(root), "<body><p>pasted</p></body>");
    assert_eq!(dom.parent(div), None, "the wrapper is discarded");

    // Unlike bare text, the replacement paragraph is itself the logged
    // insertion, so undo removes it wholesale.
    assert!(controller.undo(&mut dom)?);
    assert_eq!(dom.markup(root), "<body/>");

    assert!(controller.redo(&mut dom)?);
    assert_eq!(dom.markup(root), "<body><p>pasted</p></body>");
    Ok(())
}

#[test]
fn test_nested_paragraph_is_unwrapped() -> Result<()> {
    let (mut dom, mut controller) = editor();
    let root = dom.root();
    let outer = dom.create_paragraph();
    let text = dom.create_text("a");
    dom.insert_before(outer, text, None)?;
    dom.insert_before(root, outer, None)?;
    controller.flush(&mut dom)?;

    let inner = dom.create_paragraph();
    let inner_text = dom.create_text("b");
    dom.insert_before(inner, inner_text, None)?;
    dom.insert_before(outer, inner, None)?;
    controller.flush(&mut dom)?;

    assert_eq!(dom.markup(root), "<body><p>ab</p></body>");
    assert_eq!(dom.parent(inner), None);

    assert!(controller.undo(&mut dom)?);
    assert_eq!(dom.markup(root), "<body><p>a</p></body>");

    assert!(controller.redo(&mut dom)?);
    assert_eq!(dom.markup(root), "<body><p>ab</p></body>");
    Ok(())
}

#[test]
fn test_caret_follows_wrapped_text() -> Result<()> {
    let (mut dom, mut controller) = editor();
    let root = dom.root();

    // Caret sits at the root child list where the text lands.
    dom.set_caret(CaretAnchor::collapsed(root, 0));
    controller.track_caret(&dom);

    let text = dom.create_text("hi");
    dom.insert_before(root, text, None)?;
    dom.set_caret(CaretAnchor::collapsed(root, 1));
    controller.flush(&mut dom)?;

    // The endpoint pointing into the moved range was rewritten into the
    // synthesized paragraph.
    let caret = dom.caret().expect("caret survives normalization");
    assert!(dom.is_paragraph(caret.start_container));
    assert_eq!(caret.start_offset, 1);
    Ok(())
}

#[test]
fn test_normalization_is_idempotent_through_capture() -> Result<()> {
    let (mut dom, mut controller) = editor();
    let root = dom.root();

    let text = dom.create_text("hi");
    dom.insert_before(root, text, None)?;
    controller.flush(&mut dom)?;
    let normalized = dom.markup(root);
    let batches = controller.history_len();

    // A conformant follow-up edit re-enters the pipeline untouched.
    dom.set_text_value(text, "hi there")?;
    controller.flush(&mut dom)?;

    assert_eq!(controller.history_len(), batches + 1);
    assert_eq!(dom.markup(root), normalized.replace("hi", "hi there"));
    Ok(())
}
