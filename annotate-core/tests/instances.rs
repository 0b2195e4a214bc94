//! Multiple Overlays and Teardown
//!
//! Tests overlays sharing one document:
//! - Events reach only the overlay that owns their target
//! - Destroying one overlay leaves the others working
//! - Destroy is idempotent, silent, and restores the image

use std::cell::RefCell;
use std::rc::Rc;

use annotate_core::{
    annotate, AnnotateConfig, AnnotateError, AnnotateImage, AnnotateOptions, Annotation, Document,
    DomEvent, Mode, NodeId, NoteData, Rect,
};

/// Attach an image of the given size to the body.
fn image(doc: &Document, src: &str, width: i32, height: i32) -> NodeId {
    let img = doc.create_image(src, width, height);
    doc.append_child(doc.body(), img);
    img
}

/// Two overlays over two images of one document.
fn two_overlays() -> (Document, AnnotateImage, AnnotateImage) {
    let doc = Document::new();
    let first = image(&doc, "a.jpg", 400, 300);
    let second = image(&doc, "b.jpg", 200, 100);
    let note = Annotation::new("1", Rect::new(10, 10, 40, 40), "shared id").with_editable(true);
    let a = annotate(&doc, first, AnnotateOptions::default().notes(vec![note.clone()]))
        .expect("first overlay");
    let b = annotate(&doc, second, AnnotateOptions::default().notes(vec![note]))
        .expect("second overlay");
    (doc, a, b)
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_scaffold_follows_image() {
    let doc = Document::new();
    let img = image(&doc, "photo.jpg", 640, 480);
    let overlay = annotate(&doc, img, AnnotateConfig::default()).expect("overlay");

    let children = doc.children(doc.body());
    assert_eq!(children, vec![img, overlay.canvas()]);
    assert!(doc.is_hidden(img));
    assert_eq!(doc.style_px(overlay.canvas(), "width"), Some(640));
    assert_eq!(doc.style_px(overlay.edit_overlay(), "height"), Some(480));
    assert_eq!(
        doc.style(overlay.canvas(), "background-image").as_deref(),
        Some("url(\"photo.jpg\")")
    );
    assert!(doc.is_hidden(overlay.edit_overlay()));
    assert_eq!(doc.parent(overlay.edit_area()), Some(overlay.edit_overlay()));
}

#[test]
fn test_config_from_json_builds_overlay() {
    let config = AnnotateConfig::from_json(
        r#"{
            "editable": false,
            "notes": [{"id": 5, "top": 1, "left": 2, "width": 30, "height": 40, "text": "json"}],
            "labels": {"addNote": "Neu"}
        }"#,
    )
    .expect("config");
    let doc = Document::new();
    let img = image(&doc, "photo.jpg", 100, 100);
    let overlay = annotate(&doc, img, config).expect("overlay");

    assert!(!overlay.is_editable());
    assert!(overlay.button().is_none());
    assert_eq!(overlay.get_notes()[0].id, "5");
}

#[test]
fn test_construction_errors() {
    let doc = Document::new();
    let detached = doc.create_image("photo.jpg", 100, 100);
    assert!(matches!(
        annotate(&doc, detached, AnnotateConfig::default()),
        Err(AnnotateError::NotAttached)
    ));

    let empty = image(&doc, "photo.jpg", 0, 100);
    let err = annotate(&doc, empty, AnnotateConfig::default()).expect_err("zero width");
    assert!(matches!(err, AnnotateError::ZeroDimensions { width: 0, height: 100 }));
    assert_eq!(doc.children(doc.body()), vec![empty]);
}

// ============================================================================
// Event Ownership
// ============================================================================

#[test]
fn test_events_reach_only_the_owning_overlay() {
    let (_doc, a, b) = two_overlays();
    let a_region = a.view(0).expect("a view").area;
    let b_button = b.button().expect("b button");

    assert!(!a.dispatch(&DomEvent::click(b_button)));
    assert!(b.dispatch(&DomEvent::click(b_button)));
    assert_eq!(a.mode(), Mode::View);
    assert_eq!(b.mode(), Mode::Edit);

    assert!(!b.dispatch(&DomEvent::click(a_region)));
    assert!(a.dispatch(&DomEvent::click(a_region)));
    assert_eq!(a.mode(), Mode::Edit);
    assert!(a.active_edit().expect("a session").delete.is_some());
}

#[test]
fn test_broadcast_stream_drives_independent_drags() {
    let (doc, a, b) = two_overlays();
    a.add();
    b.add();
    let a_area = a.edit_area();
    let b_area = b.edit_area();
    let overlays = [a.clone(), b.clone()];
    let broadcast = |event: DomEvent| {
        overlays
            .iter()
            .filter(|overlay| overlay.dispatch(&event))
            .count()
    };

    assert_eq!(broadcast(DomEvent::pointer_down(a_area, 40, 40)), 1);
    assert_eq!(broadcast(DomEvent::pointer_move(a_area, 60, 50)), 1);
    assert_eq!(broadcast(DomEvent::pointer_up(a_area, 60, 50)), 1);

    assert_eq!(doc.style_px(a_area, "left"), Some(50));
    assert_eq!(doc.style_px(a_area, "top"), Some(40));
    assert_eq!(doc.style_px(b_area, "left"), Some(30));
    assert_eq!(doc.style_px(b_area, "top"), Some(30));
}

#[test]
fn test_duplicate_ids_across_overlays_stay_separate() {
    let (_doc, a, b) = two_overlays();
    a.edit(0);
    let delete = a.active_edit().and_then(|form| form.delete).expect("delete");
    a.dispatch(&DomEvent::click(delete));

    assert!(a.get_notes().is_empty());
    assert_eq!(b.get_notes().len(), 1);
    assert_eq!(b.regions().len(), 1);
}

#[test]
fn test_events_for_unknown_nodes_are_ignored() {
    let (_doc, a, _b) = two_overlays();
    let elsewhere = Document::new();
    let foreign = elsewhere.create_element("div");
    let bogus: NodeId = serde_json::from_str("99999").expect("id");

    for target in [foreign, bogus] {
        assert!(!a.dispatch(&DomEvent::click(target)));
        assert!(!a.dispatch(&DomEvent::pointer_down(target, 5, 5)));
        assert!(!a.dispatch(&DomEvent::key(target, "Enter")));
        assert!(!a.dispatch(&DomEvent::PointerEnter { target }));
    }
    let event: DomEvent =
        serde_json::from_str(r#"{"type":"click","target":99999}"#).expect("event");
    assert!(!a.dispatch(&event));
    assert_eq!(a.mode(), Mode::View);
}

#[test]
fn test_rebuilds_and_sessions_reuse_document_nodes() {
    let doc = Document::new();
    let img = image(&doc, "photo.jpg", 400, 300);
    let overlay = annotate(&doc, img, AnnotateConfig::default()).expect("overlay");
    let note = Annotation::new("1", Rect::new(10, 10, 40, 40), "n").with_editable(true);
    let cycle = || {
        overlay.set_notes(vec![note.clone()]);
        overlay.add();
        overlay.cancel_edit();
        overlay.set_editable(false);
        overlay.set_editable(true);
    };

    cycle();
    let settled = doc.node_count();
    for _ in 0..1000 {
        cycle();
    }
    assert_eq!(doc.node_count(), settled);
    assert_eq!(overlay.regions().len(), 1);

    overlay.destroy();
    assert_eq!(doc.node_count(), 2);
}

// ============================================================================
// Destroy
// ============================================================================

#[test]
fn test_destroy_restores_image_and_is_silent() {
    let doc = Document::new();
    let img = image(&doc, "photo.jpg", 400, 300);
    let fired = Rc::new(RefCell::new(Vec::new()));
    let (c, s, d) = (Rc::clone(&fired), Rc::clone(&fired), Rc::clone(&fired));
    let options = AnnotateOptions::default()
        .notes(vec![Annotation::new("1", Rect::new(0, 0, 20, 20), "x").with_editable(true)])
        .on_change(move |_: &[NoteData]| c.borrow_mut().push("change"))
        .on_save(move |_: &NoteData| s.borrow_mut().push("save"))
        .on_delete(move |_: &NoteData| d.borrow_mut().push("delete"));
    let overlay = annotate(&doc, img, options).expect("overlay");
    fired.borrow_mut().clear();
    overlay.edit(0);

    overlay.destroy();

    assert!(overlay.is_destroyed());
    assert!(fired.borrow().is_empty());
    assert_eq!(doc.children(doc.body()), vec![img]);
    assert!(doc.style(img, "display").is_none());
    assert!(overlay.get_notes().is_empty());

    overlay.destroy();
    assert_eq!(doc.children(doc.body()), vec![img]);
}

#[test]
fn test_operations_after_destroy_are_noops() {
    let (doc, a, b) = two_overlays();
    let b_canvas = b.canvas();
    let a_button = a.button().expect("button");
    a.destroy();

    assert!(!a.add());
    assert!(!a.edit(0));
    assert!(!a.dispatch(&DomEvent::click(a_button)));
    a.load();
    a.clear();
    a.set_notes(vec![Annotation::new("z", Rect::new(0, 0, 20, 20), "")]);
    a.set_editable(false);
    assert!(a.get_notes().is_empty());
    assert!(!doc.is_connected(a.canvas()));

    assert!(doc.is_connected(b_canvas));
    assert!(b.add());
    assert_eq!(b.mode(), Mode::Edit);
}

#[test]
fn test_reattach_after_destroy() {
    let doc = Document::new();
    let img = image(&doc, "photo.jpg", 400, 300);
    let first = annotate(&doc, img, AnnotateConfig::default()).expect("first");
    first.destroy();

    let second = annotate(&doc, img, AnnotateConfig::default()).expect("second");
    assert_ne!(first.id(), second.id());
    assert_eq!(doc.children(doc.body()), vec![img, second.canvas()]);
    assert!(doc.is_hidden(img));
}
