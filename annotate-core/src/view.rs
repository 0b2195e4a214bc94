//! Per-annotation region and tooltip.

use crate::dom::{Document, NodeId};
use crate::edit::EditSession;
use crate::geometry::Rect;
use crate::note::{Annotation, NoteKey};

/// Region class.
pub const AREA_CLASS: &str = "image-annotate-area";
/// Added to regions that can be opened for editing.
pub const EDITABLE_CLASS: &str = "image-annotate-area-editable";
/// Added while the pointer is over a region.
pub const HOVER_CLASS: &str = "image-annotate-area-hover";
/// Added while the pointer is over an editable region.
pub const EDITABLE_HOVER_CLASS: &str = "image-annotate-area-editable-hover";
/// Tooltip class.
pub const NOTE_CLASS: &str = "image-annotate-note";

/// Pixels taken by the region border on each axis.
const BORDER_INSET: i32 = 2;

/// The rendered view of one annotation.
#[derive(Debug)]
pub struct AnnotateView {
    key: NoteKey,
    area: NodeId,
    inner: NodeId,
    tooltip: NodeId,
    editable: bool,
}

impl AnnotateView {
    /// Build the region for `note` and prepend it to `layer`.
    pub(crate) fn new(
        doc: &Document,
        layer: NodeId,
        key: NoteKey,
        note: &Annotation,
        overlay_editable: bool,
    ) -> Self {
        let area = doc.create_element("div");
        doc.add_class(area, AREA_CLASS);
        let inner = doc.create_element("div");
        doc.append_child(area, inner);
        doc.prepend_child(layer, area);

        let tooltip = doc.create_element("div");
        doc.add_class(tooltip, NOTE_CLASS);
        doc.set_text_content(tooltip, &note.text);
        doc.set_style(tooltip, "display", "none");
        doc.append_child(area, tooltip);

        let mut view = Self {
            key,
            area,
            inner,
            tooltip,
            editable: false,
        };
        view.set_position(doc, note.rect());
        if note.editable && overlay_editable {
            view.make_editable(doc);
        }
        view
    }

    fn make_editable(&mut self, doc: &Document) {
        if self.editable {
            return;
        }
        self.editable = true;
        doc.add_class(self.area, EDITABLE_CLASS);
        doc.set_attribute(self.area, "tabindex", "0");
        doc.set_attribute(self.area, "role", "button");
    }

    fn set_position(&self, doc: &Document, rect: Rect) {
        doc.set_style_px(self.inner, "height", (rect.height - BORDER_INSET).max(0));
        doc.set_style_px(self.inner, "width", (rect.width - BORDER_INSET).max(0));
        doc.set_style_px(self.area, "left", rect.left);
        doc.set_style_px(self.area, "top", rect.top);
    }

    /// Show the tooltip and apply hover styling.
    pub(crate) fn show(&self, doc: &Document) {
        doc.set_style(self.tooltip, "display", "block");
        doc.set_style_px(self.tooltip, "left", 0);
        doc.remove_style(self.tooltip, "top");
        doc.add_class(
            self.area,
            if self.editable {
                EDITABLE_HOVER_CLASS
            } else {
                HOVER_CLASS
            },
        );
    }

    /// Hide the tooltip and remove hover styling.
    pub(crate) fn hide(&self, doc: &Document) {
        doc.set_style(self.tooltip, "display", "none");
        doc.remove_class(self.area, HOVER_CLASS);
        doc.remove_class(self.area, EDITABLE_HOVER_CLASS);
    }

    /// Adopt the geometry and id of `session` with the committed `text`.
    ///
    /// The annotation becomes editable: it was just edited.
    pub(crate) fn reset_position(
        &mut self,
        doc: &Document,
        note: &mut Annotation,
        session: &EditSession,
        text: &str,
    ) {
        doc.set_text_content(self.tooltip, text);
        doc.set_style(self.tooltip, "display", "none");

        let rect = session.area_rect(doc);
        self.set_position(doc, rect);

        note.set_rect(rect);
        note.text = text.to_string();
        note.id.clone_from(&session.note().id);
        note.editable = true;
        self.make_editable(doc);
    }

    /// Remove the region and tooltip from the document.
    pub(crate) fn destroy(self, doc: &Document) {
        doc.remove(self.tooltip);
        doc.remove(self.area);
    }

    /// Key of the annotation this view renders.
    #[must_use]
    pub fn key(&self) -> NoteKey {
        self.key
    }

    /// Region element.
    #[must_use]
    pub fn area(&self) -> NodeId {
        self.area
    }

    /// Tooltip element.
    #[must_use]
    pub fn tooltip(&self) -> NodeId {
        self.tooltip
    }

    /// Whether the region reacts to activation.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.editable
    }
}

/// Public snapshot of a rendered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewHandles {
    /// Region element.
    pub area: NodeId,
    /// Tooltip element.
    pub tooltip: NodeId,
    /// Whether the region reacts to activation.
    pub editable: bool,
}

impl From<&AnnotateView> for ViewHandles {
    fn from(view: &AnnotateView) -> Self {
        Self {
            area: view.area,
            tooltip: view.tooltip,
            editable: view.editable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Document, NodeId) {
        let doc = Document::new();
        let layer = doc.create_element("div");
        doc.append_child(doc.body(), layer);
        (doc, layer)
    }

    #[test]
    fn builds_region_with_inset_inner_box() {
        let (doc, layer) = setup();
        let note = Annotation::new("1", Rect::new(20, 10, 50, 40), "hello");
        let view = AnnotateView::new(&doc, layer, NoteKey(0), &note, true);

        assert!(doc.has_class(view.area(), AREA_CLASS));
        assert_eq!(doc.style_px(view.area(), "left"), Some(20));
        assert_eq!(doc.style_px(view.area(), "top"), Some(10));
        let inner = doc.first_child(view.area()).expect("inner");
        assert_eq!(doc.style_px(inner, "width"), Some(48));
        assert_eq!(doc.style_px(inner, "height"), Some(38));
        assert_eq!(doc.text_content(view.tooltip()), "hello");
        assert!(doc.is_hidden(view.tooltip()));
    }

    #[test]
    fn editable_requires_both_flags() {
        let (doc, layer) = setup();
        let note = Annotation::new("1", Rect::new(0, 0, 20, 20), "").with_editable(true);

        let locked = AnnotateView::new(&doc, layer, NoteKey(0), &note, false);
        assert!(!locked.is_editable());
        assert!(!doc.has_class(locked.area(), EDITABLE_CLASS));
        assert!(doc.attribute(locked.area(), "tabindex").is_none());

        let open = AnnotateView::new(&doc, layer, NoteKey(1), &note, true);
        assert!(open.is_editable());
        assert_eq!(doc.attribute(open.area(), "tabindex").as_deref(), Some("0"));
        assert_eq!(doc.attribute(open.area(), "role").as_deref(), Some("button"));
    }

    #[test]
    fn newer_views_are_prepended() {
        let (doc, layer) = setup();
        let a = AnnotateView::new(&doc, layer, NoteKey(0), &Annotation::draft(), true);
        let b = AnnotateView::new(&doc, layer, NoteKey(1), &Annotation::draft(), true);
        assert_eq!(doc.children(layer), vec![b.area(), a.area()]);
    }

    #[test]
    fn show_and_hide_toggle_tooltip_and_hover_class() {
        let (doc, layer) = setup();
        let note = Annotation::new("1", Rect::new(0, 0, 20, 20), "x").with_editable(true);
        let view = AnnotateView::new(&doc, layer, NoteKey(0), &note, true);

        view.show(&doc);
        assert!(!doc.is_hidden(view.tooltip()));
        assert_eq!(doc.style_px(view.tooltip(), "left"), Some(0));
        assert!(doc.has_class(view.area(), EDITABLE_HOVER_CLASS));
        assert!(!doc.has_class(view.area(), HOVER_CLASS));

        view.hide(&doc);
        assert!(doc.is_hidden(view.tooltip()));
        assert!(!doc.has_class(view.area(), EDITABLE_HOVER_CLASS));
    }

    #[test]
    fn text_is_never_parsed_as_markup() {
        let (doc, layer) = setup();
        let note = Annotation::new("1", Rect::new(0, 0, 20, 20), "<img src=x onerror=alert(1)>");
        let view = AnnotateView::new(&doc, layer, NoteKey(0), &note, true);
        assert!(doc.children(view.tooltip()).is_empty());
        assert!(doc.to_html(layer).contains("&lt;img"));
    }

    #[test]
    fn destroy_detaches_region() {
        let (doc, layer) = setup();
        let view = AnnotateView::new(&doc, layer, NoteKey(0), &Annotation::draft(), true);
        let area = view.area();
        view.destroy(&doc);
        assert!(!doc.is_connected(area));
        assert!(doc.children(layer).is_empty());
    }
}
