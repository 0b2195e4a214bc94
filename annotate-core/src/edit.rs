//! Edit sessions: the live form over one annotation, and the save, delete
//! and cancel flows that end it.
//!
//! ```text
//!             ┌──────── cancel ────────┐
//!             │                        ▼
//! open ──► editing ──► save ──► (transport) ──► commit ──► closed
//!             │          ▲           │ err
//!             │          └── busy ◄──┘ (report, stay open)
//!             └──► delete ──► (transport) ──► remove ──► closed
//! ```
//!
//! Sessions edit a draft copy of the annotation. The listed annotation only
//! changes when a save commits.

use crate::dom::{Document, NodeId};
use crate::error::{ErrorContext, OperationKind};
use crate::geometry::Rect;
use crate::image::{spawn_local, AnnotateImage, ImageState, Mode, Notice};
use crate::interaction::{DragOptions, Interactions, ResizeOptions};
use crate::note::{Annotation, NoteData, NoteKey, SaveResult};
use crate::options::ResolvedLabels;
use crate::transport::TransportFuture;
use crate::view::AnnotateView;

/// Form wrapper class.
pub const FORM_CLASS: &str = "image-annotate-edit-form";
/// Button row class.
pub const BUTTONS_CLASS: &str = "image-annotate-edit-buttons";
/// Save button class.
pub const OK_CLASS: &str = "image-annotate-edit-ok";
/// Delete button class.
pub const DELETE_CLASS: &str = "image-annotate-edit-delete";
/// Cancel button class.
pub const CLOSE_CLASS: &str = "image-annotate-edit-close";

/// What a click inside the form asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FormAction {
    Save,
    Delete,
    Cancel,
}

/// An open edit form.
#[derive(Debug)]
pub struct EditSession {
    generation: u64,
    target: Option<NoteKey>,
    note: Annotation,
    area: NodeId,
    form: NodeId,
    textarea: NodeId,
    ok: NodeId,
    delete: Option<NodeId>,
    cancel: NodeId,
    busy: bool,
}

impl EditSession {
    /// Open a session on the shared edit area.
    ///
    /// `target` is the listed annotation for updates, `None` to create.
    pub(crate) fn open(
        doc: &Document,
        interactions: &mut Interactions,
        area: NodeId,
        canvas: NodeId,
        labels: &ResolvedLabels,
        target: Option<(NoteKey, Annotation)>,
        generation: u64,
    ) -> Self {
        let (target, note) = match target {
            Some((key, note)) => (Some(key), note),
            None => (None, Annotation::draft()),
        };
        apply_rect(doc, area, note.rect());

        let form = doc.create_element("div");
        doc.add_class(form, FORM_CLASS);
        let form_el = doc.create_element("form");
        let textarea = doc.create_element("textarea");
        doc.set_attribute(textarea, "name", "text");
        doc.set_attribute(textarea, "rows", "3");
        doc.set_attribute(textarea, "cols", "30");
        doc.set_value(textarea, &note.text);
        if !labels.placeholder.is_empty() {
            doc.set_attribute(textarea, "placeholder", &labels.placeholder);
        }
        doc.append_child(form_el, textarea);
        doc.append_child(form, form_el);
        doc.append_child(area, form);

        let (resize_doc, stop_doc) = (doc.clone(), doc.clone());
        interactions.make_resizable(
            area,
            ResizeOptions::default()
                .contained_by(canvas)
                .on_resize(move |rect| apply_rect(&resize_doc, area, rect))
                .on_stop(move |rect| apply_rect(&stop_doc, area, rect)),
        );
        let (drag_doc, stop_doc) = (doc.clone(), doc.clone());
        interactions.make_draggable(
            area,
            DragOptions::default()
                .contained_by(canvas)
                .on_drag(move |pos| {
                    drag_doc.set_style_px(area, "left", pos.left);
                    drag_doc.set_style_px(area, "top", pos.top);
                })
                .on_stop(move |pos| {
                    stop_doc.set_style_px(area, "left", pos.left);
                    stop_doc.set_style_px(area, "top", pos.top);
                }),
        );

        doc.focus(textarea);

        let row = doc.create_element("div");
        doc.add_class(row, BUTTONS_CLASS);
        doc.append_child(form, row);
        let ok = button(doc, row, OK_CLASS, &labels.save);
        let delete = target.map(|_| button(doc, row, DELETE_CLASS, &labels.delete));
        let cancel = button(doc, row, CLOSE_CLASS, &labels.cancel);

        Self {
            generation,
            target,
            note,
            area,
            form,
            textarea,
            ok,
            delete,
            cancel,
            busy: false,
        }
    }

    /// The draft being edited.
    #[must_use]
    pub fn note(&self) -> &Annotation {
        &self.note
    }

    /// Current rectangle of the edit area, from its inline style.
    #[must_use]
    pub fn area_rect(&self, doc: &Document) -> Rect {
        let position = doc.inline_position(self.area);
        let size = doc.inline_size(self.area);
        Rect::new(position.left, position.top, size.width, size.height)
    }

    pub(crate) fn target(&self) -> Option<NoteKey> {
        self.target
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.busy
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Apply an id assigned by the save transport.
    pub(crate) fn assign_id(&mut self, result: SaveResult) {
        if let Some(id) = result.annotation_id {
            self.note.id = id;
        }
    }

    /// Copy the area geometry and textarea value into the draft.
    pub(crate) fn capture(&mut self, doc: &Document) {
        let rect = self.area_rect(doc);
        self.note.set_rect(rect);
        self.note.text = doc.value(self.textarea);
    }

    /// Whether `node` lies inside the form.
    pub(crate) fn form_contains(&self, doc: &Document, node: NodeId) -> bool {
        doc.is_connected(self.form) && doc.contains(self.form, node)
    }

    pub(crate) fn action_for(&self, doc: &Document, node: NodeId) -> Option<FormAction> {
        if doc.contains(self.ok, node) {
            Some(FormAction::Save)
        } else if self.delete.is_some_and(|delete| doc.contains(delete, node)) {
            Some(FormAction::Delete)
        } else if doc.contains(self.cancel, node) {
            Some(FormAction::Cancel)
        } else {
            None
        }
    }

    pub(crate) fn handles(&self) -> EditHandles {
        EditHandles {
            area: self.area,
            form: self.form,
            textarea: self.textarea,
            ok: self.ok,
            delete: self.delete,
            cancel: self.cancel,
            busy: self.busy,
        }
    }

    /// Unregister interactions, clear the area geometry and drop the form.
    /// The area node stays in place for the next session.
    pub(crate) fn destroy(self, doc: &Document, interactions: &mut Interactions) {
        interactions.destroy_resizable(self.area);
        interactions.destroy_draggable(self.area);
        for property in ["height", "width", "left", "top"] {
            doc.remove_style(self.area, property);
        }
        doc.remove(self.form);
    }
}

/// Nodes of the active edit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditHandles {
    /// Shared edit area.
    pub area: NodeId,
    /// Form wrapper.
    pub form: NodeId,
    /// Text input.
    pub textarea: NodeId,
    /// Save button.
    pub ok: NodeId,
    /// Delete button, for updates only.
    pub delete: Option<NodeId>,
    /// Cancel button.
    pub cancel: NodeId,
    /// Whether a save or delete is in flight.
    pub busy: bool,
}

fn apply_rect(doc: &Document, area: NodeId, rect: Rect) {
    doc.set_style_px(area, "left", rect.left);
    doc.set_style_px(area, "top", rect.top);
    doc.set_style_px(area, "width", rect.width);
    doc.set_style_px(area, "height", rect.height);
}

fn button(doc: &Document, row: NodeId, class: &str, label: &str) -> NodeId {
    let button = doc.create_element("button");
    doc.add_class(button, class);
    doc.set_attribute(button, "type", "button");
    doc.set_text_content(button, label);
    doc.append_child(row, button);
    button
}

/// A save or delete waiting on its transport.
pub(crate) struct Pending<T> {
    generation: u64,
    note: NoteData,
    future: TransportFuture<T>,
}

/// Outcome of starting a save or delete.
pub(crate) enum Step<T> {
    /// No session, wrong kind of session, or busy.
    Ignored,
    /// Committed without a transport.
    Committed,
    /// Waiting on the transport.
    Pending(Pending<T>),
}

impl AnnotateImage {
    /// Save the active session and wait for the transport.
    ///
    /// Returns `true` once the save committed. Returns `false` when there is
    /// no session, a request is already in flight, the transport failed
    /// (reported through `on_error`), or the session ended meanwhile.
    pub async fn save_edit(&self) -> bool {
        match self.begin_save() {
            Step::Ignored => false,
            Step::Committed => true,
            Step::Pending(pending) => self.finish_save(pending).await,
        }
    }

    /// Delete the annotation bound to the active session and wait for the
    /// transport.
    ///
    /// Returns `true` once the annotation was removed. Creating sessions
    /// have nothing to delete.
    pub async fn delete_edit(&self) -> bool {
        match self.begin_delete() {
            Step::Ignored => false,
            Step::Committed => true,
            Step::Pending(pending) => self.finish_delete(pending).await,
        }
    }

    /// Save triggered from the form: the transport call runs in the
    /// background.
    pub(crate) fn trigger_save(&self) {
        if let Step::Pending(pending) = self.begin_save() {
            let this = self.clone();
            spawn_local(async move {
                this.finish_save(pending).await;
            });
        }
    }

    /// Delete triggered from the form.
    pub(crate) fn trigger_delete(&self) {
        if let Step::Pending(pending) = self.begin_delete() {
            let this = self.clone();
            spawn_local(async move {
                this.finish_delete(pending).await;
            });
        }
    }

    fn begin_save(&self) -> Step<SaveResult> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if state.destroyed {
            return Step::Ignored;
        }
        let Some(session) = state.active_edit.as_mut() else {
            return Step::Ignored;
        };
        if session.is_busy() {
            tracing::debug!(instance = %state.id, "Save ignored: request in flight");
            return Step::Ignored;
        }
        session.capture(&state.doc);

        let Some(handler) = state.api.save.clone() else {
            let notices = state.commit_save();
            drop(guard);
            self.emit(notices);
            return Step::Committed;
        };
        session.set_busy(true);
        let generation = session.generation();
        let note = session.note().strip();
        drop(guard);

        let future = handler(note.clone());
        Step::Pending(Pending {
            generation,
            note,
            future,
        })
    }

    async fn finish_save(&self, pending: Pending<SaveResult>) -> bool {
        let Pending {
            generation,
            note,
            future,
        } = pending;
        let result = future.await;

        let mut state = self.state.borrow_mut();
        if !state.owns_session(generation) {
            tracing::warn!(instance = %state.id, "Save completed after its session ended");
            return false;
        }
        match result {
            Ok(saved) => {
                if let Some(session) = state.active_edit.as_mut() {
                    session.assign_id(saved);
                }
                let notices = state.commit_save();
                drop(state);
                self.emit(notices);
                true
            }
            Err(error) => {
                if let Some(session) = state.active_edit.as_mut() {
                    session.set_busy(false);
                }
                drop(state);
                self.report_error(ErrorContext::for_note(OperationKind::Save, error, note));
                false
            }
        }
    }

    fn begin_delete(&self) -> Step<()> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if state.destroyed {
            return Step::Ignored;
        }
        let Some(session) = state.active_edit.as_mut() else {
            return Step::Ignored;
        };
        let Some(key) = session.target() else {
            return Step::Ignored;
        };
        if session.is_busy() {
            tracing::debug!(instance = %state.id, "Delete ignored: request in flight");
            return Step::Ignored;
        }

        let Some(handler) = state.api.delete.clone() else {
            let notices = state.commit_delete();
            drop(guard);
            self.emit(notices);
            return Step::Committed;
        };
        let Some(note) = state.note(key).map(Annotation::strip) else {
            return Step::Ignored;
        };
        let Some(session) = state.active_edit.as_mut() else {
            return Step::Ignored;
        };
        session.set_busy(true);
        let generation = session.generation();
        drop(guard);

        let future = handler(note.clone());
        Step::Pending(Pending {
            generation,
            note,
            future,
        })
    }

    async fn finish_delete(&self, pending: Pending<()>) -> bool {
        let Pending {
            generation,
            note,
            future,
        } = pending;
        let result = future.await;

        let mut state = self.state.borrow_mut();
        if !state.owns_session(generation) {
            tracing::warn!(instance = %state.id, "Delete completed after its session ended");
            return false;
        }
        match result {
            Ok(()) => {
                let notices = state.commit_delete();
                drop(state);
                self.emit(notices);
                true
            }
            Err(error) => {
                if let Some(session) = state.active_edit.as_mut() {
                    session.set_busy(false);
                }
                drop(state);
                self.report_error(ErrorContext::for_note(OperationKind::Delete, error, note));
                false
            }
        }
    }
}

impl ImageState {
    /// Whether the session started with `generation` is still the live one.
    fn owns_session(&self, generation: u64) -> bool {
        !self.destroyed
            && self
                .active_edit
                .as_ref()
                .is_some_and(|session| session.generation() == generation)
    }

    /// End the active session by writing its draft into the list.
    pub(crate) fn commit_save(&mut self) -> Vec<Notice> {
        let Some(session) = self.active_edit.take() else {
            return Vec::new();
        };
        self.set_mode(Mode::View);
        let text = session.note().text.clone();

        let saved = match session.target() {
            Some(key) => {
                let doc = &self.doc;
                let note = self
                    .notes
                    .iter_mut()
                    .find(|(k, _)| *k == key)
                    .map(|(_, note)| note);
                match (self.views.get_mut(&key), note) {
                    (Some(view), Some(note)) => {
                        view.reset_position(doc, note, &session, &text);
                        Some(note.strip())
                    }
                    _ => None,
                }
            }
            None => {
                let key = self.next_key();
                let mut note = session.note().clone();
                note.editable = true;
                let mut view = AnnotateView::new(
                    &self.doc,
                    self.view_overlay,
                    key,
                    &note,
                    self.editable,
                );
                view.reset_position(&self.doc, &mut note, &session, &text);
                let saved = note.strip();
                self.views.insert(key, view);
                self.notes.push((key, note));
                Some(saved)
            }
        };
        session.destroy(&self.doc, &mut self.interactions);

        match saved {
            Some(saved) => {
                tracing::debug!(instance = %self.id, id = %saved.id, "Annotation saved");
                vec![Notice::Save(saved), Notice::Change(self.snapshot())]
            }
            None => Vec::new(),
        }
    }

    /// End the active session by removing its annotation.
    pub(crate) fn commit_delete(&mut self) -> Vec<Notice> {
        let Some(key) = self.active_edit.as_ref().and_then(EditSession::target) else {
            return Vec::new();
        };
        self.set_mode(Mode::View);
        if let Some(session) = self.active_edit.take() {
            session.destroy(&self.doc, &mut self.interactions);
        }
        if let Some(view) = self.views.remove(&key) {
            view.destroy(&self.doc);
        }
        let Some(index) = self.notes.iter().position(|(k, _)| *k == key) else {
            return Vec::new();
        };
        let (_, removed) = self.notes.remove(index);
        tracing::debug!(instance = %self.id, id = %removed.id, "Annotation deleted");
        vec![Notice::Delete(removed.strip()), Notice::Change(self.snapshot())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Document, Interactions, NodeId, NodeId) {
        let doc = Document::new();
        let canvas = doc.create_element("div");
        doc.set_style_px(canvas, "width", 400);
        doc.set_style_px(canvas, "height", 300);
        let area = doc.create_element("div");
        doc.append_child(canvas, area);
        doc.append_child(doc.body(), canvas);
        let interactions = Interactions::new(doc.clone());
        (doc, interactions, canvas, area)
    }

    #[test]
    fn creating_session_uses_draft_and_omits_delete() {
        let (doc, mut interactions, canvas, area) = fixture();
        let labels = ResolvedLabels::default();
        let session = EditSession::open(&doc, &mut interactions, area, canvas, &labels, None, 1);

        assert!(session.note().is_new());
        assert!(session.target().is_none());
        assert!(session.handles().delete.is_none());
        assert_eq!(session.area_rect(&doc), Rect::new(30, 30, 30, 30));
        assert!(interactions.is_draggable(area));
        assert!(interactions.is_resizable(area));
        assert_eq!(doc.text_content(session.handles().ok), "OK");
    }

    #[test]
    fn capture_copies_geometry_and_text() {
        let (doc, mut interactions, canvas, area) = fixture();
        let labels = ResolvedLabels::default();
        let note = Annotation::new("9", Rect::new(5, 6, 70, 80), "before");
        let mut session = EditSession::open(
            &doc,
            &mut interactions,
            area,
            canvas,
            &labels,
            Some((NoteKey(3), note)),
            1,
        );
        assert_eq!(doc.value(session.handles().textarea), "before");

        doc.set_value(session.handles().textarea, "after");
        doc.set_style_px(area, "left", 50);
        session.capture(&doc);

        assert_eq!(session.note().text, "after");
        assert_eq!(session.note().rect(), Rect::new(50, 6, 70, 80));
        assert_eq!(session.target(), Some(NoteKey(3)));
    }

    #[test]
    fn action_for_maps_buttons() {
        let (doc, mut interactions, canvas, area) = fixture();
        let labels = ResolvedLabels::default();
        let note = Annotation::new("9", Rect::new(5, 6, 70, 80), "");
        let session = EditSession::open(
            &doc,
            &mut interactions,
            area,
            canvas,
            &labels,
            Some((NoteKey(0), note)),
            1,
        );
        let handles = session.handles();

        assert_eq!(session.action_for(&doc, handles.ok), Some(FormAction::Save));
        assert_eq!(
            session.action_for(&doc, handles.delete.expect("delete")),
            Some(FormAction::Delete)
        );
        assert_eq!(session.action_for(&doc, handles.cancel), Some(FormAction::Cancel));
        assert_eq!(session.action_for(&doc, handles.textarea), None);
        assert!(session.form_contains(&doc, handles.textarea));
    }

    #[test]
    fn destroy_keeps_area_but_clears_it() {
        let (doc, mut interactions, canvas, area) = fixture();
        let labels = ResolvedLabels::default();
        let session = EditSession::open(&doc, &mut interactions, area, canvas, &labels, None, 1);
        let form = session.handles().form;

        session.destroy(&doc, &mut interactions);

        assert!(doc.is_connected(area));
        assert!(!doc.is_connected(form));
        assert!(doc.style(area, "width").is_none());
        assert!(!interactions.is_draggable(area));
        assert!(!interactions.is_resizable(area));
    }

    #[test]
    fn assign_id_only_replaces_when_present() {
        let (doc, mut interactions, canvas, area) = fixture();
        let labels = ResolvedLabels::default();
        let mut session = EditSession::open(&doc, &mut interactions, area, canvas, &labels, None, 1);

        session.assign_id(SaveResult::default());
        assert_eq!(session.note().id, "new");
        session.assign_id(SaveResult::with_id("17"));
        assert_eq!(session.note().id, "17");
    }
}
