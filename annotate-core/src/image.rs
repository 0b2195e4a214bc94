//! The overlay controller.
//!
//! One [`AnnotateImage`] owns everything drawn over one image: the canvas
//! scaffold, the annotation list, the views, the edit session and the drag
//! and resize registrations. Handles are cheap clones over shared state, so
//! callbacks and spawned tasks can hold one.
//!
//! ```text
//! div.image-annotate-canvas          (inserted after the image)
//! ├── div.image-annotate-view        regions, newest first
//! ├── div.image-annotate-edit        display:none outside edit mode
//! │   └── div.image-annotate-edit-area
//! └── button.image-annotate-add      editable overlays only
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dom::{Document, NodeId};
use crate::edit::{EditHandles, EditSession, FormAction};
use crate::error::{AnnotateError, AnnotateResult, ErrorContext};
use crate::event::{DomEvent, PointerPhase};
use crate::interaction::Interactions;
use crate::note::{Annotation, NoteData, NoteKey};
use crate::options::{AnnotateOptions, Callbacks, ResolvedLabels};
use crate::transport::{normalize_api, NormalizedApi};
use crate::view::{AnnotateView, ViewHandles, AREA_CLASS};

/// Canvas class.
pub const CANVAS_CLASS: &str = "image-annotate-canvas";
/// View layer class.
pub const VIEW_CLASS: &str = "image-annotate-view";
/// Edit layer class.
pub const EDIT_CLASS: &str = "image-annotate-edit";
/// Shared edit area class.
pub const EDIT_AREA_CLASS: &str = "image-annotate-edit-area";
/// Added to the canvas in edit mode.
pub const EDITING_CLASS: &str = "image-annotate-editing";
/// Add button class.
pub const ADD_CLASS: &str = "image-annotate-add";

/// Interaction mode of an overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Browsing annotations.
    #[default]
    View,
    /// An annotation is being created or modified.
    Edit,
}

/// A lifecycle event waiting to be delivered.
#[derive(Debug)]
pub(crate) enum Notice {
    Load(Vec<NoteData>),
    Change(Vec<NoteData>),
    Save(NoteData),
    Delete(NoteData),
}

/// What a dispatched event turned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Ignored,
    Handled,
    Add,
    Edit(NoteKey),
    Form(FormAction),
}

pub(crate) struct ImageState {
    pub(crate) id: Uuid,
    pub(crate) doc: Document,
    pub(crate) img: NodeId,
    pub(crate) canvas: NodeId,
    pub(crate) view_overlay: NodeId,
    pub(crate) edit_overlay: NodeId,
    pub(crate) edit_area: NodeId,
    pub(crate) button: Option<NodeId>,
    pub(crate) notes: Vec<(NoteKey, Annotation)>,
    pub(crate) views: HashMap<NoteKey, AnnotateView>,
    pub(crate) mode: Mode,
    pub(crate) active_edit: Option<EditSession>,
    pub(crate) editable: bool,
    pub(crate) labels: ResolvedLabels,
    pub(crate) api: NormalizedApi,
    pub(crate) callbacks: Callbacks,
    pub(crate) interactions: Interactions,
    pub(crate) destroyed: bool,
    next_key: u64,
    next_generation: u64,
}

impl ImageState {
    pub(crate) fn next_key(&mut self) -> NoteKey {
        let key = NoteKey(self.next_key);
        self.next_key += 1;
        key
    }

    pub(crate) fn note(&self, key: NoteKey) -> Option<&Annotation> {
        self.notes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, note)| note)
    }

    pub(crate) fn snapshot(&self) -> Vec<NoteData> {
        self.notes.iter().map(|(_, note)| note.strip()).collect()
    }

    pub(crate) fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            tracing::debug!(instance = %self.id, ?mode, "Mode changed");
        }
        self.mode = mode;
        match mode {
            Mode::Edit => {
                self.doc.add_class(self.canvas, EDITING_CLASS);
                self.doc.set_style(self.edit_overlay, "display", "block");
            }
            Mode::View => {
                self.doc.remove_class(self.canvas, EDITING_CLASS);
                self.doc.set_style(self.edit_overlay, "display", "none");
            }
        }
    }

    fn replace_notes(&mut self, notes: Vec<Annotation>) {
        let keyed: Vec<_> = notes
            .into_iter()
            .map(|note| (self.next_key(), note))
            .collect();
        self.notes = keyed;
    }

    /// Tear down the active session, if any. No events.
    pub(crate) fn cancel_edit(&mut self) -> bool {
        match self.active_edit.take() {
            Some(session) => {
                session.destroy(&self.doc, &mut self.interactions);
                self.set_mode(Mode::View);
                true
            }
            None => false,
        }
    }

    fn destroy_views(&mut self) {
        self.cancel_edit();
        for (_, view) in self.views.drain() {
            view.destroy(&self.doc);
        }
    }

    fn create_views(&mut self) {
        for (key, note) in &self.notes {
            let view = AnnotateView::new(&self.doc, self.view_overlay, *key, note, self.editable);
            self.views.insert(*key, view);
        }
    }

    fn load_notices(&self) -> Vec<Notice> {
        let notes = self.snapshot();
        vec![Notice::Load(notes.clone()), Notice::Change(notes)]
    }

    fn create_button(&mut self) {
        let button = self.doc.create_element("button");
        self.doc.add_class(button, ADD_CLASS);
        self.doc.set_attribute(button, "title", &self.labels.add_note);
        self.doc.set_attribute(button, "type", "button");
        self.doc.append_child(self.canvas, button);
        self.button = Some(button);
    }

    fn open_edit(&mut self, target: Option<NoteKey>) -> bool {
        if self.mode != Mode::View {
            return false;
        }
        let target = match target {
            Some(key) => match self.note(key) {
                Some(note) => Some((key, note.clone())),
                None => return false,
            },
            None => None,
        };
        self.set_mode(Mode::Edit);
        self.next_generation += 1;
        let session = EditSession::open(
            &self.doc,
            &mut self.interactions,
            self.edit_area,
            self.canvas,
            &self.labels,
            target,
            self.next_generation,
        );
        self.active_edit = Some(session);
        true
    }

    fn owns(&self, node: NodeId) -> bool {
        self.doc.contains(self.canvas, node) || self.button == Some(node)
    }

    fn view_at(&self, node: NodeId) -> Option<&AnnotateView> {
        self.views.values().find(|view| view.area() == node)
    }

    fn route(&mut self, event: &DomEvent) -> Action {
        match event {
            DomEvent::Pointer {
                target,
                phase,
                pointer,
            } => {
                if *phase == PointerPhase::Down {
                    if !self.owns(*target) {
                        return Action::Ignored;
                    }
                    let in_form = self
                        .active_edit
                        .as_ref()
                        .is_some_and(|session| session.form_contains(&self.doc, *target));
                    if in_form {
                        return Action::Handled;
                    }
                }
                if self.interactions.handle_pointer(*target, *phase, pointer) {
                    Action::Handled
                } else {
                    Action::Ignored
                }
            }
            DomEvent::PointerEnter { target } => match self.view_at(*target) {
                Some(view) => {
                    view.show(&self.doc);
                    Action::Handled
                }
                None => Action::Ignored,
            },
            DomEvent::PointerLeave { target } => match self.view_at(*target) {
                Some(view) => {
                    view.hide(&self.doc);
                    Action::Handled
                }
                None => Action::Ignored,
            },
            DomEvent::Click { target } => {
                if !self.owns(*target) {
                    return Action::Ignored;
                }
                if self.button.is_some_and(|button| self.doc.contains(button, *target)) {
                    return Action::Add;
                }
                if let Some(action) = self
                    .active_edit
                    .as_ref()
                    .and_then(|session| session.action_for(&self.doc, *target))
                {
                    return Action::Form(action);
                }
                self.doc
                    .closest_class(*target, AREA_CLASS)
                    .and_then(|area| self.view_at(area))
                    .filter(|view| view.is_editable())
                    .map_or(Action::Ignored, |view| Action::Edit(view.key()))
            }
            DomEvent::KeyDown { target, key } => {
                if !self.owns(*target) {
                    return Action::Ignored;
                }
                let in_form = self
                    .active_edit
                    .as_ref()
                    .is_some_and(|session| session.form_contains(&self.doc, *target));
                if in_form {
                    return if key == "Escape" {
                        Action::Form(FormAction::Cancel)
                    } else {
                        Action::Ignored
                    };
                }
                match self.view_at(*target) {
                    Some(view) if view.is_editable() && (key == "Enter" || key == " ") => {
                        Action::Edit(view.key())
                    }
                    _ => Action::Ignored,
                }
            }
        }
    }
}

/// Controller for the annotation overlay of one image.
#[derive(Clone)]
pub struct AnnotateImage {
    pub(crate) state: Rc<RefCell<ImageState>>,
}

impl fmt::Debug for AnnotateImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("AnnotateImage")
                .field("id", &state.id)
                .field("mode", &state.mode)
                .field("notes", &state.notes.len())
                .field("editable", &state.editable)
                .field("destroyed", &state.destroyed)
                .finish(),
            Err(_) => f.write_str("AnnotateImage { <borrowed> }"),
        }
    }
}

/// Attach an overlay to `image`.
///
/// Accepts either [`AnnotateOptions`] or a serializable
/// [`AnnotateConfig`](crate::AnnotateConfig); unset fields take their
/// defaults.
///
/// # Errors
///
/// See [`AnnotateImage::new`].
pub fn annotate(
    document: &Document,
    image: NodeId,
    options: impl Into<AnnotateOptions>,
) -> AnnotateResult<AnnotateImage> {
    AnnotateImage::new(document, image, options.into())
}

impl AnnotateImage {
    /// Build the overlay scaffold after `image` and render its annotations.
    ///
    /// With a load transport the annotations are fetched in the background
    /// (see [`AnnotateImage::fetch`]); otherwise the static notes are
    /// rendered immediately and `on_load` then `on_change` fire before this
    /// returns.
    ///
    /// # Errors
    ///
    /// - [`AnnotateError::ZeroDimensions`] if the image has no rendered size.
    /// - [`AnnotateError::NotAttached`] if the image is not in the document.
    /// - [`AnnotateError::Transport`] if the HTTP client cannot be built.
    ///
    /// # Panics
    ///
    /// Natively, a load transport is spawned with
    /// `tokio::task::spawn_local`, which panics outside a `LocalSet`.
    pub fn new(document: &Document, image: NodeId, options: AnnotateOptions) -> AnnotateResult<Self> {
        let size = document.rendered_size(image);
        if size.width <= 0 || size.height <= 0 {
            return Err(AnnotateError::ZeroDimensions {
                width: size.width,
                height: size.height,
            });
        }
        if !document.is_connected(image) {
            return Err(AnnotateError::NotAttached);
        }
        let api = options
            .api
            .map(normalize_api)
            .transpose()?
            .unwrap_or_default();

        let doc = document.clone();
        let canvas = doc.create_element("div");
        doc.add_class(canvas, CANVAS_CLASS);
        let view_overlay = doc.create_element("div");
        doc.add_class(view_overlay, VIEW_CLASS);
        let edit_overlay = doc.create_element("div");
        doc.add_class(edit_overlay, EDIT_CLASS);
        doc.set_style(edit_overlay, "display", "none");
        let edit_area = doc.create_element("div");
        doc.add_class(edit_area, EDIT_AREA_CLASS);
        doc.append_child(edit_overlay, edit_area);
        doc.append_child(canvas, view_overlay);
        doc.append_child(canvas, edit_overlay);
        doc.insert_after(image, canvas);

        for node in [canvas, view_overlay, edit_overlay] {
            doc.set_style_px(node, "height", size.height);
            doc.set_style_px(node, "width", size.width);
        }
        let src = doc.attribute(image, "src").unwrap_or_default();
        doc.set_style(canvas, "background-image", &format!("url(\"{src}\")"));

        let id = Uuid::new_v4();
        let remote = api.load.is_some();
        let mut state = ImageState {
            id,
            doc: doc.clone(),
            img: image,
            canvas,
            view_overlay,
            edit_overlay,
            edit_area,
            button: None,
            notes: Vec::new(),
            views: HashMap::new(),
            mode: Mode::View,
            active_edit: None,
            editable: options.editable,
            labels: options.labels.resolve(),
            api,
            callbacks: options.callbacks,
            interactions: Interactions::new(doc.clone()),
            destroyed: false,
            next_key: 0,
            next_generation: 0,
        };
        state.replace_notes(options.notes);
        let overlay = Self {
            state: Rc::new(RefCell::new(state)),
        };

        if remote {
            let this = overlay.clone();
            spawn_local(async move {
                this.fetch().await;
            });
        } else {
            overlay.load();
        }

        {
            let mut state = overlay.state.borrow_mut();
            if state.editable && !state.destroyed {
                state.create_button();
            }
        }
        doc.set_style(image, "display", "none");

        tracing::info!(
            instance = %id,
            width = size.width,
            height = size.height,
            remote,
            "Annotation overlay attached"
        );
        Ok(overlay)
    }

    /// Deliver lifecycle events. Must be called with no borrow held.
    pub(crate) fn emit(&self, notices: Vec<Notice>) {
        if notices.is_empty() {
            return;
        }
        let callbacks = self.state.borrow().callbacks.clone();
        for notice in notices {
            match notice {
                Notice::Load(notes) => {
                    if let Some(f) = &callbacks.on_load {
                        f(&notes);
                    }
                }
                Notice::Change(notes) => {
                    if let Some(f) = &callbacks.on_change {
                        f(&notes);
                    }
                }
                Notice::Save(note) => {
                    if let Some(f) = &callbacks.on_save {
                        f(&note);
                    }
                }
                Notice::Delete(note) => {
                    if let Some(f) = &callbacks.on_delete {
                        f(&note);
                    }
                }
            }
        }
    }

    /// Rebuild every view from the current list, then fire `on_load` and
    /// `on_change`. Cancels any active edit.
    pub fn load(&self) {
        let notices = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return;
            }
            state.destroy_views();
            state.create_views();
            tracing::info!(instance = %state.id, notes = state.notes.len(), "Annotations loaded");
            state.load_notices()
        };
        self.emit(notices);
    }

    /// Run the load transport and replace the list with its result.
    ///
    /// Returns `true` when the list was replaced. Failures are reported
    /// through [`AnnotateImage::report_error`] and leave the list untouched.
    pub async fn fetch(&self) -> bool {
        let handler = {
            let state = self.state.borrow();
            if state.destroyed {
                return false;
            }
            state.api.load.clone()
        };
        let Some(handler) = handler else {
            return false;
        };

        match handler().await {
            Ok(notes) => {
                let notices = {
                    let mut state = self.state.borrow_mut();
                    if state.destroyed {
                        tracing::warn!(instance = %state.id, "Load completed after destroy");
                        return false;
                    }
                    state.destroy_views();
                    state.replace_notes(notes);
                    state.create_views();
                    tracing::info!(instance = %state.id, notes = state.notes.len(), "Annotations fetched");
                    state.load_notices()
                };
                self.emit(notices);
                true
            }
            Err(error) => {
                self.report_error(ErrorContext::load(error));
                false
            }
        }
    }

    /// Start creating an annotation. Returns `false` when already editing.
    pub fn add(&self) -> bool {
        let mut state = self.state.borrow_mut();
        !state.destroyed && state.open_edit(None)
    }

    /// Open the annotation at `index` (list order) for editing.
    ///
    /// Event routing only reaches this for editable regions; calling it
    /// directly does not check the editable flags. Returns `false` when
    /// already editing or when `index` is out of range.
    pub fn edit(&self, index: usize) -> bool {
        let mut state = self.state.borrow_mut();
        if state.destroyed {
            return false;
        }
        match state.notes.get(index).map(|(key, _)| *key) {
            Some(key) => state.open_edit(Some(key)),
            None => false,
        }
    }

    /// Remove every annotation and fire `on_change`.
    pub fn clear(&self) {
        let notices = {
            let mut state = self.state.borrow_mut();
            if state.destroyed {
                return;
            }
            state.destroy_views();
            state.notes.clear();
            vec![Notice::Change(Vec::new())]
        };
        self.emit(notices);
    }

    /// Replace the list without firing lifecycle events.
    pub fn set_notes(&self, notes: Vec<Annotation>) {
        let mut state = self.state.borrow_mut();
        if state.destroyed {
            return;
        }
        state.destroy_views();
        state.replace_notes(notes);
        state.create_views();
    }

    /// Switch editing on or off, rebuilding the views. No lifecycle events.
    pub fn set_editable(&self, editable: bool) {
        let mut state = self.state.borrow_mut();
        if state.destroyed || state.editable == editable {
            return;
        }
        state.editable = editable;
        match (editable, state.button) {
            (true, None) => state.create_button(),
            (false, Some(button)) => {
                state.doc.remove(button);
                state.button = None;
            }
            _ => {}
        }
        state.destroy_views();
        state.create_views();
        tracing::debug!(instance = %state.id, editable, "Editable changed");
    }

    /// Replace the lifecycle callbacks.
    pub fn set_callbacks(&self, callbacks: Callbacks) {
        self.state.borrow_mut().callbacks = callbacks;
    }

    /// Discard the active session, if any, and return to view mode.
    pub fn cancel_edit(&self) {
        self.state.borrow_mut().cancel_edit();
    }

    /// The current list, stripped of internal fields.
    #[must_use]
    pub fn get_notes(&self) -> Vec<NoteData> {
        self.state.borrow().snapshot()
    }

    /// Tear down the overlay and restore the image. Idempotent; fires no
    /// events.
    pub fn destroy(&self) {
        let mut state = self.state.borrow_mut();
        if state.destroyed {
            return;
        }
        state.destroyed = true;
        state.destroy_views();
        state.notes.clear();
        if let Some(button) = state.button.take() {
            state.doc.remove(button);
        }
        state.doc.remove(state.canvas);
        state.doc.remove_style(state.img, "display");
        tracing::info!(instance = %state.id, "Annotation overlay destroyed");
    }

    /// Hand a transport failure to `on_error`, or log it when no callback is
    /// configured.
    pub fn report_error(&self, context: ErrorContext) {
        let (id, on_error) = {
            let state = self.state.borrow();
            (state.id, state.callbacks.on_error.clone())
        };
        match on_error {
            Some(f) => f(&context),
            None => tracing::error!(
                instance = %id,
                error = %context.error,
                "image-annotate: {} failed",
                context.kind
            ),
        }
    }

    /// Feed one input event. Returns `true` when the overlay handled it.
    ///
    /// Events aimed at other overlays' nodes are ignored, so every overlay
    /// on a page can be handed the same stream. So are events whose target
    /// is not a live node of the document.
    ///
    /// # Panics
    ///
    /// Natively, a save or delete that needs its transport is spawned with
    /// `tokio::task::spawn_local`, which panics outside a `LocalSet`.
    pub fn dispatch(&self, event: &DomEvent) -> bool {
        let action = {
            let mut state = self.state.borrow_mut();
            if state.destroyed || !state.doc.has_node(event.target()) {
                return false;
            }
            state.route(event)
        };
        match action {
            Action::Ignored => false,
            Action::Handled => true,
            Action::Add => {
                self.add();
                true
            }
            Action::Edit(key) => {
                let mut state = self.state.borrow_mut();
                state.open_edit(Some(key));
                true
            }
            Action::Form(FormAction::Save) => {
                self.trigger_save();
                true
            }
            Action::Form(FormAction::Delete) => {
                self.trigger_delete();
                true
            }
            Action::Form(FormAction::Cancel) => {
                self.cancel_edit();
                true
            }
        }
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.state.borrow().mode
    }

    /// Whether [`AnnotateImage::destroy`] has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }

    /// Whether annotations may be added and edited.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.state.borrow().editable
    }

    /// Instance id used in log records.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.state.borrow().id
    }

    /// The document this overlay draws into.
    #[must_use]
    pub fn document(&self) -> Document {
        self.state.borrow().doc.clone()
    }

    /// The annotated image.
    #[must_use]
    pub fn image(&self) -> NodeId {
        self.state.borrow().img
    }

    /// Canvas element.
    #[must_use]
    pub fn canvas(&self) -> NodeId {
        self.state.borrow().canvas
    }

    /// View layer.
    #[must_use]
    pub fn view_overlay(&self) -> NodeId {
        self.state.borrow().view_overlay
    }

    /// Edit layer.
    #[must_use]
    pub fn edit_overlay(&self) -> NodeId {
        self.state.borrow().edit_overlay
    }

    /// Shared edit area.
    #[must_use]
    pub fn edit_area(&self) -> NodeId {
        self.state.borrow().edit_area
    }

    /// Add button, when editable.
    #[must_use]
    pub fn button(&self) -> Option<NodeId> {
        self.state.borrow().button
    }

    /// Regions in DOM order (newest first).
    #[must_use]
    pub fn regions(&self) -> Vec<NodeId> {
        let state = self.state.borrow();
        state
            .doc
            .children(state.view_overlay)
            .into_iter()
            .filter(|&node| state.doc.has_class(node, AREA_CLASS))
            .collect()
    }

    /// View of the annotation at `index` (list order).
    #[must_use]
    pub fn view(&self, index: usize) -> Option<ViewHandles> {
        let state = self.state.borrow();
        let (key, _) = state.notes.get(index)?;
        state.views.get(key).map(ViewHandles::from)
    }

    /// Nodes of the open edit form.
    #[must_use]
    pub fn active_edit(&self) -> Option<EditHandles> {
        self.state.borrow().active_edit.as_ref().map(EditSession::handles)
    }
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn spawn_local<F>(future: F)
where
    F: Future<Output = ()> + 'static,
{
    drop(tokio::task::spawn_local(future));
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::geometry::Rect;

    fn page() -> (Document, NodeId) {
        let doc = Document::new();
        let img = doc.create_image("photo.jpg", 400, 300);
        doc.append_child(doc.body(), img);
        (doc, img)
    }

    #[test]
    fn rejects_zero_dimensions() {
        let doc = Document::new();
        let img = doc.create_image("photo.jpg", 0, 300);
        doc.append_child(doc.body(), img);
        let err = AnnotateImage::new(&doc, img, AnnotateOptions::default()).expect_err("zero");
        assert!(matches!(err, AnnotateError::ZeroDimensions { width: 0, height: 300 }));
        assert!(doc.query_class(doc.body(), CANVAS_CLASS).is_none());
    }

    #[test]
    fn rejects_detached_image() {
        let doc = Document::new();
        let img = doc.create_image("photo.jpg", 400, 300);
        let err = AnnotateImage::new(&doc, img, AnnotateOptions::default()).expect_err("detached");
        assert!(matches!(err, AnnotateError::NotAttached));
    }

    #[test]
    fn scaffold_follows_image() {
        let (doc, img) = page();
        let overlay = AnnotateImage::new(&doc, img, AnnotateOptions::default()).expect("overlay");

        assert_eq!(doc.children(doc.body()), vec![img, overlay.canvas()]);
        assert!(doc.is_hidden(img));
        assert_eq!(doc.style_px(overlay.canvas(), "width"), Some(400));
        assert_eq!(doc.style_px(overlay.view_overlay(), "height"), Some(300));
        assert_eq!(
            doc.style(overlay.canvas(), "background-image").as_deref(),
            Some("url(\"photo.jpg\")")
        );
        assert!(doc.is_hidden(overlay.edit_overlay()));
        let button = overlay.button().expect("button");
        assert_eq!(doc.attribute(button, "title").as_deref(), Some("Add Note"));
        assert_eq!(doc.attribute(button, "type").as_deref(), Some("button"));
        assert_eq!(doc.parent(button), Some(overlay.canvas()));
    }

    #[test]
    fn static_notes_fire_load_then_change() {
        let (doc, img) = page();
        let order = Rc::new(RefCell::new(Vec::new()));
        let (on_load, on_change) = (Rc::clone(&order), Rc::clone(&order));
        let options = AnnotateOptions::default()
            .notes(vec![Annotation::new("1", Rect::new(10, 10, 40, 40), "a")])
            .on_load(move |notes| on_load.borrow_mut().push(format!("load:{}", notes.len())))
            .on_change(move |notes| on_change.borrow_mut().push(format!("change:{}", notes.len())));
        let overlay = AnnotateImage::new(&doc, img, options).expect("overlay");

        assert_eq!(*order.borrow(), vec!["load:1", "change:1"]);
        assert_eq!(overlay.regions().len(), 1);
    }

    #[test]
    fn add_enters_edit_mode_once() {
        let (doc, img) = page();
        let overlay = AnnotateImage::new(&doc, img, AnnotateOptions::default()).expect("overlay");

        assert!(overlay.add());
        assert_eq!(overlay.mode(), Mode::Edit);
        assert!(doc.has_class(overlay.canvas(), EDITING_CLASS));
        assert_eq!(doc.style(overlay.edit_overlay(), "display").as_deref(), Some("block"));
        assert!(!overlay.add());

        overlay.cancel_edit();
        assert_eq!(overlay.mode(), Mode::View);
        assert!(overlay.active_edit().is_none());
        assert!(!doc.has_class(overlay.canvas(), EDITING_CLASS));
    }

    #[test]
    fn callbacks_may_reenter_the_controller() {
        let (doc, img) = page();
        let slot: Rc<RefCell<Option<AnnotateImage>>> = Rc::new(RefCell::new(None));
        let seen = Rc::new(Cell::new(0));
        let (handle, count) = (Rc::clone(&slot), Rc::clone(&seen));
        let options = AnnotateOptions::default().on_change(move |_| {
            if let Some(overlay) = handle.borrow().as_ref() {
                count.set(overlay.get_notes().len());
            }
        });
        let overlay = AnnotateImage::new(&doc, img, options).expect("overlay");
        *slot.borrow_mut() = Some(overlay.clone());

        overlay.add();
        assert!(futures::executor::block_on(overlay.save_edit()));
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn events_outside_the_overlay_are_ignored() {
        let (doc, img) = page();
        let overlay = AnnotateImage::new(&doc, img, AnnotateOptions::default()).expect("overlay");
        let stranger = doc.create_element("div");
        doc.append_child(doc.body(), stranger);

        assert!(!overlay.dispatch(&DomEvent::click(stranger)));
        assert!(!overlay.dispatch(&DomEvent::pointer_down(stranger, 5, 5)));
        assert_eq!(overlay.mode(), Mode::View);
    }
}
