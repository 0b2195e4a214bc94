//! Pointer-driven drag and resize.
//!
//! Each overlay owns one [`Interactions`] registry. Registrations are keyed
//! by node: registering a node again replaces its previous registration, and
//! destroying one leaves the node inert until it is registered again.
//!
//! ```text
//! pointer down ──► capture pointer, record start, compute bounds
//! pointer move ──► start + delta ──► clamp ──► live callback
//! pointer up   ──► release capture ──► clamp ──► stop callback
//! ```

use std::collections::HashMap;

use crate::dom::{Document, NodeId};
use crate::event::{PointerInfo, PointerPhase, PRIMARY_BUTTON};
use crate::geometry::{resize_from_corner, Corner, DragBounds, Position, Rect, ResizeBounds};

/// Class shared by all resize handles.
pub const HANDLE_CLASS: &str = "image-annotate-resize-handle";

/// Callback receiving a dragged position.
pub type PositionCallback = Box<dyn FnMut(Position)>;

/// Callback receiving a resized rectangle.
pub type RectCallback = Box<dyn FnMut(Rect)>;

/// Drag registration options.
#[derive(Default)]
pub struct DragOptions {
    /// Element whose content box the dragged element must stay inside.
    pub containment: Option<NodeId>,
    /// Called on every pointer move with the clamped position.
    pub on_drag: Option<PositionCallback>,
    /// Called once on pointer up with the final clamped position.
    pub on_stop: Option<PositionCallback>,
}

impl DragOptions {
    /// Constrain the drag to `container`.
    #[must_use]
    pub fn contained_by(mut self, container: NodeId) -> Self {
        self.containment = Some(container);
        self
    }

    /// Set the live-update callback.
    #[must_use]
    pub fn on_drag(mut self, f: impl FnMut(Position) + 'static) -> Self {
        self.on_drag = Some(Box::new(f));
        self
    }

    /// Set the stop callback.
    #[must_use]
    pub fn on_stop(mut self, f: impl FnMut(Position) + 'static) -> Self {
        self.on_stop = Some(Box::new(f));
        self
    }
}

/// Resize registration options.
#[derive(Default)]
pub struct ResizeOptions {
    /// Element whose bounds the resized element must stay inside.
    pub containment: Option<NodeId>,
    /// Called on every pointer move with the clamped rectangle.
    pub on_resize: Option<RectCallback>,
    /// Called once on pointer up with the final rectangle.
    pub on_stop: Option<RectCallback>,
}

impl ResizeOptions {
    /// Constrain the resize to `container`.
    #[must_use]
    pub fn contained_by(mut self, container: NodeId) -> Self {
        self.containment = Some(container);
        self
    }

    /// Set the live-update callback.
    #[must_use]
    pub fn on_resize(mut self, f: impl FnMut(Rect) + 'static) -> Self {
        self.on_resize = Some(Box::new(f));
        self
    }

    /// Set the stop callback.
    #[must_use]
    pub fn on_stop(mut self, f: impl FnMut(Rect) + 'static) -> Self {
        self.on_stop = Some(Box::new(f));
        self
    }
}

struct DragGesture {
    pointer_id: i32,
    start_pointer: Position,
    start: Position,
    bounds: DragBounds,
}

impl DragGesture {
    fn position_at(&self, pointer: &PointerInfo) -> Position {
        self.bounds.clamp(Position::new(
            self.start
                .left
                .saturating_add(pointer.client_x.saturating_sub(self.start_pointer.left)),
            self.start
                .top
                .saturating_add(pointer.client_y.saturating_sub(self.start_pointer.top)),
        ))
    }
}

struct Draggable {
    options: DragOptions,
    gesture: Option<DragGesture>,
}

struct ResizeGesture {
    pointer_id: i32,
    handle: NodeId,
    corner: Corner,
    start_pointer: Position,
    start: Rect,
}

struct Resizable {
    options: ResizeOptions,
    handles: Vec<(NodeId, Corner)>,
    gesture: Option<ResizeGesture>,
}

/// Drag and resize registrations for one overlay.
pub struct Interactions {
    document: Document,
    draggables: HashMap<NodeId, Draggable>,
    resizables: HashMap<NodeId, Resizable>,
}

impl std::fmt::Debug for Interactions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interactions")
            .field("draggables", &self.draggables.keys().collect::<Vec<_>>())
            .field("resizables", &self.resizables.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Interactions {
    /// Create an empty registry bound to a document.
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            document,
            draggables: HashMap::new(),
            resizables: HashMap::new(),
        }
    }

    /// Make `el` draggable, replacing any previous drag registration.
    pub fn make_draggable(&mut self, el: NodeId, options: DragOptions) {
        self.destroy_draggable(el);
        self.draggables.insert(
            el,
            Draggable {
                options,
                gesture: None,
            },
        );
    }

    /// Remove the drag registration of `el`. Returns whether one existed.
    pub fn destroy_draggable(&mut self, el: NodeId) -> bool {
        match self.draggables.remove(&el) {
            Some(draggable) => {
                if let Some(gesture) = draggable.gesture {
                    self.document.release_pointer_capture(el, gesture.pointer_id);
                }
                true
            }
            None => false,
        }
    }

    /// Make `el` resizable, creating its four corner handles.
    pub fn make_resizable(&mut self, el: NodeId, options: ResizeOptions) {
        self.destroy_resizable(el);
        let handles = Corner::ALL
            .iter()
            .map(|&corner| {
                let handle = self.document.create_element("div");
                self.document.add_class(handle, HANDLE_CLASS);
                self.document
                    .add_class(handle, &format!("{HANDLE_CLASS}-{}", corner.as_str()));
                self.document.append_child(el, handle);
                (handle, corner)
            })
            .collect();
        self.resizables.insert(
            el,
            Resizable {
                options,
                handles,
                gesture: None,
            },
        );
    }

    /// Remove the resize registration of `el` and its handles.
    pub fn destroy_resizable(&mut self, el: NodeId) -> bool {
        match self.resizables.remove(&el) {
            Some(resizable) => {
                for (handle, _) in resizable.handles {
                    self.document.remove(handle);
                }
                true
            }
            None => false,
        }
    }

    /// Whether `el` currently has a drag registration.
    #[must_use]
    pub fn is_draggable(&self, el: NodeId) -> bool {
        self.draggables.contains_key(&el)
    }

    /// Whether `el` currently has a resize registration.
    #[must_use]
    pub fn is_resizable(&self, el: NodeId) -> bool {
        self.resizables.contains_key(&el)
    }

    /// Handles created for a resizable element, in `nw, ne, sw, se` order.
    #[must_use]
    pub fn handles(&self, el: NodeId) -> Vec<(NodeId, Corner)> {
        self.resizables
            .get(&el)
            .map(|r| r.handles.clone())
            .unwrap_or_default()
    }

    /// Feed a pointer event. Returns `true` when it was consumed.
    pub fn handle_pointer(&mut self, target: NodeId, phase: PointerPhase, pointer: &PointerInfo) -> bool {
        match phase {
            PointerPhase::Down => self.pointer_down(target, pointer),
            PointerPhase::Move => self.pointer_move(pointer),
            PointerPhase::Up => self.pointer_up(pointer),
        }
    }

    fn pointer_down(&mut self, target: NodeId, pointer: &PointerInfo) -> bool {
        if pointer.button != PRIMARY_BUTTON {
            return false;
        }
        let mut current = Some(target);
        while let Some(node) = current {
            // Handles sit inside the element: they win and stop propagation.
            if let Some((el, corner)) = self.handle_owner(node) {
                self.start_resize(el, node, corner, pointer);
                return true;
            }
            if self.draggables.contains_key(&node) {
                self.start_drag(node, pointer);
                return true;
            }
            current = self.document.parent(node);
        }
        false
    }

    fn handle_owner(&self, node: NodeId) -> Option<(NodeId, Corner)> {
        self.resizables.iter().find_map(|(&el, r)| {
            r.handles
                .iter()
                .find(|&&(handle, _)| handle == node)
                .map(|&(_, corner)| (el, corner))
        })
    }

    fn start_drag(&mut self, el: NodeId, pointer: &PointerInfo) {
        let doc = &self.document;
        let Some(draggable) = self.draggables.get_mut(&el) else {
            return;
        };
        doc.set_pointer_capture(el, pointer.pointer_id);

        let start = doc.inline_position(el);
        let size = doc.inline_size(el);
        let bounds = match draggable.options.containment {
            Some(container) => {
                let container_rect = doc.bounding_rect(container);
                let el_rect = doc.bounding_rect(el);
                let offset = style_offset(start, el_rect, container_rect);
                DragBounds::within(container_rect.size(), size, offset)
            }
            None => DragBounds::UNBOUNDED,
        };

        draggable.gesture = Some(DragGesture {
            pointer_id: pointer.pointer_id,
            start_pointer: pointer.position(),
            start,
            bounds,
        });
    }

    fn start_resize(&mut self, el: NodeId, handle: NodeId, corner: Corner, pointer: &PointerInfo) {
        let doc = &self.document;
        let Some(resizable) = self.resizables.get_mut(&el) else {
            return;
        };
        doc.set_pointer_capture(handle, pointer.pointer_id);

        let position = doc.inline_position(el);
        let start = Rect::new(
            position.left,
            position.top,
            doc.style_px(el, "width").unwrap_or(0),
            doc.style_px(el, "height").unwrap_or(0),
        );
        resizable.gesture = Some(ResizeGesture {
            pointer_id: pointer.pointer_id,
            handle,
            corner,
            start_pointer: pointer.position(),
            start,
        });
    }

    fn pointer_move(&mut self, pointer: &PointerInfo) -> bool {
        let Some(captured) = self.document.pointer_capture(pointer.pointer_id) else {
            return false;
        };
        if let Some(draggable) = self.draggables.get_mut(&captured) {
            if let Some(gesture) = draggable.gesture.as_ref() {
                let pos = gesture.position_at(pointer);
                if let Some(on_drag) = draggable.options.on_drag.as_mut() {
                    on_drag(pos);
                }
                return true;
            }
        }
        if let Some(el) = self.resizing_element(captured, pointer.pointer_id) {
            let rect = self.resized_rect(el, pointer);
            if let Some(on_resize) = self
                .resizables
                .get_mut(&el)
                .and_then(|r| r.options.on_resize.as_mut())
            {
                on_resize(rect);
            }
            return true;
        }
        false
    }

    fn pointer_up(&mut self, pointer: &PointerInfo) -> bool {
        let Some(captured) = self.document.pointer_capture(pointer.pointer_id) else {
            return false;
        };
        if let Some(draggable) = self.draggables.get_mut(&captured) {
            if let Some(gesture) = draggable.gesture.take() {
                self.document
                    .release_pointer_capture(captured, pointer.pointer_id);
                let pos = gesture.position_at(pointer);
                if let Some(on_stop) = draggable.options.on_stop.as_mut() {
                    on_stop(pos);
                }
                return true;
            }
        }
        if let Some(el) = self.resizing_element(captured, pointer.pointer_id) {
            self.document
                .release_pointer_capture(captured, pointer.pointer_id);
            let rect = self.resized_rect(el, pointer);
            if let Some(resizable) = self.resizables.get_mut(&el) {
                resizable.gesture = None;
                if let Some(on_stop) = resizable.options.on_stop.as_mut() {
                    on_stop(rect);
                }
            }
            return true;
        }
        false
    }

    fn resizing_element(&self, handle: NodeId, pointer_id: i32) -> Option<NodeId> {
        self.resizables.iter().find_map(|(&el, r)| {
            r.gesture
                .as_ref()
                .filter(|g| g.handle == handle && g.pointer_id == pointer_id)
                .map(|_| el)
        })
    }

    fn resized_rect(&self, el: NodeId, pointer: &PointerInfo) -> Rect {
        let Some(resizable) = self.resizables.get(&el) else {
            return Rect::default();
        };
        let Some(gesture) = resizable.gesture.as_ref() else {
            return Rect::default();
        };
        let rect = resize_from_corner(
            gesture.corner,
            gesture.start,
            pointer.client_x.saturating_sub(gesture.start_pointer.left),
            pointer.client_y.saturating_sub(gesture.start_pointer.top),
        );
        // The rectangle's own extent changes, so bounds are re-read each move.
        match resizable.options.containment {
            Some(container) => {
                let doc = &self.document;
                let container_rect = doc.bounding_rect(container);
                let el_rect = doc.bounding_rect(el);
                let current = doc.inline_position(el);
                let offset = style_offset(current, el_rect, container_rect);
                ResizeBounds::within(container_rect.size(), offset).clamp(rect)
            }
            None => rect,
        }
    }
}

/// Style position minus the element's position inside its container.
fn style_offset(style: Position, el: Rect, container: Rect) -> Position {
    Position::new(
        style
            .left
            .saturating_sub(el.left.saturating_sub(container.left)),
        style.top.saturating_sub(el.top.saturating_sub(container.top)),
    )
}
