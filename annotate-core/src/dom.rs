//! Headless document model.
//!
//! A small arena of element nodes standing in for the browser DOM. It keeps
//! exactly what the overlay needs: tree structure, classes, attributes,
//! inline style, text content, form values, focus and pointer capture.
//! There is no layout engine; [`Document::bounding_rect`] derives boxes from
//! inline `left`/`top`/`width`/`height`.
//!
//! A [`Document`] is a cheap handle (`Rc<RefCell<..>>`), so several overlays
//! on one "page" share it. Every method borrows only for its own duration.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write as _};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::geometry::{Position, Rect, Size};

/// Handle to a node in a [`Document`].
///
/// Slots are reused once a node is removed, so a handle carries the slot's
/// generation and a stale handle never reaches the new occupant. On the wire
/// it is a single number, the generation in the high 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        (u64::from(id.generation) << 32) | u64::from(id.index)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self {
            index: u32::try_from(raw & u64::from(u32::MAX)).unwrap_or(u32::MAX),
            generation: u32::try_from(raw >> 32).unwrap_or(u32::MAX),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
    text: String,
    value: String,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            parent: None,
            children: Vec::new(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            style: BTreeMap::new(),
            text: String::new(),
            value: String::new(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug)]
struct DocumentInner {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    body: NodeId,
    focused: Option<NodeId>,
    captures: HashMap<i32, NodeId>,
}

impl DocumentInner {
    fn new() -> Self {
        let mut inner = Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            body: NodeId {
                index: 0,
                generation: 0,
            },
            focused: None,
            captures: HashMap::new(),
        };
        inner.body = inner.alloc("body");
        inner
    }

    fn alloc(&mut self, tag: &str) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(Node::new(tag));
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            node: Some(Node::new(tag)),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Drop a detached subtree and recycle its slots.
    fn release(&mut self, root: NodeId) {
        let mut doomed = vec![root];
        self.descendants(root, &mut doomed);
        for id in doomed {
            let Some(slot) = self.slots.get_mut(id.index as usize) else {
                continue;
            };
            if slot.generation != id.generation || slot.node.take().is_none() {
                continue;
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
            self.live -= 1;
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node_mut(id).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent) = self.node_mut(parent) {
            parent.children.retain(|&c| c != id);
        }
    }

    /// Move `child` under `parent` at `index` (clamped). Refuses unknown
    /// nodes and moves that would create a cycle.
    fn attach(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) -> bool {
        if self.node(parent).is_none()
            || self.node(child).is_none()
            || self.is_inclusive_ancestor(child, parent)
        {
            return false;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(parent) {
            let at = index.map_or(node.children.len(), |i| i.min(node.children.len()));
            node.children.insert(at, child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        true
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            let Some(current) = self.node(node) else {
                return false;
            };
            if node == ancestor {
                return true;
            }
            match current.parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        out.push_str(&node.text);
        for &child in &node.children {
            self.collect_text(child, out);
        }
    }

    fn descendants(&self, root: NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.node(root) else {
            return;
        };
        for &child in &node.children {
            out.push(child);
            self.descendants(child, out);
        }
    }
}

/// A shared, single-threaded document.
///
/// Handles that do not belong to this document, or whose node was removed,
/// are inert: reads return empty values and writes do nothing.
#[derive(Debug, Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with a `body` root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(DocumentInner::new())),
        }
    }

    /// Whether two handles refer to the same document.
    #[must_use]
    pub fn same_document(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The root node.
    #[must_use]
    pub fn body(&self) -> NodeId {
        self.inner.borrow().body
    }

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.inner.borrow_mut().alloc(tag)
    }

    /// Create a detached `img` with the given source and intrinsic size.
    pub fn create_image(&self, src: &str, width: i32, height: i32) -> NodeId {
        let img = self.create_element("img");
        self.set_attribute(img, "src", src);
        self.set_attribute(img, "width", &width.to_string());
        self.set_attribute(img, "height", &height.to_string());
        img
    }

    /// Whether `node` is a live node of this document.
    #[must_use]
    pub fn has_node(&self, node: NodeId) -> bool {
        self.inner.borrow().node(node).is_some()
    }

    /// Number of live nodes, attached or not.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.borrow().live
    }

    // ------------------------------------------------------------------
    // Tree
    // ------------------------------------------------------------------

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        self.inner.borrow_mut().attach(parent, child, None);
    }

    /// Insert `child` as the first child of `parent`.
    pub fn prepend_child(&self, parent: NodeId, child: NodeId) {
        self.inner.borrow_mut().attach(parent, child, Some(0));
    }

    /// Insert `node` right after `reference` under the same parent.
    ///
    /// Returns `false` when `reference` has no parent.
    pub fn insert_after(&self, reference: NodeId, node: NodeId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(parent) = inner.parent_of(reference) else {
            return false;
        };
        if reference == node {
            return true;
        }
        if inner.node(node).is_none() || inner.is_inclusive_ancestor(node, parent) {
            return false;
        }
        inner.detach(node);
        let index = inner
            .node(parent)
            .and_then(|p| p.children.iter().position(|&c| c == reference))
            .map(|i| i + 1);
        inner.attach(parent, node, index)
    }

    /// Remove a node and its subtree from the document.
    ///
    /// The removed handles become stale and their slots are reused by later
    /// nodes. Focus and pointer captures inside the subtree are dropped.
    /// Removing the body or a stale handle is a no-op.
    pub fn remove(&self, node: NodeId) {
        let mut inner = self.inner.borrow_mut();
        if node == inner.body || inner.node(node).is_none() {
            return;
        }
        inner.detach(node);
        if let Some(focused) = inner.focused {
            if inner.is_inclusive_ancestor(node, focused) {
                inner.focused = None;
            }
        }
        let dropped: Vec<i32> = inner
            .captures
            .iter()
            .filter(|&(_, &target)| inner.is_inclusive_ancestor(node, target))
            .map(|(&pointer, _)| pointer)
            .collect();
        for pointer in dropped {
            inner.captures.remove(&pointer);
        }
        inner.release(node);
    }

    /// Parent of a node.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().parent_of(node)
    }

    /// Children of a node, in order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// First child of a node.
    #[must_use]
    pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.inner
            .borrow()
            .node(node)
            .and_then(|n| n.children.first().copied())
    }

    /// Whether `node` is `ancestor` or lies inside it.
    #[must_use]
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inner.borrow().is_inclusive_ancestor(ancestor, node)
    }

    /// Whether a node is attached to the document body.
    #[must_use]
    pub fn is_connected(&self, node: NodeId) -> bool {
        let inner = self.inner.borrow();
        inner.is_inclusive_ancestor(inner.body, node)
    }

    /// Lowercase tag name, empty for unknown nodes.
    #[must_use]
    pub fn tag(&self, node: NodeId) -> String {
        self.inner
            .borrow()
            .node(node)
            .map(|n| n.tag.clone())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Classes and attributes
    // ------------------------------------------------------------------

    /// Add a class if missing.
    pub fn add_class(&self, node: NodeId, class: &str) {
        let mut inner = self.inner.borrow_mut();
        if let Some(node) = inner.node_mut(node) {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        }
    }

    /// Remove a class if present.
    pub fn remove_class(&self, node: NodeId, class: &str) {
        if let Some(node) = self.inner.borrow_mut().node_mut(node) {
            node.classes.retain(|c| c != class);
        }
    }

    /// Whether the node carries a class.
    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.inner
            .borrow()
            .node(node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    /// Space-separated class list.
    #[must_use]
    pub fn class_name(&self, node: NodeId) -> String {
        self.inner
            .borrow()
            .node(node)
            .map(|n| n.classes.join(" "))
            .unwrap_or_default()
    }

    /// Set an attribute.
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        if let Some(node) = self.inner.borrow_mut().node_mut(node) {
            node.attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// Read an attribute.
    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .borrow()
            .node(node)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    /// Remove an attribute.
    pub fn remove_attribute(&self, node: NodeId, name: &str) {
        if let Some(node) = self.inner.borrow_mut().node_mut(node) {
            node.attributes.remove(name);
        }
    }

    // ------------------------------------------------------------------
    // Inline style
    // ------------------------------------------------------------------

    /// Set an inline style property.
    pub fn set_style(&self, node: NodeId, property: &str, value: &str) {
        if let Some(node) = self.inner.borrow_mut().node_mut(node) {
            node.style.insert(property.to_string(), value.to_string());
        }
    }

    /// Set an inline pixel length (`"12px"`).
    pub fn set_style_px(&self, node: NodeId, property: &str, px: i32) {
        self.set_style(node, property, &format!("{px}px"));
    }

    /// Read an inline style property.
    #[must_use]
    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        self.inner
            .borrow()
            .node(node)
            .and_then(|n| n.style.get(property).cloned())
    }

    /// Remove an inline style property (the `el.style.x = ''` idiom).
    pub fn remove_style(&self, node: NodeId, property: &str) {
        if let Some(node) = self.inner.borrow_mut().node_mut(node) {
            node.style.remove(property);
        }
    }

    /// Integer value of an inline length, `parseInt` style: leading digits
    /// of `"12px"` or `"12.7px"`. `None` when unset or unparsable.
    #[must_use]
    pub fn style_px(&self, node: NodeId, property: &str) -> Option<i32> {
        self.style(node, property).and_then(|v| parse_leading_int(&v))
    }

    /// Inline `left`/`top`, defaulting to zero.
    #[must_use]
    pub fn inline_position(&self, node: NodeId) -> Position {
        Position::new(
            self.style_px(node, "left").unwrap_or(0),
            self.style_px(node, "top").unwrap_or(0),
        )
    }

    /// Inline `width`/`height`, falling back to the layout size.
    #[must_use]
    pub fn inline_size(&self, node: NodeId) -> Size {
        let layout = self.bounding_rect(node);
        Size::new(
            self.style_px(node, "width")
                .filter(|&w| w != 0)
                .unwrap_or(layout.width),
            self.style_px(node, "height")
                .filter(|&h| h != 0)
                .unwrap_or(layout.height),
        )
    }

    /// Whether `display: none` is set inline.
    #[must_use]
    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.style(node, "display").as_deref() == Some("none")
    }

    /// Rendered size of an element: `width`/`height` attributes, then inline
    /// style. Hidden or detached elements still report their size.
    #[must_use]
    pub fn rendered_size(&self, node: NodeId) -> Size {
        let dimension = |attr: &str| {
            self.attribute(node, attr)
                .and_then(|v| parse_leading_int(&v))
                .or_else(|| self.style_px(node, attr))
                .unwrap_or(0)
        };
        Size::new(dimension("width"), dimension("height"))
    }

    /// Page-space box of a node: inline `left`/`top` summed over ancestors,
    /// size from [`Document::rendered_size`].
    #[must_use]
    pub fn bounding_rect(&self, node: NodeId) -> Rect {
        let size = self.rendered_size(node);
        let (mut left, mut top): (i32, i32) = (0, 0);
        let mut current = Some(node);
        while let Some(id) = current {
            left = self.style_px(id, "left").map_or(left, |px| left.saturating_add(px));
            top = self.style_px(id, "top").map_or(top, |px| top.saturating_add(px));
            current = self.parent(id);
        }
        Rect::new(left, top, size.width, size.height)
    }

    // ------------------------------------------------------------------
    // Text and form values
    // ------------------------------------------------------------------

    /// Replace a node's children with plain text. Never parses markup.
    pub fn set_text_content(&self, node: NodeId, text: &str) {
        let children = self.children(node);
        for child in children {
            self.remove(child);
        }
        if let Some(node) = self.inner.borrow_mut().node_mut(node) {
            node.text = text.to_string();
        }
    }

    /// Concatenated text of a node and its descendants.
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.inner.borrow().collect_text(node, &mut out);
        out
    }

    /// Set the value of a form control.
    pub fn set_value(&self, node: NodeId, value: &str) {
        if let Some(node) = self.inner.borrow_mut().node_mut(node) {
            node.value = value.to_string();
        }
    }

    /// Value of a form control.
    #[must_use]
    pub fn value(&self, node: NodeId) -> String {
        self.inner
            .borrow()
            .node(node)
            .map(|n| n.value.clone())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Focus and pointer capture
    // ------------------------------------------------------------------

    /// Focus a node.
    pub fn focus(&self, node: NodeId) {
        let mut inner = self.inner.borrow_mut();
        if inner.node(node).is_some() {
            inner.focused = Some(node);
        }
    }

    /// Currently focused node.
    #[must_use]
    pub fn active_element(&self) -> Option<NodeId> {
        self.inner.borrow().focused
    }

    /// Route a pointer's events to `node` until released.
    pub fn set_pointer_capture(&self, node: NodeId, pointer_id: i32) {
        let mut inner = self.inner.borrow_mut();
        if inner.node(node).is_some() {
            inner.captures.insert(pointer_id, node);
        }
    }

    /// Release a capture held by `node`.
    pub fn release_pointer_capture(&self, node: NodeId, pointer_id: i32) {
        let mut inner = self.inner.borrow_mut();
        if inner.captures.get(&pointer_id) == Some(&node) {
            inner.captures.remove(&pointer_id);
        }
    }

    /// Node capturing a pointer, if any.
    #[must_use]
    pub fn pointer_capture(&self, pointer_id: i32) -> Option<NodeId> {
        self.inner.borrow().captures.get(&pointer_id).copied()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Descendants of `root` in document order (excluding `root`).
    #[must_use]
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.inner.borrow().descendants(root, &mut out);
        out
    }

    /// First descendant carrying `class`.
    #[must_use]
    pub fn query_class(&self, root: NodeId, class: &str) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|&n| self.has_class(n, class))
    }

    /// All descendants carrying `class`.
    #[must_use]
    pub fn query_class_all(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&n| self.has_class(n, class))
            .collect()
    }

    /// All descendants with the given tag.
    #[must_use]
    pub fn query_tag_all(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let tag = tag.to_ascii_lowercase();
        let inner = self.inner.borrow();
        let mut all = Vec::new();
        inner.descendants(root, &mut all);
        all.into_iter()
            .filter(|&n| inner.node(n).is_some_and(|node| node.tag == tag))
            .collect()
    }

    /// Nearest inclusive ancestor of `node` carrying `class`.
    #[must_use]
    pub fn closest_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.has_class(id, class) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize a subtree as HTML. Text and attribute values are escaped;
    /// each element carries its id as `data-node`.
    #[must_use]
    pub fn to_html(&self, root: NodeId) -> String {
        let mut out = String::new();
        self.write_html(root, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let (tag, classes, attributes, style, text, children) = {
            let inner = self.inner.borrow();
            let Some(node) = inner.node(id) else {
                return;
            };
            (
                node.tag.clone(),
                node.classes.join(" "),
                node.attributes.clone(),
                node.style
                    .iter()
                    .map(|(k, v)| format!("{k}: {v};"))
                    .collect::<Vec<_>>()
                    .join(" "),
                node.text.clone(),
                node.children.clone(),
            )
        };
        let _ = write!(out, "<{tag} data-node=\"{}\"", u64::from(id));
        if !classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape(&classes));
        }
        for (name, value) in &attributes {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }
        if !style.is_empty() {
            let _ = write!(out, " style=\"{}\"", escape(&style));
        }
        if tag == "img" {
            out.push('>');
            return;
        }
        out.push('>');
        out.push_str(&escape(&text));
        for child in children {
            self.write_html(child, out);
        }
        let _ = write!(out, "</{tag}>");
    }
}

fn parse_leading_int(value: &str) -> Option<i32> {
    let trimmed = value.trim_start();
    let end = trimmed
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map_or(trimmed.len(), |(i, _)| i);
    trimmed[..end].parse().ok()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
