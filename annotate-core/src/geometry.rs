//! Pixel geometry for annotation regions.
//!
//! Everything here is pure arithmetic on integer pixels: the interaction
//! engine feeds pointer deltas in and writes the results back into inline
//! styles.

use serde::{Deserialize, Serialize};

/// Smallest width or height an interactive resize may produce.
pub const MIN_SIZE: i32 = 10;

/// A position relative to the overlay origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Pixels from the left edge.
    pub left: i32,
    /// Pixels from the top edge.
    pub top: i32,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(left: i32, top: i32) -> Self {
        Self { left, top }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Size {
    /// Create a size.
    #[must_use]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Whether either dimension is zero or negative.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Rect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Top-left corner.
    #[must_use]
    pub const fn origin(self) -> Position {
        Position::new(self.left, self.top)
    }

    /// Width and height.
    #[must_use]
    pub const fn size(self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Right edge (exclusive).
    #[must_use]
    pub const fn right(self) -> i32 {
        self.left.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    #[must_use]
    pub const fn bottom(self) -> i32 {
        self.top.saturating_add(self.height)
    }

    /// Whether `other` lies entirely inside this rectangle.
    #[must_use]
    pub const fn contains_rect(self, other: Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// A resize handle corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    /// Top-left.
    Nw,
    /// Top-right.
    Ne,
    /// Bottom-left.
    Sw,
    /// Bottom-right.
    Se,
}

impl Corner {
    /// All corners in handle creation order.
    pub const ALL: [Corner; 4] = [Corner::Nw, Corner::Ne, Corner::Sw, Corner::Se];

    /// Whether dragging this corner moves the left edge.
    #[must_use]
    pub const fn moves_left(self) -> bool {
        matches!(self, Self::Nw | Self::Sw)
    }

    /// Whether dragging this corner moves the top edge.
    #[must_use]
    pub const fn moves_top(self) -> bool {
        matches!(self, Self::Nw | Self::Ne)
    }

    /// Short name used in handle class names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nw => "nw",
            Self::Ne => "ne",
            Self::Sw => "sw",
            Self::Se => "se",
        }
    }
}

/// Allowed range for the top-left corner of a dragged element.
///
/// Fixed for the whole gesture: the element's size does not change while it
/// is dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragBounds {
    min: Position,
    max: Position,
}

impl DragBounds {
    /// No containment.
    pub const UNBOUNDED: Self = Self {
        min: Position::new(i32::MIN, i32::MIN),
        max: Position::new(i32::MAX, i32::MAX),
    };

    /// Bounds keeping an element of `size` inside `container`.
    ///
    /// `offset` converts layout coordinates into the element's style
    /// coordinates (style position minus position inside the container).
    #[must_use]
    pub fn within(container: Size, size: Size, offset: Position) -> Self {
        Self {
            min: offset,
            max: Position::new(
                container
                    .width
                    .saturating_sub(size.width)
                    .saturating_add(offset.left),
                container
                    .height
                    .saturating_sub(size.height)
                    .saturating_add(offset.top),
            ),
        }
    }

    /// Clamp a candidate position.
    #[must_use]
    pub fn clamp(self, pos: Position) -> Position {
        Position::new(
            clamp(pos.left, self.min.left, self.max.left),
            clamp(pos.top, self.min.top, self.max.top),
        )
    }
}

/// Containment for a resize, as edges in style coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeBounds {
    min_left: i32,
    min_top: i32,
    max_right: i32,
    max_bottom: i32,
}

impl ResizeBounds {
    /// No containment.
    pub const UNBOUNDED: Self = Self {
        min_left: i32::MIN,
        min_top: i32::MIN,
        max_right: i32::MAX,
        max_bottom: i32::MAX,
    };

    /// Bounds for the content box of `container`, shifted by `offset`.
    #[must_use]
    pub fn within(container: Size, offset: Position) -> Self {
        Self {
            min_left: offset.left,
            min_top: offset.top,
            max_right: container.width.saturating_add(offset.left),
            max_bottom: container.height.saturating_add(offset.top),
        }
    }

    /// Pull a rectangle back inside the bounds, then enforce [`MIN_SIZE`].
    #[must_use]
    pub fn clamp(self, rect: Rect) -> Rect {
        let Rect {
            mut left,
            mut top,
            mut width,
            mut height,
        } = rect;
        if left < self.min_left {
            width = width.saturating_sub(self.min_left.saturating_sub(left));
            left = self.min_left;
        }
        if top < self.min_top {
            height = height.saturating_sub(self.min_top.saturating_sub(top));
            top = self.min_top;
        }
        if left.saturating_add(width) > self.max_right {
            width = self.max_right.saturating_sub(left);
        }
        if top.saturating_add(height) > self.max_bottom {
            height = self.max_bottom.saturating_sub(top);
        }
        Rect::new(left, top, width.max(MIN_SIZE), height.max(MIN_SIZE))
    }
}

/// Rectangle produced by dragging `corner` of `start` by `(dx, dy)`.
///
/// Dimensions never drop below [`MIN_SIZE`]; when one would, the edge that
/// the corner moves is pinned so the opposite edge stays where it was.
#[must_use]
pub fn resize_from_corner(corner: Corner, start: Rect, dx: i32, dy: i32) -> Rect {
    let (mut left, mut width) = if corner.moves_left() {
        (start.left.saturating_add(dx), start.width.saturating_sub(dx))
    } else {
        (start.left, start.width.saturating_add(dx))
    };
    let (mut top, mut height) = if corner.moves_top() {
        (start.top.saturating_add(dy), start.height.saturating_sub(dy))
    } else {
        (start.top, start.height.saturating_add(dy))
    };

    if width < MIN_SIZE {
        if corner.moves_left() {
            left = start.right().saturating_sub(MIN_SIZE);
        }
        width = MIN_SIZE;
    }
    if height < MIN_SIZE {
        if corner.moves_top() {
            top = start.bottom().saturating_sub(MIN_SIZE);
        }
        height = MIN_SIZE;
    }

    Rect::new(left, top, width, height)
}

fn clamp(value: i32, min: i32, max: i32) -> i32 {
    // max() last: a container smaller than the element pins it to `min`.
    value.min(max).max(min)
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: Rect = Rect::new(50, 50, 30, 30);

    #[test]
    fn se_grows_additively() {
        let r = resize_from_corner(Corner::Se, START, 20, 10);
        assert_eq!(r, Rect::new(50, 50, 50, 40));
    }

    #[test]
    fn nw_moves_origin_and_inverts_delta() {
        let r = resize_from_corner(Corner::Nw, START, -10, -5);
        assert_eq!(r, Rect::new(40, 45, 40, 35));
    }

    #[test]
    fn ne_moves_top_only() {
        let r = resize_from_corner(Corner::Ne, START, 10, 10);
        assert_eq!(r, Rect::new(50, 60, 40, 20));
    }

    #[test]
    fn sw_moves_left_only() {
        let r = resize_from_corner(Corner::Sw, START, 10, 10);
        assert_eq!(r, Rect::new(60, 50, 20, 40));
    }

    #[test]
    fn minimum_size_pins_opposite_edge() {
        let r = resize_from_corner(Corner::Nw, START, 100, 100);
        assert_eq!(r.width, MIN_SIZE);
        assert_eq!(r.height, MIN_SIZE);
        assert_eq!(r.right(), START.right());
        assert_eq!(r.bottom(), START.bottom());

        let r = resize_from_corner(Corner::Se, START, -100, -100);
        assert_eq!(r, Rect::new(50, 50, MIN_SIZE, MIN_SIZE));
    }

    #[test]
    fn drag_bounds_keep_element_inside() {
        let bounds = DragBounds::within(Size::new(400, 300), Size::new(30, 30), Position::default());
        assert_eq!(bounds.clamp(Position::new(-20, -20)), Position::new(0, 0));
        assert_eq!(bounds.clamp(Position::new(500, 500)), Position::new(370, 270));
        assert_eq!(bounds.clamp(Position::new(100, 80)), Position::new(100, 80));
    }

    #[test]
    fn unbounded_drag_passes_through() {
        let p = Position::new(-5000, 9000);
        assert_eq!(DragBounds::UNBOUNDED.clamp(p), p);
    }

    #[test]
    fn resize_bounds_trim_overflow() {
        let bounds = ResizeBounds::within(Size::new(400, 300), Position::default());
        let r = bounds.clamp(Rect::new(-10, 280, 50, 50));
        assert_eq!(r, Rect::new(0, 280, 40, 20));
    }

    #[test]
    fn resize_bounds_respect_minimum() {
        let bounds = ResizeBounds::within(Size::new(400, 300), Position::default());
        let r = bounds.clamp(Rect::new(-30, 0, 35, 40));
        assert_eq!(r.width, MIN_SIZE);
        assert_eq!(r.left, 0);
    }

    #[test]
    fn extreme_deltas_saturate() {
        let r = resize_from_corner(Corner::Nw, START, i32::MIN, i32::MIN);
        assert_eq!((r.left, r.width), (i32::MIN + 50, i32::MAX));
        let r = resize_from_corner(Corner::Se, START, i32::MAX, i32::MAX);
        assert_eq!((r.width, r.height), (i32::MAX, i32::MAX));

        let bounds = ResizeBounds::within(Size::new(400, 300), Position::default());
        let clamped = bounds.clamp(Rect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX));
        assert!(clamped.left >= 0 && clamped.right() <= 400);
        assert!(clamped.top >= 0 && clamped.bottom() <= 300);
    }
}
