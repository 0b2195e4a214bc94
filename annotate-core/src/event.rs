//! Input events dispatched into an overlay.

use serde::{Deserialize, Serialize};

use crate::dom::NodeId;
use crate::geometry::Position;

/// Primary (usually left) pointer button.
pub const PRIMARY_BUTTON: i16 = 0;

/// Pointer state carried by pointer events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerInfo {
    /// Pointer identifier (for capture and multi-pointer input).
    pub pointer_id: i32,
    /// X position in client coordinates.
    pub client_x: i32,
    /// Y position in client coordinates.
    pub client_y: i32,
    /// Button that changed state (0 = primary, 1 = middle, 2 = secondary).
    pub button: i16,
}

impl PointerInfo {
    /// Primary-button pointer at a client position.
    #[must_use]
    pub const fn primary(client_x: i32, client_y: i32) -> Self {
        Self {
            pointer_id: 1,
            client_x,
            client_y,
            button: PRIMARY_BUTTON,
        }
    }

    /// Same pointer with a different button.
    #[must_use]
    pub const fn with_button(mut self, button: i16) -> Self {
        self.button = button;
        self
    }

    /// Client position.
    #[must_use]
    pub const fn position(&self) -> Position {
        Position::new(self.client_x, self.client_y)
    }
}

/// Phase of a pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Button pressed.
    Down,
    /// Pointer moved.
    Move,
    /// Button released.
    Up,
}

/// Events the overlay reacts to.
///
/// The `target` is the node the event was dispatched on; events targeting
/// nodes an overlay does not own are ignored by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomEvent {
    /// Pointer down/move/up.
    Pointer {
        /// Event target.
        target: NodeId,
        /// Gesture phase.
        phase: PointerPhase,
        /// Pointer state.
        pointer: PointerInfo,
    },
    /// Pointer entered an element.
    PointerEnter {
        /// Event target.
        target: NodeId,
    },
    /// Pointer left an element.
    PointerLeave {
        /// Event target.
        target: NodeId,
    },
    /// Activation (mouse click or synthesized click).
    Click {
        /// Event target.
        target: NodeId,
    },
    /// Key pressed.
    KeyDown {
        /// Event target.
        target: NodeId,
        /// Key value as reported by `KeyboardEvent.key`.
        key: String,
    },
}

impl DomEvent {
    /// Primary-button pointer down.
    #[must_use]
    pub const fn pointer_down(target: NodeId, x: i32, y: i32) -> Self {
        Self::Pointer {
            target,
            phase: PointerPhase::Down,
            pointer: PointerInfo::primary(x, y),
        }
    }

    /// Pointer move.
    #[must_use]
    pub const fn pointer_move(target: NodeId, x: i32, y: i32) -> Self {
        Self::Pointer {
            target,
            phase: PointerPhase::Move,
            pointer: PointerInfo::primary(x, y),
        }
    }

    /// Pointer up.
    #[must_use]
    pub const fn pointer_up(target: NodeId, x: i32, y: i32) -> Self {
        Self::Pointer {
            target,
            phase: PointerPhase::Up,
            pointer: PointerInfo::primary(x, y),
        }
    }

    /// Click.
    #[must_use]
    pub const fn click(target: NodeId) -> Self {
        Self::Click { target }
    }

    /// Key down.
    #[must_use]
    pub fn key(target: NodeId, key: &str) -> Self {
        Self::KeyDown {
            target,
            key: key.to_string(),
        }
    }

    /// The node the event was dispatched on.
    #[must_use]
    pub const fn target(&self) -> NodeId {
        match self {
            Self::Pointer { target, .. }
            | Self::PointerEnter { target }
            | Self::PointerLeave { target }
            | Self::Click { target }
            | Self::KeyDown { target, .. } => *target,
        }
    }
}
