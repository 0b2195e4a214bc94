//! Annotation data: the persisted unit and its public shape.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Id carried by an annotation that has never been saved.
pub const NEW_NOTE_ID: &str = "new";

/// Default geometry of a freshly created annotation.
pub const DEFAULT_NOTE_RECT: Rect = Rect::new(30, 30, 30, 30);

/// One annotation on an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Opaque identifier, [`NEW_NOTE_ID`] until the first successful save.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Pixels from the top of the image.
    pub top: i32,
    /// Pixels from the left of the image.
    pub left: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Free-form text, always rendered as plain text.
    #[serde(default)]
    pub text: String,
    /// Whether this annotation may be edited (combined with the overlay's
    /// own `editable` setting).
    #[serde(default)]
    pub editable: bool,
}

impl Annotation {
    /// Create an annotation with the given id, geometry and text.
    #[must_use]
    pub fn new(id: impl Into<String>, rect: Rect, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            top: rect.top,
            left: rect.left,
            width: rect.width,
            height: rect.height,
            text: text.into(),
            editable: false,
        }
    }

    /// A blank, editable annotation at the default position.
    #[must_use]
    pub fn draft() -> Self {
        Self::new(NEW_NOTE_ID, DEFAULT_NOTE_RECT, "").with_editable(true)
    }

    /// Set the per-annotation editable flag.
    #[must_use]
    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// Whether the annotation has never been saved.
    #[must_use]
    pub fn is_new(&self) -> bool {
        self.id == NEW_NOTE_ID
    }

    /// Geometry as a rectangle.
    #[must_use]
    pub const fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }

    /// Overwrite the geometry.
    pub fn set_rect(&mut self, rect: Rect) {
        self.left = rect.left;
        self.top = rect.top;
        self.width = rect.width;
        self.height = rect.height;
    }

    /// The public shape, without internal fields.
    #[must_use]
    pub fn strip(&self) -> NoteData {
        NoteData {
            id: self.id.clone(),
            top: self.top,
            left: self.left,
            width: self.width,
            height: self.height,
            text: self.text.clone(),
        }
    }
}

/// An annotation as seen by transports and lifecycle callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteData {
    /// Opaque identifier.
    pub id: String,
    /// Pixels from the top of the image.
    pub top: i32,
    /// Pixels from the left of the image.
    pub left: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
    /// Free-form text.
    pub text: String,
}

impl From<&Annotation> for NoteData {
    fn from(note: &Annotation) -> Self {
        note.strip()
    }
}

/// Body of a successful save response.
///
/// The assigned id is read from `annotation_id`, falling back to `id`. Other
/// fields are ignored, so servers may echo the saved note back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SaveResponse")]
pub struct SaveResult {
    /// Server-assigned id, when the server assigns one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation_id: Option<String>,
}

#[derive(Deserialize)]
struct SaveResponse {
    #[serde(default, deserialize_with = "optional_string_or_number")]
    annotation_id: Option<String>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    id: Option<String>,
}

impl From<SaveResponse> for SaveResult {
    fn from(response: SaveResponse) -> Self {
        Self {
            annotation_id: response.annotation_id.or(response.id),
        }
    }
}

impl SaveResult {
    /// A result carrying an assigned id.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            annotation_id: Some(id.into()),
        }
    }
}

/// Identity of an annotation within one overlay.
///
/// Ids are not unique (every unsaved note is `"new"`), so the overlay keys
/// its view table by this instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteKey(pub(crate) u64);

impl fmt::Display for NoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note-{}", self.0)
    }
}

struct IdVisitor;

impl Visitor<'_> for IdVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or number id")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    deserializer.deserialize_any(IdVisitor)
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MaybeId {
        Id(#[serde(deserialize_with = "string_or_number")] String),
        Null(()),
    }

    Ok(match MaybeId::deserialize(deserializer)? {
        MaybeId::Id(id) => Some(id),
        MaybeId::Null(()) => None,
    })
}
