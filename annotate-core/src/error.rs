//! Error types for annotation operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::NoteData;

/// Result type for annotation operations.
pub type AnnotateResult<T> = Result<T, AnnotateError>;

/// Errors that prevent an overlay from being created or configured.
#[derive(Debug, Error)]
pub enum AnnotateError {
    /// The image is not attached to the document.
    #[error("image-annotate: image must be in the DOM before initialization")]
    NotAttached,

    /// The image has no rendered area (usually it has not loaded yet).
    #[error(
        "image-annotate: image must have non-zero dimensions (is the image loaded?), got {width}x{height}"
    )]
    ZeroDimensions {
        /// Rendered width in pixels.
        width: i32,
        /// Rendered height in pixels.
        height: i32,
    },

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// The persistence layer could not be set up.
    #[error("image-annotate: transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

/// The persistence operation an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Fetching the initial annotation list.
    Load,
    /// Persisting a created or updated annotation.
    Save,
    /// Removing an annotation.
    Delete,
}

impl OperationKind {
    /// Capitalized name used in user-facing failure messages.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Load => "Load",
            Self::Save => "Save",
            Self::Delete => "Delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Save => "save",
            Self::Delete => "delete",
        })
    }
}

/// Failures surfaced by a transport handler.
///
/// Rejection is the only failure signal a transport has, so every variant
/// ends up in an [`ErrorContext`] handed to the `on_error` callback.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("{} failed (HTTP {status})", .operation.title())]
    Status {
        /// Operation that was attempted.
        operation: OperationKind,
        /// HTTP status code.
        status: u16,
    },

    /// The request never produced a response (connection, TLS, ...).
    #[error("{} request failed: {source}", .operation.title())]
    Request {
        /// Operation that was attempted.
        operation: OperationKind,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not match the expected shape.
    #[error("{} response could not be decoded: {source}", .operation.title())]
    Decode {
        /// Operation that was attempted.
        operation: OperationKind,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint URL could not be resolved.
    #[error("invalid endpoint URL {url:?}: {source}")]
    InvalidUrl {
        /// URL as configured.
        url: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client could not be built.
    #[error("HTTP client could not be built: {0}")]
    Client(#[source] reqwest::Error),

    /// A caller-supplied handler rejected the operation.
    #[error("{0}")]
    Rejected(String),
}

impl TransportError {
    /// Build a rejection from any displayable error.
    pub fn rejected(message: impl fmt::Display) -> Self {
        Self::Rejected(message.to_string())
    }

    /// HTTP status code, when the failure carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Everything reported to `on_error` about a failed transport call.
#[derive(Debug)]
pub struct ErrorContext {
    /// Which operation failed.
    pub kind: OperationKind,
    /// The transport failure.
    pub error: TransportError,
    /// The annotation involved, for save and delete.
    pub note: Option<NoteData>,
}

impl ErrorContext {
    /// Context for a failed load.
    #[must_use]
    pub fn load(error: TransportError) -> Self {
        Self {
            kind: OperationKind::Load,
            error,
            note: None,
        }
    }

    /// Context for a failed save or delete of `note`.
    #[must_use]
    pub fn for_note(kind: OperationKind, error: TransportError, note: NoteData) -> Self {
        Self {
            kind,
            error,
            note: Some(note),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_names_operation_and_code() {
        let err = TransportError::Status {
            operation: OperationKind::Save,
            status: 500,
        };
        assert_eq!(err.to_string(), "Save failed (HTTP 500)");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn operation_kind_serializes_lowercase() {
        let json = serde_json::to_string(&OperationKind::Delete).expect("serialize");
        assert_eq!(json, "\"delete\"");
        assert_eq!(OperationKind::Load.to_string(), "load");
    }

    #[test]
    fn rejected_keeps_message() {
        let err = TransportError::rejected("Network failure");
        assert_eq!(err.to_string(), "Network failure");
        assert!(err.status().is_none());
    }
}
