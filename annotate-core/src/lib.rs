//! # Image Annotate Core
//!
//! Interactive note overlays for images: rectangular regions with free text,
//! created, moved, resized, edited and deleted in place, optionally
//! persisted through pluggable transports.
//!
//! The overlay renders into a headless [`Document`] and is driven by typed
//! [`DomEvent`]s, so the same controller runs natively (tests, servers) and
//! in the browser through the `wasm` feature.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                AnnotateImage                │
//! ├─────────────────────────────────────────────┤
//! │  Views           │  Edit Session            │
//! │  - Regions       │  - Form / buttons        │
//! │  - Tooltips      │  - Save / delete / cancel│
//! │  - Hover         │  - Busy guard            │
//! ├─────────────────────────────────────────────┤
//! │  Interactions    │  Transport               │
//! │  - Drag          │  - URL → HTTP (reqwest)  │
//! │  - Resize        │  - Handlers / NoteStore  │
//! │  - Containment   │  - Lifecycle callbacks   │
//! ├─────────────────────────────────────────────┤
//! │        Document (headless DOM) + DomEvent   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use annotate_core::{annotate, AnnotateConfig, Document, DomEvent, Mode};
//!
//! let doc = Document::new();
//! let img = doc.create_image("photo.jpg", 640, 480);
//! doc.append_child(doc.body(), img);
//!
//! let overlay = annotate(&doc, img, AnnotateConfig::default()).unwrap();
//! let add = overlay.button().unwrap();
//! assert!(overlay.dispatch(&DomEvent::click(add)));
//! assert_eq!(overlay.mode(), Mode::Edit);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod dom;
pub mod edit;
pub mod error;
pub mod event;
pub mod geometry;
pub mod image;
pub mod interaction;
pub mod note;
pub mod options;
pub mod transport;
pub mod view;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use dom::{Document, NodeId};
pub use edit::{EditHandles, EditSession};
pub use error::{AnnotateError, AnnotateResult, ErrorContext, OperationKind, TransportError};
pub use event::{DomEvent, PointerInfo, PointerPhase};
pub use geometry::{Corner, Position, Rect, Size, MIN_SIZE};
pub use image::{annotate, AnnotateImage, Mode};
pub use interaction::{DragOptions, Interactions, ResizeOptions};
pub use note::{Annotation, NoteData, NoteKey, SaveResult, NEW_NOTE_ID};
pub use options::{AnnotateConfig, AnnotateOptions, ApiUrls, Callbacks, Labels, ResolvedLabels};
pub use transport::{normalize_api, ApiConfig, Endpoint, NormalizedApi, NoteStore};
pub use view::{AnnotateView, ViewHandles};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
