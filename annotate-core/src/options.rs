//! Overlay configuration.
//!
//! [`AnnotateConfig`] is the serializable part (what a page or a JSON blob
//! can describe). [`AnnotateOptions`] adds what only code can provide:
//! lifecycle callbacks and transport handlers.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ErrorContext;
use crate::note::{Annotation, NoteData};
use crate::transport::ApiConfig;

/// UI strings. Every field is independently optional; `Some("")` is a real
/// override, distinct from `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Labels {
    /// "Add note" button tooltip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_note: Option<String>,
    /// Save button text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<String>,
    /// Delete button text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
    /// Cancel button text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel: Option<String>,
    /// Text area placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl Labels {
    /// Fill every unset label with its built-in default.
    #[must_use]
    pub fn resolve(&self) -> ResolvedLabels {
        let defaults = ResolvedLabels::default();
        ResolvedLabels {
            add_note: self.add_note.clone().unwrap_or(defaults.add_note),
            save: self.save.clone().unwrap_or(defaults.save),
            delete: self.delete.clone().unwrap_or(defaults.delete),
            cancel: self.cancel.clone().unwrap_or(defaults.cancel),
            placeholder: self.placeholder.clone().unwrap_or(defaults.placeholder),
        }
    }
}

/// Labels with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLabels {
    /// "Add note" button tooltip.
    pub add_note: String,
    /// Save button text.
    pub save: String,
    /// Delete button text.
    pub delete: String,
    /// Cancel button text.
    pub cancel: String,
    /// Text area placeholder (empty means none).
    pub placeholder: String,
}

impl Default for ResolvedLabels {
    fn default() -> Self {
        Self {
            add_note: "Add Note".to_string(),
            save: "OK".to_string(),
            delete: "Delete".to_string(),
            cancel: "Cancel".to_string(),
            placeholder: String::new(),
        }
    }
}

/// Endpoint URLs as they appear in serialized configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUrls {
    /// GET endpoint returning the annotation list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<String>,
    /// POST endpoint persisting one annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save: Option<String>,
    /// POST endpoint deleting one annotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
    /// Base for resolving relative endpoint URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<Url>,
}

impl From<ApiUrls> for ApiConfig {
    fn from(urls: ApiUrls) -> Self {
        let mut api = ApiConfig::default();
        if let Some(url) = urls.load {
            api = api.load_url(url);
        }
        if let Some(url) = urls.save {
            api = api.save_url(url);
        }
        if let Some(url) = urls.delete {
            api = api.delete_url(url);
        }
        if let Some(base) = urls.base_url {
            api = api.with_base_url(base);
        }
        api
    }
}

/// Serializable overlay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnotateConfig {
    /// Whether annotations may be added and edited.
    pub editable: bool,
    /// Annotations rendered at start-up when no load endpoint is set.
    pub notes: Vec<Annotation>,
    /// UI label overrides.
    pub labels: Labels,
    /// Persistence endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiUrls>,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            editable: true,
            notes: Vec::new(),
            labels: Labels::default(),
            api: None,
        }
    }
}

impl AnnotateConfig {
    /// Parse configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a configuration.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Callback receiving the full (stripped) annotation list.
pub type NotesCallback = Rc<dyn Fn(&[NoteData])>;

/// Callback receiving one (stripped) annotation.
pub type NoteCallback = Rc<dyn Fn(&NoteData)>;

/// Callback receiving a transport failure.
pub type ErrorCallback = Rc<dyn Fn(&ErrorContext)>;

/// Lifecycle callbacks. All optional.
#[derive(Clone, Default)]
pub struct Callbacks {
    /// After any mutation of the list (load, save, delete, clear).
    pub on_change: Option<NotesCallback>,
    /// After a note was saved (created or updated).
    pub on_save: Option<NoteCallback>,
    /// After a note was deleted.
    pub on_delete: Option<NoteCallback>,
    /// After notes were loaded (static or from the transport).
    pub on_load: Option<NotesCallback>,
    /// When load, save or delete fails.
    pub on_error: Option<ErrorCallback>,
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_change", &self.on_change.is_some())
            .field("on_save", &self.on_save.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .field("on_load", &self.on_load.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Full overlay options.
#[derive(Debug, Clone)]
pub struct AnnotateOptions {
    /// Whether annotations may be added and edited.
    pub editable: bool,
    /// Static annotations.
    pub notes: Vec<Annotation>,
    /// UI label overrides.
    pub labels: Labels,
    /// Persistence configuration.
    pub api: Option<ApiConfig>,
    /// Lifecycle callbacks.
    pub callbacks: Callbacks,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self::from(AnnotateConfig::default())
    }
}

impl From<AnnotateConfig> for AnnotateOptions {
    fn from(config: AnnotateConfig) -> Self {
        Self {
            editable: config.editable,
            notes: config.notes,
            labels: config.labels,
            api: config.api.map(ApiConfig::from),
            callbacks: Callbacks::default(),
        }
    }
}

impl AnnotateOptions {
    /// Set whether annotations may be edited.
    #[must_use]
    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// Set the static annotations.
    #[must_use]
    pub fn notes(mut self, notes: Vec<Annotation>) -> Self {
        self.notes = notes;
        self
    }

    /// Set label overrides.
    #[must_use]
    pub fn labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    /// Set the persistence configuration.
    #[must_use]
    pub fn api(mut self, api: ApiConfig) -> Self {
        self.api = Some(api);
        self
    }

    /// Called after any list mutation.
    #[must_use]
    pub fn on_change(mut self, f: impl Fn(&[NoteData]) + 'static) -> Self {
        self.callbacks.on_change = Some(Rc::new(f));
        self
    }

    /// Called after a save.
    #[must_use]
    pub fn on_save(mut self, f: impl Fn(&NoteData) + 'static) -> Self {
        self.callbacks.on_save = Some(Rc::new(f));
        self
    }

    /// Called after a delete.
    #[must_use]
    pub fn on_delete(mut self, f: impl Fn(&NoteData) + 'static) -> Self {
        self.callbacks.on_delete = Some(Rc::new(f));
        self
    }

    /// Called after a load.
    #[must_use]
    pub fn on_load(mut self, f: impl Fn(&[NoteData]) + 'static) -> Self {
        self.callbacks.on_load = Some(Rc::new(f));
        self
    }

    /// Called when a transport call fails.
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&ErrorContext) + 'static) -> Self {
        self.callbacks.on_error = Some(Rc::new(f));
        self
    }
}
