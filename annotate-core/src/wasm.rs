//! WebAssembly bindings for annotate-core.
//!
//! The overlay runs against its own headless document; the page feeds it
//! events as JSON and mirrors [`WasmAnnotator::render_html`] into the DOM.
//! Node ids appear in the mirror as `data-node` attributes.

use std::rc::Rc;

use url::Url;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::options::{ErrorCallback, NoteCallback, NotesCallback};
use crate::{
    annotate, AnnotateConfig, AnnotateImage, AnnotateOptions, Annotation, Callbacks, Document,
    DomEvent, ErrorContext, NodeId, NoteData,
};

/// Initialize the annotate WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    #[cfg(feature = "wasm")]
    console_error_panic_hook::set_once();
}

/// Annotation overlay instance for WASM.
#[wasm_bindgen]
pub struct WasmAnnotator {
    document: Document,
    image: NodeId,
    overlay: AnnotateImage,
}

#[wasm_bindgen]
impl WasmAnnotator {
    /// Create an overlay for an image of the given size.
    ///
    /// `config_json` is an `AnnotateConfig` object; an empty string means
    /// defaults. `callbacks` is an optional object with `onChange`,
    /// `onSave`, `onDelete`, `onLoad` and `onError` functions, installed
    /// before the first load so its events reach the page. Relative
    /// endpoint URLs resolve against the page URL unless `api.baseUrl` is
    /// set.
    ///
    /// # Errors
    ///
    /// Returns an error string if the configuration cannot be parsed or the
    /// image has no area.
    #[wasm_bindgen(constructor)]
    pub fn new(
        src: &str,
        width: i32,
        height: i32,
        config_json: &str,
        callbacks: JsValue,
    ) -> Result<WasmAnnotator, String> {
        Self::build(
            src,
            width,
            height,
            config_json,
            callbacks_from_js(&callbacks),
            page_url(),
        )
    }

    /// Replace the JS callbacks, given as in the constructor.
    #[wasm_bindgen(js_name = setCallbacks)]
    pub fn set_callbacks(&self, callbacks: JsValue) {
        self.overlay.set_callbacks(callbacks_from_js(&callbacks));
    }

    /// Re-render the static annotations, firing `onLoad` and `onChange`.
    pub fn load(&self) {
        self.overlay.load();
    }

    /// Feed one event, serialized as a `DomEvent`.
    ///
    /// # Errors
    ///
    /// Returns an error string if the event cannot be parsed.
    #[wasm_bindgen(js_name = dispatchJson)]
    pub fn dispatch_json(&self, json: &str) -> Result<bool, String> {
        let event: DomEvent = serde_json::from_str(json).map_err(|e| e.to_string())?;
        Ok(self.overlay.dispatch(&event))
    }

    /// Current annotations as JSON.
    #[wasm_bindgen(js_name = getNotesJson)]
    #[must_use]
    pub fn get_notes_json(&self) -> String {
        serde_json::to_string(&self.overlay.get_notes()).unwrap_or_default()
    }

    /// Replace the annotations from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error string if JSON parsing fails.
    #[wasm_bindgen(js_name = setNotesJson)]
    pub fn set_notes_json(&self, json: &str) -> Result<(), String> {
        let notes: Vec<Annotation> = serde_json::from_str(json).map_err(|e| e.to_string())?;
        self.overlay.set_notes(notes);
        Ok(())
    }

    /// Switch editing on or off.
    #[wasm_bindgen(js_name = setEditable)]
    pub fn set_editable(&self, editable: bool) {
        self.overlay.set_editable(editable);
    }

    /// Start creating an annotation.
    pub fn add(&self) -> bool {
        self.overlay.add()
    }

    /// Remove every annotation.
    pub fn clear(&self) {
        self.overlay.clear();
    }

    /// Discard the open edit form.
    #[wasm_bindgen(js_name = cancelEdit)]
    pub fn cancel_edit(&self) {
        self.overlay.cancel_edit();
    }

    /// Tear down the overlay.
    pub fn destroy(&self) {
        self.overlay.destroy();
    }

    /// `"view"` or `"edit"`.
    #[must_use]
    pub fn mode(&self) -> String {
        serde_json::to_value(self.overlay.mode())
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    /// HTML of the image and its overlay.
    #[wasm_bindgen(js_name = renderHtml)]
    #[must_use]
    pub fn render_html(&self) -> String {
        if self.overlay.is_destroyed() {
            self.document.to_html(self.image)
        } else {
            format!(
                "{}{}",
                self.document.to_html(self.image),
                self.document.to_html(self.overlay.canvas())
            )
        }
    }
}

impl WasmAnnotator {
    /// Build an annotator with `callbacks` in place before the first load.
    ///
    /// # Errors
    ///
    /// Returns an error string if the configuration cannot be parsed or the
    /// image has no area.
    pub fn build(
        src: &str,
        width: i32,
        height: i32,
        config_json: &str,
        callbacks: Callbacks,
        page: Option<Url>,
    ) -> Result<WasmAnnotator, String> {
        let config = if config_json.trim().is_empty() {
            AnnotateConfig::default()
        } else {
            AnnotateConfig::from_json(config_json).map_err(|e| e.to_string())?
        };
        let document = Document::new();
        let image = document.create_image(src, width, height);
        document.append_child(document.body(), image);
        let options = page_options(config, callbacks, page);
        let overlay = annotate(&document, image, options).map_err(|e| e.to_string())?;
        Ok(Self {
            document,
            image,
            overlay,
        })
    }
}

/// Overlay options for a page: callbacks attached and relative endpoints
/// based on `page` when the config names no base.
fn page_options(config: AnnotateConfig, callbacks: Callbacks, page: Option<Url>) -> AnnotateOptions {
    let mut options = AnnotateOptions::from(config);
    options.callbacks = callbacks;
    if let Some(api) = options.api.as_mut() {
        if api.base_url.is_none() {
            api.base_url = page;
        }
    }
    options
}

fn page_url() -> Option<Url> {
    let href = web_sys::window()?.location().href().ok()?;
    Url::parse(&href).ok()
}

fn js_function(callbacks: &JsValue, name: &str) -> Option<js_sys::Function> {
    if callbacks.is_undefined() || callbacks.is_null() {
        return None;
    }
    js_sys::Reflect::get(callbacks, &JsValue::from_str(name))
        .ok()?
        .dyn_into::<js_sys::Function>()
        .ok()
}

fn callbacks_from_js(callbacks: &JsValue) -> Callbacks {
    Callbacks {
        on_change: js_function(callbacks, "onChange").map(|f| -> NotesCallback {
            Rc::new(move |notes: &[NoteData]| call_json(&f, notes))
        }),
        on_save: js_function(callbacks, "onSave").map(|f| -> NoteCallback {
            Rc::new(move |note: &NoteData| call_json(&f, note))
        }),
        on_delete: js_function(callbacks, "onDelete").map(|f| -> NoteCallback {
            Rc::new(move |note: &NoteData| call_json(&f, note))
        }),
        on_load: js_function(callbacks, "onLoad").map(|f| -> NotesCallback {
            Rc::new(move |notes: &[NoteData]| call_json(&f, notes))
        }),
        on_error: js_function(callbacks, "onError").map(|f| -> ErrorCallback {
            Rc::new(move |context: &ErrorContext| {
                call_json(
                    &f,
                    &serde_json::json!({
                        "type": context.kind,
                        "message": context.error.to_string(),
                        "note": context.note,
                    }),
                );
            })
        }),
    }
}

fn call_json<T: serde::Serialize + ?Sized>(f: &js_sys::Function, payload: &T) {
    if let Ok(json) = serde_json::to_string(payload) {
        if let Err(err) = f.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
            tracing::warn!(?err, "annotation callback threw");
        }
    }
}
