//! HTTP Transport Integration Tests
//!
//! Runs the URL transports against a local mock server:
//! - GET for load, JSON POST for save and delete
//! - Assigned ids from save responses
//! - Status, decode and URL failures surfaced through `on_error`
//! - Relative endpoints resolved against a base URL

use std::cell::RefCell;
use std::rc::Rc;

use annotate_core::{
    annotate, normalize_api, AnnotateImage, AnnotateOptions, Annotation, ApiConfig, Document,
    ErrorContext, NodeId, OperationKind, Rect,
};
use serde_json::json;
use tokio::task::LocalSet;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Failures reported through `on_error`, as (kind, message, status).
type Failures = Rc<RefCell<Vec<(OperationKind, String, Option<u16>)>>>;

/// A 400x300 image attached to a fresh document.
fn page() -> (Document, NodeId) {
    let doc = Document::new();
    let img = doc.create_image("photo.jpg", 400, 300);
    doc.append_child(doc.body(), img);
    (doc, img)
}

/// Overlay over `api` that records failures.
fn overlay(api: ApiConfig, notes: Vec<Annotation>) -> (Document, AnnotateImage, Failures) {
    let (doc, img) = page();
    let failures: Failures = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&failures);
    let options = AnnotateOptions::default()
        .notes(notes)
        .api(api)
        .on_error(move |ctx: &ErrorContext| {
            sink.borrow_mut()
                .push((ctx.kind, ctx.error.to_string(), ctx.error.status()));
        });
    let overlay = annotate(&doc, img, options).expect("overlay");
    (doc, overlay, failures)
}

fn original() -> Annotation {
    Annotation::new("1", Rect::new(100, 50, 80, 60), "Original").with_editable(true)
}

// ============================================================================
// Load
// ============================================================================

#[tokio::test]
async fn test_load_handler_gets_json_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "top": 10, "left": 20, "width": 30, "height": 40, "text": "one"},
            {"id": "b", "top": 0, "left": 0, "width": 15, "height": 15, "text": "two", "editable": true}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let api = normalize_api(ApiConfig::default().load_url(format!("{}/notes", server.uri())))
        .expect("normalize");
    let load = api.load.expect("load handler");
    let notes = load().await.expect("notes");

    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].id, "1");
    assert_eq!(notes[0].rect(), Rect::new(20, 10, 30, 40));
    assert!(notes[1].editable);
}

#[tokio::test]
async fn test_overlay_fetches_from_load_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "a", "top": 10, "left": 20, "width": 30, "height": 40, "text": "one"},
            {"id": "b", "top": 50, "left": 60, "width": 30, "height": 40, "text": "two"}
        ])))
        .expect(1..)
        .mount(&server)
        .await;

    LocalSet::new()
        .run_until(async {
            let api = ApiConfig::default().load_url(format!("{}/notes", server.uri()));
            let (_doc, overlay, failures) = overlay(api, Vec::new());

            assert!(overlay.fetch().await);
            assert_eq!(overlay.regions().len(), 2);
            assert_eq!(overlay.get_notes()[1].text, "two");
            assert!(failures.borrow().is_empty());
        })
        .await;
}

#[tokio::test]
async fn test_load_status_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    LocalSet::new()
        .run_until(async {
            let api = ApiConfig::default().load_url(format!("{}/notes", server.uri()));
            let (_doc, overlay, failures) = overlay(api, Vec::new());

            assert!(!overlay.fetch().await);
            let failures = failures.borrow();
            let (kind, message, status) = failures.last().expect("failure");
            assert_eq!(*kind, OperationKind::Load);
            assert_eq!(message, "Load failed (HTTP 503)");
            assert_eq!(*status, Some(503));
        })
        .await;
}

// ============================================================================
// Save
// ============================================================================

#[tokio::test]
async fn test_save_posts_note_and_applies_assigned_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/save"))
        .and(body_partial_json(json!({"id": "new", "text": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"annotation_id": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiConfig::default().save_url(format!("{}/save", server.uri()));
    let (doc, overlay, failures) = overlay(api, Vec::new());
    overlay.add();
    let form = overlay.active_edit().expect("session");
    doc.set_value(form.textarea, "hello");

    assert!(overlay.save_edit().await);
    assert_eq!(overlay.get_notes()[0].id, "42");
    assert!(failures.borrow().is_empty());

    let requests = server.received_requests().await.expect("recording enabled");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("json body");
    let body = body.as_object().expect("object");
    assert_eq!(body.len(), 6);
    assert!(!body.contains_key("editable"));
}

#[tokio::test]
async fn test_save_accepts_echoed_note_with_assigned_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/save"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new", "top": 30, "left": 30, "width": 30, "height": 30,
            "text": "echo", "annotation_id": "42"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiConfig::default().save_url(format!("{}/save", server.uri()));
    let (doc, overlay, failures) = overlay(api, Vec::new());
    overlay.add();
    let form = overlay.active_edit().expect("session");
    doc.set_value(form.textarea, "echo");

    assert!(overlay.save_edit().await);
    assert!(failures.borrow().is_empty());
    assert_eq!(overlay.get_notes()[0].id, "42");
    assert!(overlay.active_edit().is_none());
}

#[tokio::test]
async fn test_save_status_error_keeps_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/save"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = ApiConfig::default().save_url(format!("{}/save", server.uri()));
    let (_doc, overlay, failures) = overlay(api, Vec::new());
    overlay.add();

    assert!(!overlay.save_edit().await);
    assert!(overlay.active_edit().is_some());
    assert!(overlay.get_notes().is_empty());
    assert_eq!(
        *failures.borrow(),
        vec![(
            OperationKind::Save,
            "Save failed (HTTP 500)".to_string(),
            Some(500)
        )]
    );
}

#[tokio::test]
async fn test_save_with_undecodable_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/save"))
        .respond_with(ResponseTemplate::new(200).set_body_string("saved!"))
        .mount(&server)
        .await;

    let api = ApiConfig::default().save_url(format!("{}/save", server.uri()));
    let (_doc, overlay, failures) = overlay(api, Vec::new());
    overlay.add();

    assert!(!overlay.save_edit().await);
    let failures = failures.borrow();
    assert!(failures[0].1.starts_with("Save response could not be decoded"));
    assert_eq!(failures[0].2, None);
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_posts_listed_note() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/delete"))
        .and(body_partial_json(json!({"id": "1", "text": "Original"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiConfig::default().delete_url(format!("{}/delete", server.uri()));
    let (_doc, overlay, failures) = overlay(api, vec![original()]);
    overlay.edit(0);

    assert!(overlay.delete_edit().await);
    assert!(overlay.get_notes().is_empty());
    assert!(overlay.regions().is_empty());
    assert!(failures.borrow().is_empty());
}

// ============================================================================
// URL Resolution
// ============================================================================

#[tokio::test]
async fn test_relative_endpoints_join_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/app/api/save"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "from-base"})))
        .expect(1)
        .mount(&server)
        .await;

    let base = Url::parse(&format!("{}/app/", server.uri())).expect("base url");
    let api = ApiConfig::default().with_base_url(base).save_url("api/save");
    let (_doc, overlay, _failures) = overlay(api, Vec::new());
    overlay.add();

    assert!(overlay.save_edit().await);
    assert_eq!(overlay.get_notes()[0].id, "from-base");
}

#[tokio::test]
async fn test_relative_endpoint_without_base_is_reported() {
    let api = ApiConfig::default().save_url("api/save");
    let (_doc, overlay, failures) = overlay(api, Vec::new());
    overlay.add();

    assert!(!overlay.save_edit().await);
    let failures = failures.borrow();
    assert_eq!(failures[0].0, OperationKind::Save);
    assert!(failures[0].1.starts_with("invalid endpoint URL \"api/save\""));
}
