//! In-process tests for the HTTP surface.
//!
//! Each test builds the router over a fresh in-memory store and drives it
//! with `tower::ServiceExt::oneshot`, so no server or Redis is needed.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use wikirelay_api::{router, AppState, Notifier};
use wikirelay_core::{Error, Result};
use wikirelay_store::{KvSubscriptionRepository, MemoryKvStore};

const SITE: &str = "https://wiki.example.com";

/// Records deliveries; fails for channels listed in `failing`.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    failing: Vec<String>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, channel_id: &str, message: &str) -> Result<()> {
        if self.failing.iter().any(|c| c == channel_id) {
            return Err(Error::Store("chat unavailable".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel_id.to_string(), message.to_string()));
        Ok(())
    }
}

fn app_with(notifier: Arc<RecordingNotifier>, v9: bool) -> Router {
    let repo = KvSubscriptionRepository::new(Arc::new(MemoryKvStore::new()));
    router(AppState::new(Arc::new(repo), notifier, v9, SITE.to_string()))
}

fn app() -> Router {
    app_with(Arc::new(RecordingNotifier::default()), false)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn space_body(alias: &str, space_key: &str, events: &[&str]) -> Value {
    json!({
        "alias": alias,
        "baseURL": SITE,
        "spaceKey": space_key,
        "events": events,
        "subscriptionType": "space_subscription",
    })
}

fn page_body(alias: &str, page_id: &str, events: &[&str]) -> Value {
    json!({
        "alias": alias,
        "baseURL": SITE,
        "pageID": page_id,
        "events": events,
        "subscriptionType": "page_subscription",
    })
}

const SPACE_ROUTE: &str = "/api/v1/channels/C1/subscriptions/space_subscription";
const PAGE_ROUTE: &str = "/api/v1/channels/C1/subscriptions/page_subscription";

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_save_and_get_uses_path_channel() {
    let app = app();
    let mut body = space_body("s1", "ENG", &["page_created"]);
    body["channelID"] = json!("somewhere-else");

    let (status, saved) = send(&app, Method::POST, SPACE_ROUTE, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["channelID"], "C1");

    let (status, fetched) = send(
        &app,
        Method::GET,
        "/api/v1/channels/C1/subscriptions/S1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["alias"], "s1");
    assert_eq!(fetched["spaceKey"], "ENG");
    assert_eq!(fetched["subscriptionType"], "space_subscription");
}

#[tokio::test]
async fn test_duplicate_alias_rejected() {
    let app = app();
    let (status, _) = send(
        &app,
        Method::POST,
        SPACE_ROUTE,
        Some(space_body("docs", "ENG", &["page_created"])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        PAGE_ROUTE,
        Some(page_body("Docs", "42", &["page_updated"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "a subscription with the same name already exists in this channel"
    );
}

#[tokio::test]
async fn test_request_decoding_errors() {
    let app = app();

    let mut body = space_body("s1", "", &["page_created"]);
    let (status, resp) = send(&app, Method::POST, SPACE_ROUTE, Some(body.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "spaceKey is required");

    body["spaceKey"] = json!("ENG");
    let (status, resp) = send(&app, Method::POST, PAGE_ROUTE, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "subscription type mismatch");

    let (status, resp) = send(
        &app,
        Method::POST,
        SPACE_ROUTE,
        Some(space_body("", "ENG", &["page_created"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "subscription name can not be empty");
}

#[tokio::test]
async fn test_unsupported_event_on_v9() {
    let app = app_with(Arc::new(RecordingNotifier::default()), true);
    let (status, resp) = send(
        &app,
        Method::POST,
        PAGE_ROUTE,
        Some(page_body("p", "42", &["comment_removed"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp["error"],
        "event 'comment_removed' is not supported by the current Confluence Server version"
    );
}

#[tokio::test]
async fn test_add_then_delete_then_not_found() {
    let app = app();
    send(
        &app,
        Method::POST,
        SPACE_ROUTE,
        Some(space_body("s1", "ENG", &["page_created"])),
    )
    .await;

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/api/v1/channels/C1/subscriptions/s1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/channels/C1/subscriptions/s1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Subscription with alias **s1** not found.");
}

#[tokio::test]
async fn test_edit_and_list() {
    let app = app();
    send(
        &app,
        Method::POST,
        SPACE_ROUTE,
        Some(space_body("old", "ENG", &["page_created"])),
    )
    .await;

    let mut edited = space_body("new", "OPS", &["page_updated", "comment_created"]);
    edited["oldAlias"] = json!("old");
    let (status, body) = send(&app, Method::PUT, SPACE_ROUTE, Some(edited)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("oldAlias").is_none());

    let (status, list) = send(&app, Method::GET, "/api/v1/channels/C1/subscriptions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list["subscriptions"].get("old").is_none());
    assert_eq!(list["subscriptions"]["new"]["spaceKey"], "OPS");
    let formatted = list["formatted"].as_str().unwrap();
    assert!(formatted.starts_with("#### Space Subscriptions"));
    assert!(formatted.contains("|new|https://wiki.example.com|OPS|Page Update, Comment Create|"));

    let (status, aliases) = send(
        &app,
        Method::GET,
        "/api/v1/autocomplete/subscriptions?channel_id=C1",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(aliases, json!(["new"]));
}

#[tokio::test]
async fn test_event_fan_out_dedups_and_filters() {
    let notifier = Arc::new(RecordingNotifier::default());
    let app = app_with(notifier.clone(), false);

    // C1 watches the space and the page; C2 watches the space for another event
    send(
        &app,
        Method::POST,
        SPACE_ROUTE,
        Some(space_body("space", "ENG", &["comment_created"])),
    )
    .await;
    send(
        &app,
        Method::POST,
        PAGE_ROUTE,
        Some(page_body("page", "42", &["comment_created"])),
    )
    .await;
    send(
        &app,
        Method::POST,
        "/api/v1/channels/C2/subscriptions/space_subscription",
        Some(space_body("space", "ENG", &["page_removed"])),
    )
    .await;

    let event = json!({
        "event": "comment_created",
        "baseURL": SITE,
        "spaceKey": "ENG",
        "pageID": "42",
        "url": "https://wiki.example.com/x/42#c1",
        "parentTitle": "Roadmap",
        "parentURL": "https://wiki.example.com/x/42",
    });
    let (status, report) = send(&app, Method::POST, "/api/v1/events", Some(event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["channels"], json!(["C1"]));
    assert_eq!(report["delivered"], 1);

    let sent = notifier.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "C1");
    assert!(sent[0].1.contains("[Roadmap](https://wiki.example.com/x/42)"));
}

#[tokio::test]
async fn test_event_without_site_uses_configured_wiki() {
    let notifier = Arc::new(RecordingNotifier::default());
    let app = app_with(notifier.clone(), false);
    send(
        &app,
        Method::POST,
        SPACE_ROUTE,
        Some(space_body("s1", "ENG", &["page_created"])),
    )
    .await;

    let event = json!({ "event": "page_created", "spaceKey": "ENG", "title": "T", "url": "u" });
    let (_, report) = send(&app, Method::POST, "/api/v1/events", Some(event)).await;
    assert_eq!(report["channels"], json!(["C1"]));
}

#[tokio::test]
async fn test_failed_delivery_does_not_stop_others() {
    let notifier = Arc::new(RecordingNotifier {
        failing: vec!["C1".to_string()],
        ..Default::default()
    });
    let app = app_with(notifier.clone(), false);
    for channel in ["C1", "C2"] {
        send(
            &app,
            Method::POST,
            &format!("/api/v1/channels/{}/subscriptions/space_subscription", channel),
            Some(space_body("s", "ENG", &["page_updated"])),
        )
        .await;
    }

    let event = json!({ "event": "page_updated", "baseURL": SITE, "spaceKey": "ENG" });
    let (status, report) = send(&app, Method::POST, "/api/v1/events", Some(event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["delivered"], 1);
    assert_eq!(report["failed"], 1);
    assert_eq!(notifier.sent.lock().unwrap()[0].0, "C2");
}

#[tokio::test]
async fn test_unannounced_event_dispatches_nothing() {
    let notifier = Arc::new(RecordingNotifier::default());
    let app = app_with(notifier.clone(), false);
    let event = json!({ "event": "space_updated", "baseURL": SITE, "spaceKey": "ENG" });
    let (status, report) = send(&app, Method::POST, "/api/v1/events", Some(event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["channels"], json!([]));
    assert!(notifier.sent.lock().unwrap().is_empty());
}
