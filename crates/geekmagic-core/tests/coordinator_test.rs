#![allow(clippy::unwrap_used)]
// Integration tests for `Coordinator` against a wiremock fake device.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use geekmagic_core::{Coordinator, CoordinatorState, CoreError, DeviceConfig, DeviceVariant};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Coordinator) {
    let server = MockServer::start().await;
    let config = device_config(&server);
    let coordinator = Coordinator::new(config.build_client().unwrap(), &config);
    (server, coordinator)
}

fn device_config(server: &MockServer) -> DeviceConfig {
    DeviceConfig {
        timeout: Duration::from_secs(2),
        ..DeviceConfig::new(server.uri())
    }
}

async fn mount_json(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer, dir: &str, files: &[&str]) {
    let html: String = files
        .iter()
        .map(|f| format!("<tr><td><a href='{dir}/{f}'>{f}</a></td></tr>"))
        .collect();
    Mock::given(method("GET"))
        .and(path("/filelist"))
        .and(query_param("dir", dir))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("<table>{html}</table>")))
        .mount(server)
        .await;
}

/// A healthy SmallTV answering every poll endpoint.
async fn mount_smalltv(server: &MockServer) {
    mount_json(server, "/app.json", json!({ "theme": 3 })).await;
    mount_json(server, "/brt.json", json!({ "brt": "70" })).await;
    mount_json(server, "/v.json", json!({ "m": "SmallTV-Ultra", "v": "9.0.40" })).await;
    mount_json(server, "/space.json", json!({ "total": 3_145_728, "free": 2_097_152 })).await;
    mount_listing(server, "/image", &["a.gif", "b.jpg"]).await;
    mount_listing(server, "/gif", &["sun.gif"]).await;
}

async fn mount_aydarik(server: &MockServer) {
    mount_json(server, "/app.json", json!({ "theme": 2 })).await;
    mount_json(server, "/brt.json", json!({ "brt": 40 })).await;
    mount_json(server, "/v.json", json!({ "m": "aydarik" })).await;
    mount_json(server, "/space.json", json!({ "free": 1024 })).await;
    mount_listing(server, "/image", &["x.jpg"]).await;
}

async fn mount_all_failing(server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

// ── Refresh tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_first_refresh_populates_snapshot() {
    let (server, coordinator) = setup().await;
    mount_smalltv(&server).await;

    coordinator.refresh().await.unwrap();

    let snap = coordinator.snapshot();
    assert_eq!(coordinator.state(), CoordinatorState::Ready);
    assert_eq!(snap.theme, Some(3));
    assert_eq!(snap.brightness, Some(70));
    assert_eq!(snap.model.as_deref(), Some("SmallTV-Ultra"));
    assert_eq!(snap.variant, DeviceVariant::SmallTv);
    assert_eq!(snap.free_space_bytes, Some(2_097_152));
    assert_eq!(snap.images, vec!["a.gif", "b.jpg"]);
    assert_eq!(snap.small_images, vec!["sun.gif"]);
    assert_eq!(snap.current_theme_name(), Some("Photo Album"));
    assert!(snap.last_updated.is_some());
}

#[tokio::test]
async fn test_missing_field_keeps_previous_value() {
    let (server, coordinator) = setup().await;
    mount_smalltv(&server).await;
    coordinator.refresh().await.unwrap();

    server.reset().await;
    mount_json(&server, "/app.json", json!({ "theme": 5 })).await;
    mount_json(&server, "/v.json", json!({ "m": "SmallTV-Ultra" })).await;
    // brt.json, space.json and the listings now 404.

    coordinator.refresh().await.unwrap();

    let snap = coordinator.snapshot();
    assert_eq!(snap.theme, Some(5));
    assert_eq!(snap.brightness, Some(70));
    assert_eq!(snap.free_space_bytes, Some(2_097_152));
    assert_eq!(snap.images, vec!["a.gif", "b.jpg"]);
}

#[tokio::test]
async fn test_field_transport_failure_keeps_previous_value() {
    let (server, coordinator) = setup().await;
    mount_smalltv(&server).await;
    coordinator.refresh().await.unwrap();

    server.reset().await;
    mount_json(&server, "/app.json", json!({ "theme": 1 })).await;
    mount_json(&server, "/v.json", json!({ "m": "SmallTV-Ultra" })).await;
    Mock::given(method("GET"))
        .and(path("/brt.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    coordinator.refresh().await.unwrap();

    let snap = coordinator.snapshot();
    assert_eq!(snap.theme, Some(1));
    assert_eq!(snap.brightness, Some(70));
    assert_eq!(coordinator.state(), CoordinatorState::Ready);
}

#[tokio::test]
async fn test_first_failure_marks_unavailable() {
    let (server, coordinator) = setup().await;
    mount_all_failing(&server).await;

    let result = coordinator.refresh().await;
    assert!(
        matches!(result, Err(CoreError::AggregateUnavailable { .. })),
        "expected AggregateUnavailable, got: {result:?}"
    );
    assert_eq!(coordinator.state(), CoordinatorState::Unavailable);
    assert_eq!(coordinator.snapshot().theme, None);

    // The device comes back.
    server.reset().await;
    mount_aydarik(&server).await;
    coordinator.refresh().await.unwrap();
    assert_eq!(coordinator.state(), CoordinatorState::Ready);
    assert!(coordinator.is_aydarik());
}

#[tokio::test]
async fn test_failure_after_success_serves_stale_snapshot() {
    let (server, coordinator) = setup().await;
    mount_smalltv(&server).await;
    coordinator.refresh().await.unwrap();
    let before = coordinator.snapshot();

    server.reset().await;
    mount_all_failing(&server).await;

    coordinator.refresh().await.unwrap();
    assert_eq!(coordinator.state(), CoordinatorState::Ready);
    assert_eq!(*coordinator.snapshot(), *before);
}

#[tokio::test]
async fn test_concurrent_refreshes_share_one_poll() {
    let (server, coordinator) = setup().await;

    Mock::given(method("GET"))
        .and(path("/app.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "theme": 1 }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    for (endpoint, body) in [
        ("/brt.json", json!({ "brt": 10 })),
        ("/v.json", json!({ "m": "aydarik" })),
        ("/space.json", json!({ "free": 4096 })),
    ] {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/filelist"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<table></table>"))
        .expect(1)
        .mount(&server)
        .await;

    let (a, b, c) = tokio::join!(
        coordinator.refresh(),
        coordinator.refresh(),
        coordinator.refresh()
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    server.verify().await;
}

#[tokio::test]
async fn test_coalesced_waiters_share_the_failure() {
    let (server, coordinator) = setup().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(100)))
        .expect(6)
        .mount(&server)
        .await;

    let (a, b) = tokio::join!(coordinator.refresh(), coordinator.refresh());
    assert_eq!(a, b);
    assert!(matches!(a, Err(CoreError::AggregateUnavailable { .. })));
    server.verify().await;
}

#[tokio::test]
async fn test_small_images_only_listed_for_smalltv() {
    let (server, coordinator) = setup().await;
    mount_aydarik(&server).await;
    Mock::given(method("GET"))
        .and(path("/filelist"))
        .and(query_param("dir", "/gif"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    coordinator.refresh().await.unwrap();
    assert!(coordinator.snapshot().small_images.is_empty());
    server.verify().await;
}

#[tokio::test]
async fn test_subscribers_see_new_snapshot() {
    let (server, coordinator) = setup().await;
    mount_smalltv(&server).await;
    let mut snapshots = coordinator.subscribe();
    let mut states = coordinator.subscribe_state();

    coordinator.refresh().await.unwrap();

    assert!(snapshots.has_changed().unwrap());
    assert_eq!(snapshots.borrow_and_update().brightness, Some(70));
    assert_eq!(*states.borrow_and_update(), CoordinatorState::Ready);
}

// ── Polling tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_polling_task_refreshes_on_interval() {
    let server = MockServer::start().await;
    mount_smalltv(&server).await;
    let config = DeviceConfig {
        update_interval: Duration::from_millis(50),
        ..device_config(&server)
    };
    let coordinator = Coordinator::new(config.build_client().unwrap(), &config);
    let mut states = coordinator.subscribe_state();

    coordinator.start().await;
    tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|s| *s == CoordinatorState::Ready),
    )
    .await
    .unwrap()
    .unwrap();

    coordinator.shutdown().await;
    assert!(!coordinator.is_polling().await);
}

// ── Pass-through tests ──────────────────────────────────────────────

#[tokio::test]
async fn test_aydarik_message_reaches_device() {
    let (server, coordinator) = setup().await;
    mount_aydarik(&server).await;
    coordinator.refresh().await.unwrap();

    Mock::given(method("GET"))
        .and(path("/set"))
        .and(query_param("msg", "Dinner is ready"))
        .and(query_param("sbj", "Home"))
        .and(query_param("style", "info"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    coordinator
        .set_message("Dinner is ready", "Home", "info", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_smalltv_rejects_custom_screens() {
    let (server, coordinator) = setup().await;
    mount_smalltv(&server).await;
    coordinator.refresh().await.unwrap();

    let result = coordinator.set_countdown("2026-12-31 23:59", "NYE", None).await;
    assert!(matches!(result, Err(CoreError::Unsupported { .. })));
    let result = coordinator.set_note("milk", None, false, None).await;
    assert!(matches!(result, Err(CoreError::Unsupported { .. })));
}

#[tokio::test]
async fn test_select_theme_by_name() {
    let (server, coordinator) = setup().await;
    mount_smalltv(&server).await;
    coordinator.refresh().await.unwrap();

    Mock::given(method("GET"))
        .and(path("/set"))
        .and(query_param("theme", "4"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let theme = coordinator.select_theme("time style 1").await.unwrap();
    assert_eq!(theme.id, 4);
}

#[tokio::test]
async fn test_control_errors_propagate() {
    let (server, coordinator) = setup().await;
    Mock::given(method("GET"))
        .and(path("/set"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let result = coordinator.set_brightness(50).await;
    assert!(
        matches!(result, Err(CoreError::Api { status: Some(503), .. })),
        "expected Api error, got: {result:?}"
    );
}
