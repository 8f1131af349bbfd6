#![allow(clippy::unwrap_used)]
// Integration tests for `DeviceRegistry` and the batch services.

use std::time::{Duration, Instant};

use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use geekmagic_api::RenderClient;
use geekmagic_core::{
    CoordinatorState, CoreError, DeviceConfig, DeviceRegistry, UPLOAD_FILENAME, fetch_image,
    send_html, send_image,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn config_for(host: &str) -> DeviceConfig {
    DeviceConfig {
        timeout: Duration::from_secs(2),
        upload_timeout: Duration::from_secs(2),
        ..DeviceConfig::new(host)
    }
}

/// A fake device that answers polls and accepts uploads.
async fn healthy_device() -> MockServer {
    let server = MockServer::start().await;
    for (endpoint, body) in [
        ("/app.json", json!({ "theme": 1 })),
        ("/brt.json", json!({ "brt": 50 })),
        ("/v.json", json!({ "m": "SmallTV-Pro" })),
        ("/space.json", json!({ "free": 8192 })),
    ] {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/filelist"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<table></table>"))
        .mount(&server)
        .await;
    server
}

/// A device that accepts connections and never answers.
async fn silent_device() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (format!("http://{addr}"), task)
}

fn impatient_config(host: &str) -> DeviceConfig {
    DeviceConfig {
        timeout: Duration::from_millis(200),
        upload_timeout: Duration::from_millis(200),
        ..DeviceConfig::new(host)
    }
}

async fn accept_delivery(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/doUpload"))
        .and(query_param("dir", "/image/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/set"))
        .and(query_param("img", format!("/image/{UPLOAD_FILENAME}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/set"))
        .and(query_param("theme", "3"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(server)
        .await;
}

// ── Registry tests ──────────────────────────────────────────────────

#[tokio::test]
async fn test_register_refreshes_and_polls() {
    let server = healthy_device().await;
    let registry = DeviceRegistry::new();

    let handle = registry
        .register("kitchen", config_for(&server.uri()))
        .await
        .unwrap();

    assert_eq!(handle.coordinator.state(), CoordinatorState::Ready);
    assert_eq!(handle.coordinator.snapshot().brightness, Some(50));
    assert!(handle.coordinator.is_polling().await);
    assert_eq!(registry.ids(), vec!["kitchen"]);

    let removed = registry.remove("kitchen").await.unwrap();
    assert!(!removed.coordinator.is_polling().await);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_unreachable_device_stays_registered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let registry = DeviceRegistry::new();

    let result = registry.register("hall", config_for(&server.uri())).await;
    assert!(matches!(result, Err(CoreError::AggregateUnavailable { .. })));

    let handle = registry.get("hall").unwrap();
    assert_eq!(handle.coordinator.state(), CoordinatorState::Unavailable);
    assert_eq!(registry.len(), 1);
    registry.shutdown().await;
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_register_all_refreshes_concurrently() {
    let registry = DeviceRegistry::new();
    let (solo_host, solo_task) = silent_device().await;
    let started = Instant::now();
    assert!(registry.register("solo", impatient_config(&solo_host)).await.is_err());
    let single = started.elapsed();
    registry.shutdown().await;
    solo_task.abort();

    let good = healthy_device().await;
    let mut devices = vec![("good".to_owned(), config_for(&good.uri()))];
    let mut listeners = Vec::new();
    for name in ["attic", "garage", "shed"] {
        let (host, task) = silent_device().await;
        devices.push((name.to_owned(), impatient_config(&host)));
        listeners.push(task);
    }

    let started = Instant::now();
    let results = registry.register_all(devices).await;
    let elapsed = started.elapsed();

    assert!(
        elapsed < single * 2,
        "three silent devices took {elapsed:?}, one alone took {single:?}"
    );
    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["good", "attic", "garage", "shed"]);
    assert!(results[0].1.is_ok());
    assert!(results[1..].iter().all(|(_, r)| r.is_err()));
    assert_eq!(registry.len(), 4);
    assert_eq!(
        registry.require("good").unwrap().coordinator.state(),
        CoordinatorState::Ready
    );

    registry.shutdown().await;
    for task in listeners {
        task.abort();
    }
}

#[tokio::test]
async fn test_require_unknown_device() {
    let registry = DeviceRegistry::new();
    assert!(matches!(
        registry.require("nope"),
        Err(CoreError::DeviceNotFound { .. })
    ));
    assert!(registry.remove("nope").await.is_none());
}

// ── Batch service tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_send_image_isolates_failures() {
    let good = healthy_device().await;
    accept_delivery(&good).await;
    let bad = healthy_device().await;
    Mock::given(method("POST"))
        .and(path("/doUpload"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&bad)
        .await;

    let registry = DeviceRegistry::new();
    registry.register("good", config_for(&good.uri())).await.unwrap();
    registry.register("bad", config_for(&bad.uri())).await.unwrap();

    let ids = vec!["bad".to_owned(), "good".to_owned(), "gone".to_owned()];
    let outcomes = send_image(&registry, &ids, b"\xFF\xD8\xFFjpeg", "holiday.JPG")
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(matches!(
        outcomes[0].result,
        Err(CoreError::Api { status: Some(500), .. })
    ));
    assert!(outcomes[1].is_ok(), "good device failed: {:?}", outcomes[1]);
    assert!(matches!(
        outcomes[2].result,
        Err(CoreError::DeviceNotFound { .. })
    ));

    registry.shutdown().await;
    good.verify().await;
}

#[tokio::test]
async fn test_send_html_renders_once() {
    let render = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/render"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xFF\xD8\xFFrendered".to_vec()))
        .expect(1)
        .mount(&render)
        .await;

    let device = healthy_device().await;
    accept_delivery(&device).await;
    let registry = DeviceRegistry::new();
    registry.register("den", config_for(&device.uri())).await.unwrap();

    let client = RenderClient::new(
        reqwest::Client::new(),
        Url::parse(&format!("{}/render", render.uri())).unwrap(),
    );
    let outcomes = send_html(&registry, &["den".to_owned()], "<h1>Hi</h1>", &client)
        .await
        .unwrap();

    assert!(outcomes.iter().all(|o| o.is_ok()), "{outcomes:?}");
    registry.shutdown().await;
    render.verify().await;
    device.verify().await;
}

#[tokio::test]
async fn test_send_html_render_failure_aborts() {
    let render = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&render)
        .await;
    let registry = DeviceRegistry::new();
    let client = RenderClient::new(reqwest::Client::new(), Url::parse(&render.uri()).unwrap());

    let result = send_html(&registry, &["den".to_owned()], "<p>x</p>", &client).await;
    assert!(matches!(result, Err(CoreError::Api { status: Some(502), .. })));
}

#[tokio::test]
async fn test_fetch_image_names_file_after_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photos/beach.JPEG"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\xFF\xD8\xFFbeach".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/photos/beach.JPEG?size=large", server.uri())).unwrap();
    let (filename, data) = fetch_image(&url).await.unwrap();
    assert_eq!(filename, "beach.JPEG");
    assert_eq!(data, b"\xFF\xD8\xFFbeach");
}

#[tokio::test]
async fn test_fetch_image_checks_extension_before_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/logo.png", server.uri())).unwrap();
    assert!(matches!(
        fetch_image(&url).await,
        Err(CoreError::ValidationFailed { .. })
    ));
    let bare = Url::parse(&format!("{}/", server.uri())).unwrap();
    assert!(fetch_image(&bare).await.is_err());
}

#[tokio::test]
async fn test_fetch_image_failed_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/gone.jpg", server.uri())).unwrap();
    assert!(matches!(
        fetch_image(&url).await,
        Err(CoreError::Api { status: Some(404), .. })
    ));
}
