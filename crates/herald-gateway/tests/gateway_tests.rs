// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route-level tests driven through the router with `oneshot`.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use herald_config::model::SessionsConfig;
use herald_core::TenantId;
use herald_gateway::{GatewayState, MediaStore, TenantTokens, router};
use herald_test_utils::{PairingScript, TestHarness};
use serde_json::{Value, json};
use tower::ServiceExt;

const ANI: &str = "081234567890";
const BUDI: &str = "+62 812-9876-5432";

fn app(h: &TestHarness) -> Router {
    let tokens = TenantTokens::new([("tok-a", "shop-a"), ("tok-b", "shop-b")]);
    router(GatewayState::new(h.engine.clone(), h.pool.clone(), tokens))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
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
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn seeded() -> TestHarness {
    let h = TestHarness::builder().build().await.unwrap();
    h.add_customers(&TenantId::from("shop-a"), &[("Ani", ANI), ("Budi", BUDI)])
        .await
        .unwrap();
    h
}

async fn create(app: &Router, token: &str, body: &str) -> String {
    let (status, created) = call(
        app,
        Method::POST,
        "/broadcasts",
        Some(token),
        Some(json!({ "template": { "body": body }, "recipients": "all" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created["broadcast_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_needs_no_token() {
    let h = seeded().await;
    let (status, body) = call(&app(&h), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connected_sessions"], 0);
}

#[tokio::test]
async fn api_rejects_missing_or_unknown_tokens() {
    let h = seeded().await;
    let app = app(&h);

    let (status, body) = call(&app, Method::GET, "/broadcasts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = call(&app, Method::GET, "/broadcasts", Some("nope"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_list_and_fetch_broadcast() {
    let h = seeded().await;
    let app = app(&h);

    let (status, created) = call(
        &app,
        Method::POST,
        "/broadcasts",
        Some("tok-a"),
        Some(json!({ "title": "Promo", "template": { "body": "Hi {name}" }, "recipients": "all" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "draft");
    assert_eq!(created["recipient_count"], 2);
    let id = created["broadcast_id"].as_str().unwrap();

    let (status, detail) =
        call(&app, Method::GET, &format!("/broadcasts/{id}"), Some("tok-a"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["title"], "Promo");
    assert_eq!(detail["counts"]["pending"], 2);
    assert_eq!(detail["recipients"].as_array().unwrap().len(), 2);

    let (status, list) = call(
        &app,
        Method::GET,
        "/broadcasts?status=draft&page=1&limit=10",
        Some("tok-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["broadcasts"].as_array().unwrap().len(), 1);
    assert_eq!(list["pagination"]["total"], 1);
    assert_eq!(list["pagination"]["total_pages"], 1);
}

#[tokio::test]
async fn other_tenants_cannot_see_broadcast() {
    let h = seeded().await;
    let app = app(&h);
    let id = create(&app, "tok-a", "Hello").await;

    let (status, body) =
        call(&app, Method::GET, &format!("/broadcasts/{id}"), Some("tok-b"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (_, list) = call(&app, Method::GET, "/broadcasts", Some("tok-b"), None).await;
    assert_eq!(list["pagination"]["total"], 0);
}

#[tokio::test]
async fn invalid_create_requests_are_bad_requests() {
    let h = seeded().await;
    let app = app(&h);

    let (status, body) = call(
        &app,
        Method::POST,
        "/broadcasts",
        Some("tok-a"),
        Some(json!({ "template": { "body": "   " }, "recipients": "all" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty"));

    // Tenant b has no customers, so nothing resolves.
    let (status, _) = call(
        &app,
        Method::POST,
        "/broadcasts",
        Some("tok-b"),
        Some(json!({ "template": { "body": "Hi" }, "recipients": "all" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        Method::POST,
        "/broadcasts",
        Some("tok-a"),
        Some(json!({ "recipients": "all" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn send_runs_dispatch_and_rejects_resend() {
    let h = seeded().await;
    let app = app(&h);
    let id = create(&app, "tok-a", "Hi {name}").await;

    let (status, report) = call(
        &app,
        Method::POST,
        &format!("/broadcasts/{id}/send"),
        Some("tok-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{report}");
    assert_eq!(report["status"], "completed");
    assert_eq!(report["sent"], 2);
    assert_eq!(report["failed"], 0);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/broadcasts/{id}/send"),
        Some("tok-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn send_unknown_broadcast_is_bad_request() {
    let h = seeded().await;
    let (status, body) = call(
        &app(&h),
        Method::POST,
        "/broadcasts/does-not-exist/send",
        Some("tok-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn send_without_usable_session_is_bad_request() {
    let h = TestHarness::builder()
        .with_default_script(PairingScript::Challenge("2@scan".into()))
        .build()
        .await
        .unwrap();
    h.add_customers(&TenantId::from("shop-a"), &[("Ani", ANI)])
        .await
        .unwrap();
    let app = app(&h);
    let id = create(&app, "tok-a", "Hi").await;

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/broadcasts/{id}/send"),
        Some("tok-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, detail) =
        call(&app, Method::GET, &format!("/broadcasts/{id}"), Some("tok-a"), None).await;
    assert_eq!(detail["counts"]["pending"], 1);
}

#[tokio::test]
async fn delete_removes_broadcast() {
    let h = seeded().await;
    let app = app(&h);
    let id = create(&app, "tok-a", "Bye").await;

    let (status, body) =
        call(&app, Method::DELETE, &format!("/broadcasts/{id}"), Some("tok-a"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "deleted");

    let (status, _) =
        call(&app, Method::GET, &format!("/broadcasts/{id}"), Some("tok-a"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_without_running_dispatch_reports_false() {
    let h = seeded().await;
    let app = app(&h);
    let id = create(&app, "tok-a", "Hi").await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/broadcasts/{id}/cancel"),
        Some("tok-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], false);
}

#[tokio::test]
async fn statistics_validate_range() {
    let h = seeded().await;
    let app = app(&h);
    let id = create(&app, "tok-a", "Hi {name}").await;
    call(
        &app,
        Method::POST,
        &format!("/broadcasts/{id}/send"),
        Some("tok-a"),
        None,
    )
    .await;

    let (status, stats) =
        call(&app, Method::GET, "/broadcasts/statistics", Some("tok-a"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_broadcasts"], 1);
    assert_eq!(stats["sent"], 2);
    assert_eq!(stats["success_rate"], 100);

    let (status, _) = call(
        &app,
        Method::GET,
        "/broadcasts/statistics?start=2026-05-02&end=2026-05-01",
        Some("tok-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::GET,
        "/broadcasts/statistics?start=yesterday",
        Some("tok-a"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn connect_status_and_disconnect() {
    let h = seeded().await;
    let app = app(&h);

    let (_, status) = call(&app, Method::GET, "/connection/status", Some("tok-a"), None).await;
    assert_eq!(status["connected"], false);
    assert_eq!(status["state"], "absent");

    let (code, body) = call(&app, Method::POST, "/connection/connect", Some("tok-a"), None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["status"], "connected");

    let (_, body) = call(&app, Method::POST, "/connection/connect", Some("tok-a"), None).await;
    assert_eq!(body["status"], "already_connected");

    let (_, status) = call(&app, Method::GET, "/connection/status", Some("tok-a"), None).await;
    assert_eq!(status["connected"], true);

    // Tenant b is unaffected.
    let (_, status) = call(&app, Method::GET, "/connection/status", Some("tok-b"), None).await;
    assert_eq!(status["connected"], false);

    let (code, body) = call(&app, Method::DELETE, "/connection", Some("tok-a"), None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["status"], "disconnected");

    let (_, status) = call(&app, Method::GET, "/connection/status", Some("tok-a"), None).await;
    assert_eq!(status["connected"], false);
}

#[tokio::test]
async fn connect_returns_pairing_challenge() {
    let h = seeded().await;
    h.connector
        .script(&TenantId::from("shop-a"), PairingScript::Challenge("2@scan-me".into()))
        .await;

    let (code, body) = call(&app(&h), Method::POST, "/connection/connect", Some("tok-a"), None).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(body["status"], "pairing");
    assert_eq!(body["challenge"], "2@scan-me");
}

#[tokio::test]
async fn silent_connect_times_out_with_408() {
    let h = TestHarness::builder()
        .with_sessions(SessionsConfig {
            pairing_window_secs: 1,
            ..SessionsConfig::default()
        })
        .with_default_script(PairingScript::Silent)
        .build()
        .await
        .unwrap();

    let (code, body) = call(&app(&h), Method::POST, "/connection/connect", Some("tok-a"), None).await;
    assert_eq!(code, StatusCode::REQUEST_TIMEOUT);
    assert!(body["error"].is_string());
}

const BOUNDARY: &str = "herald-test-boundary";

fn media_app(h: &TestHarness, dir: &std::path::Path) -> Router {
    let tokens = TenantTokens::new([("tok-a", "shop-a")]);
    let media = MediaStore::new(dir, "https://herald.example.com", 1024);
    router(GatewayState::new(h.engine.clone(), h.pool.clone(), tokens).with_media(media))
}

fn upload_request(token: Option<&str>, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/uploads")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body)).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn uploaded_media_is_served_back_and_usable_in_a_broadcast() {
    let h = seeded().await;
    let dir = tempfile::tempdir().unwrap();
    let app = media_app(&h, dir.path());

    let (status, body) = send(&app, upload_request(Some("tok-a"), "Flyer.PNG", b"png bytes")).await;
    assert_eq!(status, StatusCode::CREATED);
    let uploaded: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(uploaded["kind"], "image");
    let media = uploaded["media"].as_str().unwrap().to_string();
    let path = media
        .strip_prefix("https://herald.example.com")
        .expect("media is addressed under the public url");
    assert!(path.starts_with("/media/shop-a/"), "{path}");

    let fetch = Request::builder().uri(path).body(Body::empty()).unwrap();
    let (status, served) = send(&app, fetch).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(served, b"png bytes");

    let (status, created) = call(
        &app,
        Method::POST,
        "/broadcasts",
        Some("tok-a"),
        Some(json!({
            "template": { "body": "Promo {name}", "media": media },
            "recipients": "all"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
}

#[tokio::test]
async fn uploads_need_a_token_and_a_supported_file() {
    let h = seeded().await;
    let dir = tempfile::tempdir().unwrap();
    let app = media_app(&h, dir.path());

    let (status, _) = send(&app, upload_request(None, "flyer.png", b"png")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, upload_request(Some("tok-a"), "setup.exe", b"MZ")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, upload_request(Some("tok-a"), "big.png", &[0u8; 4096])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn uploads_are_refused_when_media_is_not_configured() {
    let h = seeded().await;
    let (status, _) = send(&app(&h), upload_request(Some("tok-a"), "flyer.png", b"png")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn local_media_path_in_a_template_is_a_bad_request() {
    let h = seeded().await;
    let (status, body) = call(
        &app(&h),
        Method::POST,
        "/broadcasts",
        Some("tok-a"),
        Some(json!({
            "template": { "body": "Hi", "media": "uploads/flyer.png" },
            "recipients": "all"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("http(s) URL"));
}
