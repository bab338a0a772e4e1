mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn test_health_check_reports_store() {
    let app = TestApp::spawn();

    let response = app.request("GET", "/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["service"], "transfer-service-test");
    assert_eq!(response.body["checks"]["store"], "up");
}

#[tokio::test]
async fn test_every_response_carries_request_id_and_security_headers() {
    let app = TestApp::spawn();

    let response = app.request("GET", "/items", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.headers.contains_key("x-request-id"));
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_metrics_count_transfers() {
    let app = TestApp::spawn();
    let user1 = app.signed_up("metrics-user1").await;
    app.signed_up("metrics-user2").await;
    let item = app.create_item(&user1, "gauge").await;
    app.send_item(&user1, item, "metrics-user2").await;

    let response = app.request("GET", "/metrics", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    let text = response.body.as_str().unwrap();
    assert!(text.contains("transfers_total"));
    assert!(text.contains("http_requests_total"));
    assert!(text.contains("path=\"/items\""));
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = TestApp::spawn();

    let response = app
        .request("GET", "/.well-known/openapi.json", None, None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let paths = &response.body["paths"];
    for path in ["/registration", "/login", "/items", "/items/{id}", "/send", "/confirm"] {
        assert!(paths.get(path).is_some(), "missing {}", path);
    }
}
