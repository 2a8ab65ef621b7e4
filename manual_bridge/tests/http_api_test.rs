//! HTTP API integration tests: exercise the router directly via
//! `tower::ServiceExt::oneshot` rather than binding a real socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::util::ServiceExt;

use manual_bridge::context::{AppContext, Layout};
use manual_bridge::presentation::http::build_router;
use manual_bridge_domain::config::{AppConfig, Environment};
use manual_bridge_domain::degradation::DegradationMode;

fn test_app() -> AppContext {
    let dir = tempfile::tempdir().unwrap();
    let layout = Layout::new(dir.keep());
    let config = AppConfig::defaults_for(Environment::Testing);
    AppContext::bootstrap(layout, config).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_healthy_with_no_traffic() {
    let router = build_router(test_app());
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["overall"], "healthy");
    assert_eq!(json["active_processes"], 0);
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    let router = build_router(test_app());
    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn status_for_unknown_process_is_not_found() {
    let router = build_router(test_app());
    let request = Request::builder()
        .uri(format!("/status/{}", manual_bridge_domain::ids::ProcessId::new()))
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn documents_list_starts_empty() {
    let router = build_router(test_app());
    let request = Request::builder().uri("/documents").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn upload_rejects_non_pdf_body() {
    let router = build_router(test_app());
    let body = "--X-BOUNDARY\r\n\
                Content-Disposition: form-data; name=\"file\"; filename=\"note.txt\"\r\n\
                Content-Type: text/plain\r\n\r\n\
                not a pdf\r\n\
                --X-BOUNDARY--\r\n";
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "multipart/form-data; boundary=X-BOUNDARY")
        .body(Body::from(body))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_is_refused_while_emergency_degraded() {
    let app = test_app();
    app.degradation_mode.store(Arc::new(DegradationMode::Emergency));
    let router = build_router(app);

    let body = "--X-BOUNDARY\r\n\
                Content-Disposition: form-data; name=\"file\"; filename=\"manual.pdf\"\r\n\
                Content-Type: application/pdf\r\n\r\n\
                %PDF-1.7 ...\r\n\
                --X-BOUNDARY--\r\n";
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "multipart/form-data; boundary=X-BOUNDARY")
        .body(Body::from(body))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert!(json["retry_after"].is_u64());
}

#[tokio::test]
async fn upload_accepts_a_well_formed_pdf() {
    let router = build_router(test_app());
    let body = "--X-BOUNDARY\r\n\
                Content-Disposition: form-data; name=\"file\"; filename=\"manual.pdf\"\r\n\
                Content-Type: application/pdf\r\n\r\n\
                %PDF-1.7\n1 0 obj << /Type /Page >> endobj\n\
                --X-BOUNDARY--\r\n";
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", "multipart/form-data; boundary=X-BOUNDARY")
        .body(Body::from(body))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let json = body_json(response).await;
    assert_eq!(json["filename"], "manual.pdf");
    assert!(json["process_id"].is_string());
    assert!(json["status_stream_url"].as_str().unwrap().starts_with("/status/"));
}
