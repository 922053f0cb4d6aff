use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use serde_json::json;

mod common;
use common::*;

/// The landing page is served at the root
#[tokio::test]
async fn test_landing_page() {
    let app = setup_test_app().await;

    let response = app.send(get_request("/")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_bytes(response).await;
    let html = String::from_utf8_lossy(&body);
    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains("/api/upload"));
    assert!(html.contains("/api/download/"));
}

/// Locally stored blobs are publicly readable under /blobs with their type
#[tokio::test]
async fn test_blob_serving() {
    let app = setup_test_app().await;
    let uploaded = upload(&app, "page.html", b"<p>hi</p>", "WEB001").await;

    let locator = uploaded["url"].as_str().unwrap();
    assert!(locator.starts_with(&format!("{}/blobs/", BASE_URL)));
    assert!(locator.ends_with(".html"));

    let response = app.send(get_request(locator.strip_prefix(BASE_URL).unwrap())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
    assert_eq!(body_bytes(response).await, b"<p>hi</p>");

    assert_eq!(
        app.send(get_request("/blobs/does-not-exist.txt")).await.status(),
        StatusCode::NOT_FOUND
    );
}

/// Every API failure is a JSON object with a single error message
#[tokio::test]
async fn test_error_bodies_are_json() {
    let app = setup_test_app().await;

    let response = app.send(get_request("/api/download/NOPE42")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
    assert!(content_type.starts_with("application/json"));
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Invalid code or file has expired" })
    );

    let response = app.send(upload_request(None, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

/// The download response names the original file, including non-ASCII names
#[tokio::test]
async fn test_download_disposition_for_unicode_names() {
    let app = setup_test_app().await;

    let request = Request::builder()
        .uri("/api/upload-metadata")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "url": "https://store.public.blob.example/1700000000000-cv.pdf",
                "code": "CV0001",
                "originalName": "résumé.pdf",
                "mimetype": "application/pdf",
                "size": 8
            })
            .to_string(),
        ))
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::OK);

    let response = app.send(get_request("/api/download/CV0001")).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment; filename=\"r_sum_.pdf\""));
    assert!(disposition.contains("filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"));
}
