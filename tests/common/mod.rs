#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use dropcode::{build_router, utils::config::AppConfig, AppState};

pub const BASE_URL: &str = "http://localhost:3000";
pub const BOUNDARY: &str = "----dropcodeTestBoundary7MA4YWxkTrZu0gW";

/// Router plus the state behind it. The temp directory lives as long as the app.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn test_config(temp_dir: &TempDir) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0, // Use random port for testing
        metadata_dir: temp_dir.path().join("metadata"),
        blob_dir: temp_dir.path().join("blobs"),
        public_base_url: BASE_URL.to_string(),
        max_file_size: 1024 * 1024, // 1MB
        ..AppConfig::default()
    }
}

/// Setup a test application with temporary storage
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

pub async fn setup_test_app_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir);
    customize(&mut config);

    let state = AppState::from_config(config).expect("Failed to create app state");
    TestApp {
        router: build_router(state.clone()),
        state,
        _temp_dir: temp_dir,
    }
}

/// Create a multipart form body with an optional file part and an optional code part
pub fn create_multipart_body(file: Option<(&str, &str, &[u8])>, code: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();

    if let Some((filename, content_type, data)) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }

    if let Some(code) = code {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"code\"\r\n\r\n");
        body.extend_from_slice(code.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(file: Option<(&str, &str, &[u8])>, code: Option<&str>) -> Request<Body> {
    Request::builder()
        .uri("/api/upload")
        .method("POST")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(create_multipart_body(file, code)))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("GET")
        .body(Body::empty())
        .unwrap()
}

/// Upload `data` as `filename` under `code`, asserting success
pub async fn upload(app: &TestApp, filename: &str, data: &[u8], code: &str) -> Value {
    let response = app
        .send(upload_request(Some((filename, "text/plain", data)), Some(code)))
        .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    body_json(response).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Follow a download redirect to the locally served blob
pub async fn follow_redirect(app: &TestApp, response: &Response<Body>) -> Response<Body> {
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("redirect without location");
    let path = location
        .strip_prefix(BASE_URL)
        .expect("locator outside the local blob store");
    app.send(get_request(path)).await
}
