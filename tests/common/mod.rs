#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use url::Url;

use podcast_console::app::create_app;
use podcast_console::config::settings::{AppConfig, HostBackend};
use podcast_console::infrastructure::db::pool::connect_to_db;
use podcast_console::infrastructure::podcast_host::InMemoryHost;
use podcast_console::infrastructure::storage::local::UploadStorage;
use podcast_console::state::AppState;

pub const PUBLIC_BASE: &str = "http://console.test/";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub host: Arc<InMemoryHost>,
    pub uploads: TempDir,
}

fn test_config(upload_folder: &std::path::Path) -> AppConfig {
    AppConfig {
        server_port: 0,
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        jwt_secret: "integration-test-secret".to_string(),
        session_ttl_secs: 3600,
        upload_folder: upload_folder.to_path_buf(),
        public_base_url: Some(Url::parse(PUBLIC_BASE).unwrap()),
        podcast_host: HostBackend::Memory,
        buzzsprout_api_url: Url::parse("http://buzzsprout.invalid/api/").unwrap(),
        manager_cache_ttl_secs: 300,
        max_upload_bytes: 8 * 1024 * 1024,
    }
}

impl TestApp {
    pub async fn spawn(host: InMemoryHost) -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let config = test_config(uploads.path());

        let db = connect_to_db(&config.database_url, config.db_max_connections)
            .await
            .unwrap();
        let storage = UploadStorage::new(uploads.path()).await.unwrap();
        let host = Arc::new(host);

        let state = AppState::new(config, db, host.clone(), storage);
        let router = create_app(state.clone());

        Self {
            router,
            state,
            host,
            uploads,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn send_raw(&self, request: Request<Body>) -> axum::response::Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Register and log in; returns the bearer token.
    pub async fn sign_up(&self, username: &str) -> String {
        let (status, _) = self
            .send(form_request(
                "/auth/register",
                None,
                &[("username", username), ("password", "secret-pass")],
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .send(form_request(
                "/auth/login",
                None,
                &[("username", username), ("password", "secret-pass")],
            ))
            .await;
        assert_eq!(status, StatusCode::OK);

        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    /// Register a podcast record and return its id.
    pub async fn add_podcast(&self, token: &str, name: &str, account_id: &str, account_token: &str) -> i64 {
        let (status, body) = self
            .send(form_request(
                "/create",
                Some(token),
                &[
                    ("podcast_name", name),
                    ("podcast_id", account_id),
                    ("token", account_token),
                ],
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);

        body["data"]["id"].as_i64().unwrap()
    }
}

pub fn get_request(path: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn form_request(path: &str, token: Option<&str>, fields: &[(&str, &str)]) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();

    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

/// Hand-assembled multipart/form-data body.
pub struct MultipartBuilder {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self {
            boundary: "----podcast-console-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                self.boundary, name, file_name
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, path: &str, token: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());

        Request::builder()
            .method("POST")
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(self.body))
            .unwrap()
    }
}

/// Everything in the upload folder, staging leftovers included.
pub fn stored_files(app: &TestApp) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(app.uploads.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
