#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use audiotracks_api::auth::jwt::JwtConfig;
use audiotracks_api::config::{MediaConfig, ServerConfig};
use audiotracks_api::router::build_app_router;
use audiotracks_api::state::AppState;
use audiotracks_core::tags::MetadataCodec;

pub const TEST_PASSWORD: &str = "correct-horse-battery";
pub const MEDIA_URL: &str = "/media";
pub const TRACKS_PER_PAGE: i64 = 3;

const BOUNDARY: &str = "audiotracks-test-boundary";

/// Build a test `ServerConfig` whose media root is `media_root`.
pub fn test_config(media_root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        media: MediaConfig {
            root: media_root.to_path_buf(),
            url: MEDIA_URL.to_string(),
            public_base_url: None,
        },
        tracks_per_page: TRACKS_PER_PAGE,
        max_upload_bytes: 10 * 1024 * 1024,
        allow_registration: true,
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
            access_token_expiry_mins: 60,
        },
    }
}

/// A router over `pool` with the production middleware stack. The returned
/// `TempDir` is the media root and must outlive the test.
pub fn build_test_app(pool: SqlitePool) -> (Router, TempDir) {
    build_test_app_with(pool, |_| {})
}

/// Like [`build_test_app`], with a hook to adjust the config first.
pub fn build_test_app_with(
    pool: SqlitePool,
    adjust: impl FnOnce(&mut ServerConfig),
) -> (Router, TempDir) {
    let media = TempDir::new().expect("temp media root");
    let mut config = test_config(media.path());
    adjust(&mut config);
    let state = AppState::new(pool, config.clone());
    (build_app_router(state, &config), media)
}

/// Like [`build_test_app`], with `codec` in place of the default tag codec.
pub fn build_test_app_with_codec(
    pool: SqlitePool,
    codec: Arc<dyn MetadataCodec>,
) -> (Router, TempDir) {
    let media = TempDir::new().expect("temp media root");
    let config = test_config(media.path());
    let mut state = AppState::new(pool, config.clone());
    state.codec = codec;
    (build_app_router(state, &config), media)
}

/// Names of the entries in `dir`, sorted.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("directory is readable")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../core/tests/fixtures")).join(name)
}

pub fn fixture(name: &str) -> Vec<u8> {
    std::fs::read(fixture_path(name)).expect("fixture exists")
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("router is infallible")
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json_auth(
    app: &Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_multipart(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    form: Multipart,
) -> Response<Body> {
    let mut request = Request::post(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
    );
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    send(app, request.body(Body::from(form.finish())).unwrap()).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body is readable")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("body is JSON")
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).expect("body is UTF-8")
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

/// Minimal `multipart/form-data` body builder.
#[derive(Default)]
pub struct Multipart {
    body: Vec<u8>,
}

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Attach a fixture file under its own name.
    pub fn fixture(self, name: &str, fixture_name: &str) -> Self {
        self.file(name, fixture_name, &fixture(fixture_name))
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

// ---------------------------------------------------------------------------
// Accounts and tracks
// ---------------------------------------------------------------------------

/// Register `username` through the API and return an access token.
pub async fn signup(app: &Router, username: &str) -> String {
    let response = post_json(
        app,
        "/api/v1/auth/register",
        serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": TEST_PASSWORD,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED, "register {username}");
    login(app, username).await
}

pub async fn login(app: &Router, username: &str) -> String {
    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "username": username, "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK, "login {username}");
    body_json(response).await["access_token"]
        .as_str()
        .expect("access_token")
        .to_string()
}

/// Upload a fixture as `audio_file` and return the created track JSON.
pub async fn upload_fixture(app: &Router, token: &str, fixture_name: &str) -> serde_json::Value {
    let form = Multipart::new().fixture("audio_file", fixture_name);
    let response = post_multipart(app, "/api/v1/music/upload", Some(token), form).await;
    assert_eq!(
        response.status(),
        StatusCode::CREATED,
        "upload of {fixture_name}"
    );
    body_json(response).await["data"].clone()
}

/// Absolute path of a stored file given its media-root-relative path.
pub fn stored(media: &TempDir, relative: &serde_json::Value) -> PathBuf {
    media.path().join(relative.as_str().expect("path is a string"))
}
