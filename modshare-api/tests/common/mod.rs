//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - A fresh SQLite database and upload directory per test
//! - Request builders for JSON and multipart bodies
//! - Session cookie helpers
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use modshare_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, DatabaseConfig, SessionConfig, UploadsConfig},
};
use modshare_shared::db::{
    migrations::run_migrations,
    pool::{self, create_pool},
};
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tempfile::TempDir;
use tower::Service as _;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const COOKIE_NAME: &str = "modshare_session";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: SqlitePool,
    pub app: Router,
    pub config: Config,
    pub uploads_dir: PathBuf,
    _dir: TempDir,
}

impl TestContext {
    /// Creates a new test context with a fresh database and upload directory
    pub async fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let uploads_dir = dir.path().join("uploads");

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: format!("sqlite://{}", dir.path().join("modshare.db").display()),
                max_connections: 5,
            },
            session: SessionConfig {
                secret: TEST_SECRET.to_string(),
                ttl_hours: 24,
                cookie_name: COOKIE_NAME.to_string(),
                secure_cookie: false,
            },
            uploads: UploadsConfig {
                dir: uploads_dir.display().to_string(),
                max_body_bytes: 1024 * 1024,
            },
        };

        let db = create_pool(pool::DatabaseConfig {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            min_connections: 0,
            ..Default::default()
        })
        .await?;
        run_migrations(&db).await?;

        let state = AppState::new(db.clone(), config.clone());
        state.uploads.ensure_root().await?;
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            config,
            uploads_dir,
            _dir: dir,
        })
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().call(request).await.unwrap()
    }

    /// `POST /api/register`
    pub async fn register(&self, username: &str, password: &str) -> Response<Body> {
        self.send(json_request(
            "POST",
            "/api/register",
            serde_json::json!({ "username": username, "password": password }),
            None,
        ))
        .await
    }

    /// `POST /api/login`
    pub async fn login(&self, username: &str, password: &str) -> Response<Body> {
        self.send(json_request(
            "POST",
            "/api/login",
            serde_json::json!({ "username": username, "password": password }),
            None,
        ))
        .await
    }

    /// Registers and logs in, returning the `Cookie` header value
    pub async fn signed_in(&self, username: &str, password: &str) -> String {
        let response = self.register(username, password).await;
        assert_eq!(response.status(), StatusCode::OK, "register {}", username);

        let response = self.login(username, password).await;
        assert_eq!(response.status(), StatusCode::OK, "login {}", username);

        session_cookie(&response).expect("login sets a session cookie")
    }

    /// `GET /api/session`, returning the `user` field
    pub async fn whoami(&self, cookie: Option<&str>) -> Value {
        let response = self.send(get_request("/api/session", cookie)).await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["user"].clone()
    }

    /// Uploads a module with a single archive, returning its ID
    pub async fn upload_module(&self, cookie: &str, title: &str, archive: &str) -> i64 {
        let request = MultipartBuilder::new()
            .text("title", title)
            .text("description", "short")
            .file("file", archive, "application/zip", b"PK\x03\x04 module bytes")
            .build("/api/modules", Some(cookie));

        let response = self.send(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["id"].as_i64().expect("module id")
    }

    /// Names of the files currently in the upload directory
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.uploads_dir)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

/// Builds a JSON request, optionally carrying a session cookie
pub fn json_request(method: &str, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Builds a GET request, optionally carrying a session cookie
pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Reads a response body as bytes
pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Reads a response body as JSON
pub async fn body_json(response: Response<Body>) -> Value {
    let body = body_bytes(response).await;
    serde_json::from_slice(&body).unwrap_or_else(|e| {
        panic!(
            "response is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&body)
        )
    })
}

/// `name=value` pair from the response's `Set-Cookie`, usable as a `Cookie` header
pub fn session_cookie<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .next()
        .map(|pair| pair.trim().to_string())
}

/// Minimal `multipart/form-data` body builder
pub struct MultipartBuilder {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self {
            boundary: "----modshare-test-boundary".to_string(),
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

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn build(mut self, uri: &str, cookie: Option<&str>) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .header(header::CONTENT_LENGTH, self.body.len());
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(self.body)).unwrap()
    }
}
