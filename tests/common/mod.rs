// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use garden_drops::config::Config;
use garden_drops::db::{FirestoreDb, MemoryDb, UserStore};
use garden_drops::middleware::auth::create_jwt;
use garden_drops::models::{Role, User};
use garden_drops::routes::create_router;
use garden_drops::services::{BlobError, BlobStore, StoredBlob};
use garden_drops::AppState;
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Blob store that keeps uploads in memory.
#[derive(Default)]
#[allow(dead_code)]
pub struct MemoryBlobStore {
    pub puts: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, original_name: &str, bytes: &[u8]) -> Result<StoredBlob, BlobError> {
        if bytes.is_empty() {
            return Err(BlobError::Empty);
        }
        let mut puts = self.puts.lock().unwrap();
        let key = format!("{}-{}", puts.len(), original_name);
        puts.push((original_name.to_string(), bytes.to_vec()));
        Ok(StoredBlob {
            url: format!("/uploads/{}", key),
            key,
        })
    }
}

/// Blob store whose writes always fail.
#[allow(dead_code)]
pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn put(&self, _original_name: &str, _bytes: &[u8]) -> Result<StoredBlob, BlobError> {
        Err(BlobError::Backend("bucket unavailable".to_string()))
    }
}

/// Router plus handles on its backing stores.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: Arc<MemoryDb>,
    pub signing_key: Vec<u8>,
}

impl TestApp {
    /// Session token for a user id with the given role.
    #[allow(dead_code)]
    pub fn token(&self, user_id: &str, role: Role) -> String {
        create_test_jwt(user_id, role, &self.signing_key)
    }

    /// Send a request through a fresh clone of the router.
    #[allow(dead_code)]
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router.clone().oneshot(request).await.unwrap()
    }
}

/// Create a test app backed by the in-memory store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_blobs(Arc::new(MemoryBlobStore::default()))
}

#[allow(dead_code)]
pub fn create_test_app_with_blobs(blobs: Arc<dyn BlobStore>) -> TestApp {
    let config = Config::test_default();
    let signing_key = config.jwt_signing_key.clone();
    let db = Arc::new(MemoryDb::new());

    let state = Arc::new(AppState::new(config, db.clone(), blobs));

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        signing_key,
    }
}

/// Insert a user into the directory.
#[allow(dead_code)]
pub async fn seed_user(db: &dyn UserStore, id: &str, name: &str, role: Role) -> User {
    let user = User {
        id: id.to_string(),
        name: name.to_string(),
        role,
        avatar: None,
    };
    db.upsert_user(&user).await.unwrap();
    user
}

/// Create a test JWT token.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, role: Role, signing_key: &[u8]) -> String {
    create_jwt(user_id, role, signing_key).unwrap()
}

/// Authenticated JSON request.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Authenticated request without a body.
#[allow(dead_code)]
pub fn get_request(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Build a multipart/form-data body from text fields and an optional file.
#[allow(dead_code)]
pub fn multipart_request(
    uri: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    const BOUNDARY: &str = "garden-test-boundary";
    let mut body: Vec<u8> = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
