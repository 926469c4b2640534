use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use steadfast::auth::TokenGenerator;
use steadfast::coach::CoachClient;
use steadfast::progression::LevelTable;
use steadfast::server::{AppState, create_router};
use steadfast::store::{SqliteStore, Store};
use steadfast::types::User;

/// An in-process server backed by a throwaway SQLite file.
pub struct TestServer {
    pub temp_dir: TempDir,
    pub state: Arc<AppState>,
    pub admin_token: String,
    router: Router,
}

impl TestServer {
    pub fn start() -> Self {
        Self::with_billing_secret(None)
    }

    pub fn with_billing_secret(secret: Option<&str>) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = SqliteStore::new(temp_dir.path().join("steadfast.db")).expect("open store");
        store.initialize().expect("initialize store");

        let generator = TokenGenerator::new();
        let (token, admin_token) = generator.issue(None, true, None).expect("issue admin token");
        store.create_token(&token).expect("store admin token");

        let state = Arc::new(AppState::new(
            Arc::new(store),
            Arc::new(LevelTable::builtin().clone()),
            CoachClient::disabled(),
            secret.map(str::to_string),
        ));
        let router = create_router(state.clone());

        Self {
            temp_dir,
            state,
            admin_token,
            router,
        }
    }

    /// Creates a user directly in the store and returns (user_id, raw token).
    pub fn create_user(&self, name: &str) -> (String, String) {
        let user = User::new(Uuid::new_v4().to_string(), name.to_string(), Utc::now());
        self.state.store.create_user(&user).expect("create user");

        let (token, raw) = TokenGenerator::new()
            .issue(Some(user.id.clone()), false, None)
            .expect("issue token");
        self.state.store.create_token(&token).expect("store token");

        (user.id, raw)
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        self.send(request).await
    }

    pub async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request("GET", path, Some(token), None).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", path, Some(token), Some(body)).await
    }
}
