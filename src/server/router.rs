use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Json, Router,
    routing::{get, post},
};

use super::admin::admin_router;
use super::dto::LevelsResponse;
use super::response::ApiResponse;
use super::user::user_router;
use super::webhooks::billing_webhook;
use crate::coach::CoachClient;
use crate::progression::LevelTable;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Loaded once at startup and never mutated.
    pub levels: Arc<LevelTable>,
    pub coach: CoachClient,
    /// Webhook signing secret. Billing webhooks are refused without one.
    pub billing_secret: Option<String>,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        levels: Arc<LevelTable>,
        coach: CoachClient,
        billing_secret: Option<String>,
    ) -> Self {
        Self {
            store,
            levels,
            coach,
            billing_secret,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn list_levels(State(state): State<Arc<AppState>>) -> Json<ApiResponse<LevelsResponse>> {
    Json(ApiResponse::success(LevelsResponse {
        version: state.levels.version(),
        tiers: state.levels.tiers().to_vec(),
    }))
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/levels", get(list_levels))
        .route("/webhooks/billing", post(billing_webhook))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", user_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
