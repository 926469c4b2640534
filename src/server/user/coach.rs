use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::coach::{HISTORY_WINDOW, build_messages, context_summary};
use crate::server::AppState;
use crate::server::dto::{CoachExchangeResponse, CoachMessageRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_coach_message;
use crate::types::{CoachMessage, CoachRole};

const HISTORY_PAGE_SIZE: i32 = 50;

pub async fn list_messages(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let messages = state
        .store
        .list_coach_messages(&auth.user.id, HISTORY_PAGE_SIZE)
        .api_err("Failed to list coach messages")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(messages)))
}

pub async fn send_message(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CoachMessageRequest>,
) -> impl IntoResponse {
    let user = auth.user;
    let content = validate_coach_message(&req.message)?;
    let store = state.store.as_ref();

    let streak_days = store
        .get_active_streak(&user.id)
        .api_err("Failed to load streak")?
        .map_or(0, |s| s.duration_days);
    let history = store
        .list_coach_messages(&user.id, HISTORY_WINDOW)
        .api_err("Failed to load coach history")?;

    let summary = context_summary(&user, state.levels.resolve_tier(user.level), streak_days);
    let reply = state
        .coach
        .reply(build_messages(&summary, &history, &content))
        .await;

    if reply.is_fallback {
        tracing::info!(user_id = %user.id, "Coach replied with fallback");
    }

    let message = CoachMessage {
        id: Uuid::now_v7().to_string(),
        user_id: user.id.clone(),
        role: CoachRole::User,
        content,
        is_fallback: false,
        created_at: Utc::now(),
    };
    store
        .create_coach_message(&message)
        .api_err("Failed to save coach message")?;

    let reply = CoachMessage {
        id: Uuid::now_v7().to_string(),
        user_id: user.id,
        role: CoachRole::Coach,
        content: reply.content,
        is_fallback: reply.is_fallback,
        created_at: Utc::now(),
    };
    store
        .create_coach_message(&reply)
        .api_err("Failed to save coach reply")?;

    Ok::<_, ApiError>((
        StatusCode::CREATED,
        Json(ApiResponse::success(CoachExchangeResponse { message, reply })),
    ))
}
