use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{OnboardingRequest, ProfileResponse, UpdateProfileRequest};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::{validate_display_name, validate_string_list};
use crate::types::User;

fn profile_response(state: &AppState, user: User) -> Result<ProfileResponse, ApiError> {
    let active_streak = state
        .store
        .get_active_streak(&user.id)
        .api_err("Failed to load streak")?;
    let progress = state.levels.progress(user.xp, user.level);

    Ok(ProfileResponse {
        user,
        progress,
        active_streak,
    })
}

pub async fn get_me(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let profile = profile_response(&state, auth.user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(profile)))
}

pub async fn update_me(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    let mut user = auth.user;

    if let Some(name) = req.display_name {
        user.display_name = validate_display_name(&name).map_err(ApiError::bad_request)?;
    }
    if let Some(goals) = req.goals {
        user.goals = validate_string_list(&goals, "Goals")?;
    }
    if let Some(triggers) = req.triggers {
        user.triggers = validate_string_list(&triggers, "Triggers")?;
    }
    user.updated_at = Utc::now();

    state
        .store
        .update_profile(&user)
        .api_err("Failed to update profile")?;

    let profile = profile_response(&state, user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(profile)))
}

pub async fn complete_onboarding(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<OnboardingRequest>,
) -> impl IntoResponse {
    let mut user = auth.user;

    let display_name = validate_display_name(&req.display_name).map_err(ApiError::bad_request)?;
    let goals = validate_string_list(&req.goals, "Goals")?;
    if goals.is_empty() {
        return Err(ApiError::bad_request("At least one goal is required"));
    }
    let triggers = validate_string_list(&req.triggers, "Triggers")?;

    let now = Utc::now();
    user.display_name = display_name;
    user.goals = goals;
    user.triggers = triggers;
    if user.onboarding_completed_at.is_none() {
        user.onboarding_completed_at = Some(now);
    }
    user.updated_at = now;

    state
        .store
        .update_profile(&user)
        .api_err("Failed to save onboarding")?;

    tracing::info!(user_id = %user.id, "Onboarding completed");

    let profile = profile_response(&state, user)?;
    Ok::<_, ApiError>(Json(ApiResponse::success(profile)))
}
