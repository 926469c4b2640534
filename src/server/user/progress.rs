use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;

use crate::auth::RequireUser;
use crate::error::Error;
use crate::progression::utc_day;
use crate::server::AppState;
use crate::server::dto::{CheckInResponse, ProgressResponse, ResetResponse};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

pub async fn get_progress(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user = auth.user;
    let store = state.store.as_ref();

    let active_streak = store
        .get_active_streak(&user.id)
        .api_err("Failed to load streak")?;
    let checked_in_today = store
        .get_check_in(&user.id, utc_day(Utc::now()))
        .api_err("Failed to load check-in")?
        .is_some();

    Ok::<_, ApiError>(Json(ApiResponse::success(ProgressResponse {
        progress: state.levels.progress(user.xp, user.level),
        active_streak,
        checked_in_today,
        total_relapses: user.total_relapses,
        level_table_version: state.levels.version(),
    })))
}

pub async fn check_in(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user_id = auth.user.id;

    let outcome = match state
        .store
        .perform_check_in(&state.levels, &user_id, Utc::now())
    {
        Ok(outcome) => outcome,
        Err(Error::DuplicateCheckIn) => {
            tracing::debug!(user_id = %user_id, "Duplicate check-in rejected");
            return Err(ApiError::conflict(
                "Already checked in today; come back after midnight UTC",
            ));
        }
        Err(e) => return Err(ApiError::from(e)),
    };

    let plan = &outcome.plan;
    tracing::info!(
        user_id = %user_id,
        day = %outcome.day,
        streak_days = plan.streak_days,
        xp_gained = plan.xp_gained,
        level = plan.level,
        leveled_up = plan.leveled_up(),
        "Check-in recorded"
    );

    let response = CheckInResponse {
        day: outcome.day,
        streak_days: plan.streak_days,
        xp_gained: plan.xp_gained,
        total_xp: plan.total_xp,
        level: plan.level,
        previous_level: plan.previous_level,
        leveled_up: plan.leveled_up(),
        tier: state.levels.resolve_tier(plan.level).clone(),
        progress_percent: state.levels.progress_fraction(plan.total_xp, plan.level),
    };

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

pub async fn reset_streak(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user_id = auth.user.id;

    let outcome = state
        .store
        .reset_streak(&user_id, Utc::now())
        .map_err(ApiError::from)?;

    if let Some(streak) = &outcome.streak {
        tracing::info!(
            user_id = %user_id,
            streak_id = %streak.id,
            duration_days = streak.duration_days,
            total_relapses = outcome.total_relapses,
            "Streak reset"
        );
    }

    Ok::<_, ApiError>(Json(ApiResponse::success(ResetResponse {
        reset: outcome.reset(),
        total_relapses: outcome.total_relapses,
        ended_streak: outcome.streak,
    })))
}

pub async fn list_streaks(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let streaks = state
        .store
        .list_streaks(&auth.user.id)
        .api_err("Failed to list streaks")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(streaks)))
}
