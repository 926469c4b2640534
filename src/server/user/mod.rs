mod coach;
mod community;
mod profile;
mod progress;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // Profile
        .route("/me", get(profile::get_me))
        .route("/me", patch(profile::update_me))
        .route("/onboarding", post(profile::complete_onboarding))
        // Progression
        .route("/progress", get(progress::get_progress))
        .route("/check-ins", post(progress::check_in))
        .route("/streak/reset", post(progress::reset_streak))
        .route("/streaks", get(progress::list_streaks))
        // Community
        .route("/posts", get(community::list_posts))
        .route("/posts", post(community::create_post))
        .route("/posts/{id}", get(community::get_post))
        .route("/posts/{id}", delete(community::delete_post))
        .route("/posts/{id}/like", put(community::like_post))
        .route("/posts/{id}/like", delete(community::unlike_post))
        .route("/posts/{id}/comments", get(community::list_comments))
        .route("/posts/{id}/comments", post(community::create_comment))
        // Coach
        .route("/coach/messages", get(coach::list_messages))
        .route("/coach/messages", post(coach::send_message))
}
