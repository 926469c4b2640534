use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::{CreateCommentRequest, CreatePostRequest, PaginationParams};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, StoreResultExt,
    paginate,
};
use crate::server::validation::{validate_comment_body, validate_post_body};
use crate::store::Store;
use crate::types::{Comment, Post};

fn require_post(store: &dyn Store, id: &str) -> Result<Post, ApiError> {
    store
        .get_post(id)
        .api_err("Failed to get post")?
        .or_not_found("Post not found")
}

pub async fn list_posts(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let posts = state
        .store
        .list_post_views(&auth.user.id, cursor, DEFAULT_PAGE_SIZE + 1)
        .api_err("Failed to list posts")?;

    let (posts, next_cursor, has_more) =
        paginate(posts, DEFAULT_PAGE_SIZE as usize, |p| p.post.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(posts, next_cursor, has_more)))
}

pub async fn create_post(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePostRequest>,
) -> impl IntoResponse {
    let body = validate_post_body(&req.body)?;
    let now = Utc::now();

    // v7 ids sort by creation time, which the feed cursor relies on.
    let post = Post {
        id: Uuid::now_v7().to_string(),
        user_id: auth.user.id.clone(),
        body,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .create_post(&post)
        .api_err("Failed to create post")?;

    let view = state
        .store
        .get_post_view(&post.id, &auth.user.id)
        .api_err("Failed to load post")?
        .or_not_found("Post not found")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(view))))
}

pub async fn get_post(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let view = state
        .store
        .get_post_view(&id, &auth.user.id)
        .api_err("Failed to get post")?
        .or_not_found("Post not found")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(view)))
}

pub async fn delete_post(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let post = require_post(state.store.as_ref(), &id)?;

    if post.user_id != auth.user.id {
        return Err(ApiError::forbidden("Only the author can delete a post"));
    }

    state
        .store
        .delete_post(&post.id)
        .api_err("Failed to delete post")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn like_post(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = require_post(store, &id)?;

    store
        .like_post(&post.id, &auth.user.id)
        .api_err("Failed to like post")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn unlike_post(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = require_post(store, &id)?;

    store
        .unlike_post(&post.id, &auth.user.id)
        .api_err("Failed to unlike post")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_comments(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = require_post(store, &id)?;

    let comments = store
        .list_comments(&post.id)
        .api_err("Failed to list comments")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(comments)))
}

pub async fn create_comment(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();
    let post = require_post(store, &id)?;
    let body = validate_comment_body(&req.body)?;

    let comment = Comment {
        id: Uuid::now_v7().to_string(),
        post_id: post.id,
        user_id: auth.user.id,
        body,
        created_at: Utc::now(),
    };

    store
        .create_comment(&comment)
        .api_err("Failed to create comment")?;

    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(comment))))
}
