use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::progression::{LevelTier, Progress};
use crate::types::{CoachMessage, Streak, Token, User};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserTokenRequest {
    #[serde(default)]
    pub expires_in_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AwardXpRequest {
    pub amount: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub goals: Option<Vec<String>>,
    #[serde(default)]
    pub triggers: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct OnboardingRequest {
    pub display_name: String,
    pub goals: Vec<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct CoachMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub id: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<Token> for TokenResponse {
    fn from(token: Token) -> Self {
        Self {
            id: token.id,
            is_admin: token.is_admin,
            user_id: token.user_id,
            created_at: token.created_at,
            expires_at: token.expires_at,
            last_used_at: token.last_used_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateTokenResponse {
    pub token: String,
    pub metadata: TokenResponse,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub progress: Progress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_streak: Option<Streak>,
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub progress: Progress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_streak: Option<Streak>,
    pub checked_in_today: bool,
    pub total_relapses: i32,
    pub level_table_version: u32,
}

#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    pub day: NaiveDate,
    pub streak_days: i32,
    pub xp_gained: i64,
    pub total_xp: i64,
    pub level: i32,
    pub previous_level: i32,
    pub leveled_up: bool,
    pub tier: LevelTier,
    pub progress_percent: f64,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub reset: bool,
    pub total_relapses: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_streak: Option<Streak>,
}

#[derive(Debug, Serialize)]
pub struct LevelsResponse {
    pub version: u32,
    pub tiers: Vec<LevelTier>,
}

#[derive(Debug, Serialize)]
pub struct CoachExchangeResponse {
    pub message: CoachMessage,
    pub reply: CoachMessage,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
}
