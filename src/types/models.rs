use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub xp: i64,
    pub level: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_streak_id: Option<String>,
    pub total_relapses: i32,
    pub is_premium: bool,
    pub goals: Vec<String>,
    pub triggers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A fresh account: no XP, level 1, no streak.
    #[must_use]
    pub fn new(id: String, display_name: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            display_name,
            xp: 0,
            level: 1,
            current_streak_id: None,
            total_relapses: 0,
            is_premium: false,
            goals: Vec::new(),
            triggers: Vec::new(),
            onboarding_completed_at: None,
            last_active_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub is_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub id: String,
    pub user_id: String,
    pub start_date: NaiveDate,
    pub duration_days: i32,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckIn {
    pub user_id: String,
    pub day: NaiveDate,
    pub xp_gained: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post as seen by a particular viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author_name: String,
    pub author_level: i32,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoachRole {
    User,
    Coach,
}

impl CoachRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CoachRole::User => "user",
            CoachRole::Coach => "coach",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(CoachRole::User),
            "coach" => Some(CoachRole::Coach),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoachMessage {
    pub id: String,
    pub user_id: String,
    pub role: CoachRole,
    pub content: String,
    pub is_fallback: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub provider_subscription_id: String,
    pub user_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime<Utc>>,
    pub event_created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Statuses that grant premium access.
    pub const PREMIUM_STATUSES: [&'static str; 2] = ["active", "trialing"];

    #[must_use]
    pub fn grants_premium(&self) -> bool {
        Self::PREMIUM_STATUSES.contains(&self.status.as_str())
    }

    /// Whether this event may overwrite `prev`.
    ///
    /// Provider timestamps have one-second resolution, so events from the
    /// same second are applied in arrival order, except that a cancellation
    /// is never undone by another status from that second.
    #[must_use]
    pub fn supersedes(&self, prev: &Subscription) -> bool {
        if self.event_created_at != prev.event_created_at {
            return self.event_created_at > prev.event_created_at;
        }
        prev.status != "canceled" || self.status == "canceled"
    }
}
