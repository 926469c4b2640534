mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::progression::{CheckInOutcome, LevelTable, ResetOutcome, XpAward};
use crate::types::*;

/// Result of applying a billing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionApplied {
    /// False when the event was older than the stored state and skipped.
    pub applied: bool,
    pub is_premium: bool,
}

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn update_profile(&self, user: &User) -> Result<()>;
    fn delete_user(&self, id: &str) -> Result<bool>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>>;
    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>>;
    fn delete_token(&self, id: &str) -> Result<bool>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn has_admin_token(&self) -> Result<bool>;

    // Progression (each runs in one transaction)
    fn perform_check_in(
        &self,
        table: &LevelTable,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome>;
    fn reset_streak(&self, user_id: &str, now: DateTime<Utc>) -> Result<ResetOutcome>;
    fn award_xp(
        &self,
        table: &LevelTable,
        user_id: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<XpAward>;
    fn get_active_streak(&self, user_id: &str) -> Result<Option<Streak>>;
    fn list_streaks(&self, user_id: &str) -> Result<Vec<Streak>>;
    fn get_check_in(&self, user_id: &str, day: NaiveDate) -> Result<Option<CheckIn>>;

    // Community operations
    fn create_post(&self, post: &Post) -> Result<()>;
    fn get_post(&self, id: &str) -> Result<Option<Post>>;
    fn get_post_view(&self, id: &str, viewer_id: &str) -> Result<Option<PostView>>;
    fn list_post_views(&self, viewer_id: &str, cursor: &str, limit: i32) -> Result<Vec<PostView>>;
    fn delete_post(&self, id: &str) -> Result<bool>;
    fn like_post(&self, post_id: &str, user_id: &str) -> Result<bool>;
    fn unlike_post(&self, post_id: &str, user_id: &str) -> Result<bool>;
    fn create_comment(&self, comment: &Comment) -> Result<()>;
    fn list_comments(&self, post_id: &str) -> Result<Vec<CommentView>>;

    // Coach operations
    fn create_coach_message(&self, message: &CoachMessage) -> Result<()>;
    /// The most recent `limit` messages, oldest first.
    fn list_coach_messages(&self, user_id: &str, limit: i32) -> Result<Vec<CoachMessage>>;

    // Billing operations
    fn apply_subscription_event(&self, subscription: &Subscription) -> Result<SubscriptionApplied>;
    fn get_subscription(&self, provider_subscription_id: &str) -> Result<Option<Subscription>>;
}
