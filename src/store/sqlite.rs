use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use uuid::Uuid;

use super::schema::SCHEMA;
use super::{Store, SubscriptionApplied};
use crate::error::{Error, Result};
use crate::progression::{
    CheckInOutcome, LevelTable, MAX_XP_AWARD, ResetOutcome, XpAward, plan_check_in,
    plan_xp_award, utc_day,
};
use crate::types::*;

const USER_COLUMNS: &str = "id, display_name, xp, level, current_streak_id, total_relapses, \
     is_premium, goals, triggers, onboarding_completed_at, last_active_at, created_at, updated_at";

const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at";

const STREAK_COLUMNS: &str =
    "id, user_id, start_date, duration_days, is_active, ended_at, created_at, updated_at";

const POST_VIEW_SELECT: &str = "SELECT p.id, p.user_id, p.body, p.created_at, p.updated_at,
            u.display_name, u.level,
            (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id),
            (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id),
            EXISTS(SELECT 1 FROM post_likes l WHERE l.post_id = p.id AND l.user_id = ?1)
     FROM posts p JOIN users u ON u.id = p.user_id";

const SUBSCRIPTION_COLUMNS: &str =
    "provider_subscription_id, user_id, status, current_period_end, event_created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// An in-memory database, mostly useful for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|e| {
        tracing::error!("Invalid date in database: '{}' - {}", s, e);
        Utc::now().date_naive()
    })
}

fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn parse_string_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_else(|e| {
        tracing::error!("Invalid string list in database: '{}' - {}", s, e);
        Vec::new()
    })
}

fn format_string_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        display_name: row.get(1)?,
        xp: row.get(2)?,
        level: row.get(3)?,
        current_streak_id: row.get(4)?,
        total_relapses: row.get(5)?,
        is_premium: row.get(6)?,
        goals: parse_string_list(&row.get::<_, String>(7)?),
        triggers: parse_string_list(&row.get::<_, String>(8)?),
        onboarding_completed_at: row.get::<_, Option<String>>(9)?.map(|s| parse_datetime(&s)),
        last_active_at: row.get::<_, Option<String>>(10)?.map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&row.get::<_, String>(11)?),
        updated_at: parse_datetime(&row.get::<_, String>(12)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

fn streak_from_row(row: &Row<'_>) -> rusqlite::Result<Streak> {
    Ok(Streak {
        id: row.get(0)?,
        user_id: row.get(1)?,
        start_date: parse_date(&row.get::<_, String>(2)?),
        duration_days: row.get(3)?,
        is_active: row.get(4)?,
        ended_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&row.get::<_, String>(6)?),
        updated_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

fn post_view_from_row(row: &Row<'_>) -> rusqlite::Result<PostView> {
    Ok(PostView {
        post: Post {
            id: row.get(0)?,
            user_id: row.get(1)?,
            body: row.get(2)?,
            created_at: parse_datetime(&row.get::<_, String>(3)?),
            updated_at: parse_datetime(&row.get::<_, String>(4)?),
        },
        author_name: row.get(5)?,
        author_level: row.get(6)?,
        like_count: row.get(7)?,
        comment_count: row.get(8)?,
        liked_by_me: row.get(9)?,
    })
}

fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    Ok(Subscription {
        provider_subscription_id: row.get(0)?,
        user_id: row.get(1)?,
        status: row.get(2)?,
        current_period_end: row.get::<_, Option<String>>(3)?.map(|s| parse_datetime(&s)),
        event_created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn load_user(tx: &Transaction<'_>, user_id: &str) -> Result<User> {
    tx.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![user_id],
        user_from_row,
    )
    .optional()?
    .ok_or(Error::NotFound)
}

fn load_active_streak(conn: &Connection, user_id: &str) -> Result<Option<Streak>> {
    conn.query_row(
        &format!("SELECT {STREAK_COLUMNS} FROM streaks WHERE user_id = ?1 AND is_active = 1"),
        params![user_id],
        streak_from_row,
    )
    .optional()
    .map_err(Error::from)
}

fn refresh_premium(tx: &Transaction<'_>, user_id: &str, now: &str) -> Result<bool> {
    let is_premium: bool = tx.query_row(
        "SELECT EXISTS(
             SELECT 1 FROM subscriptions
             WHERE user_id = ?1 AND status IN (?2, ?3)
         )",
        params![
            user_id,
            Subscription::PREMIUM_STATUSES[0],
            Subscription::PREMIUM_STATUSES[1]
        ],
        |row| row.get(0),
    )?;

    tx.execute(
        "UPDATE users SET is_premium = ?1, updated_at = ?2 WHERE id = ?3",
        params![is_premium, now, user_id],
    )?;
    Ok(is_premium)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, display_name, xp, level, total_relapses, is_premium,
                                goals, triggers, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user.id,
                user.display_name,
                user.xp,
                user.level,
                user.total_relapses,
                user.is_premium,
                format_string_list(&user.goals),
                format_string_list(&user.triggers),
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_primary_key_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], user_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_profile(&self, user: &User) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET display_name = ?1, goals = ?2, triggers = ?3,
                              onboarding_completed_at = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                user.display_name,
                format_string_list(&user.goals),
                format_string_list(&user.triggers),
                user.onboarding_completed_at.as_ref().map(format_datetime),
                format_datetime(&user.updated_at),
                user.id,
            ],
        )?;

        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn delete_user(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        // Detach the streak reference before the cascade removes the streaks.
        tx.execute(
            "UPDATE users SET current_streak_id = NULL WHERE id = ?1",
            params![id],
        )?;
        let rows = tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(rows > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::TokenLookupCollision)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_id(&self, id: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE id = ?1"),
            params![id],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_tokens(&self, cursor: &str, limit: i32) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE id > ?1 ORDER BY id LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![cursor, limit], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_tokens(&self, user_id: &str) -> Result<Vec<Token>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], token_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let conn = self.conn();
        let count: i32 = conn.query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Progression operations

    fn perform_check_in(
        &self,
        table: &LevelTable,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CheckInOutcome> {
        let day = utc_day(now);
        let now_str = format_datetime(&now);

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let user = load_user(&tx, user_id)?;

        // The audit row goes in first: its primary key is what decides
        // whether today's check-in already happened.
        if let Err(e) = tx.execute(
            "INSERT INTO check_ins (user_id, day, xp_gained, created_at) VALUES (?1, ?2, 0, ?3)",
            params![user_id, format_date(&day), now_str],
        ) {
            if is_primary_key_violation(&e) {
                return Err(Error::DuplicateCheckIn);
            }
            return Err(Error::from(e));
        }

        let active = load_active_streak(&tx, user_id)?;
        let plan = plan_check_in(
            table,
            user.xp,
            user.level,
            active.as_ref().map(|s| s.duration_days),
        );

        let streak = match active {
            Some(mut streak) => {
                tx.execute(
                    "UPDATE streaks SET duration_days = ?1, updated_at = ?2 WHERE id = ?3",
                    params![plan.streak_days, now_str, streak.id],
                )?;
                streak.duration_days = plan.streak_days;
                streak.updated_at = now;
                streak
            }
            None => {
                let streak = Streak {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.to_string(),
                    start_date: day,
                    duration_days: plan.streak_days,
                    is_active: true,
                    ended_at: None,
                    created_at: now,
                    updated_at: now,
                };
                tx.execute(
                    "INSERT INTO streaks (id, user_id, start_date, duration_days, is_active, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)",
                    params![
                        streak.id,
                        streak.user_id,
                        format_date(&streak.start_date),
                        streak.duration_days,
                        now_str,
                    ],
                )?;
                streak
            }
        };

        tx.execute(
            "UPDATE users SET xp = ?1, level = ?2, current_streak_id = ?3,
                              last_active_at = ?4, updated_at = ?4
             WHERE id = ?5",
            params![plan.total_xp, plan.level, streak.id, now_str, user_id],
        )?;

        tx.execute(
            "UPDATE check_ins SET xp_gained = ?1, streak_id = ?2 WHERE user_id = ?3 AND day = ?4",
            params![plan.xp_gained, streak.id, user_id, format_date(&day)],
        )?;

        tx.commit()?;
        Ok(CheckInOutcome { day, plan, streak })
    }

    fn reset_streak(&self, user_id: &str, now: DateTime<Utc>) -> Result<ResetOutcome> {
        let now_str = format_datetime(&now);

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let user = load_user(&tx, user_id)?;

        let Some(mut streak) = load_active_streak(&tx, user_id)? else {
            return Ok(ResetOutcome {
                streak: None,
                total_relapses: user.total_relapses,
            });
        };

        tx.execute(
            "UPDATE streaks SET is_active = 0, ended_at = ?1, updated_at = ?1 WHERE id = ?2",
            params![now_str, streak.id],
        )?;

        tx.execute(
            "UPDATE users SET current_streak_id = NULL, total_relapses = total_relapses + 1,
                              last_active_at = ?1, updated_at = ?1
             WHERE id = ?2",
            params![now_str, user_id],
        )?;

        tx.commit()?;

        streak.is_active = false;
        streak.ended_at = Some(now);
        streak.updated_at = now;

        Ok(ResetOutcome {
            streak: Some(streak),
            total_relapses: user.total_relapses + 1,
        })
    }

    fn award_xp(
        &self,
        table: &LevelTable,
        user_id: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<XpAward> {
        if !(1..=MAX_XP_AWARD).contains(&amount) {
            return Err(Error::Validation(format!(
                "amount must be between 1 and {MAX_XP_AWARD}"
            )));
        }

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let user = load_user(&tx, user_id)?;
        let award = plan_xp_award(table, user.xp, user.level, amount);

        tx.execute(
            "UPDATE users SET xp = ?1, level = ?2, updated_at = ?3 WHERE id = ?4",
            params![award.total_xp, award.level, format_datetime(&now), user_id],
        )?;

        tx.commit()?;
        Ok(award)
    }

    fn get_active_streak(&self, user_id: &str) -> Result<Option<Streak>> {
        let conn = self.conn();
        load_active_streak(&conn, user_id)
    }

    fn list_streaks(&self, user_id: &str) -> Result<Vec<Streak>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {STREAK_COLUMNS} FROM streaks WHERE user_id = ?1
             ORDER BY is_active DESC, start_date DESC, created_at DESC"
        ))?;

        let rows = stmt.query_map(params![user_id], streak_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn get_check_in(&self, user_id: &str, day: NaiveDate) -> Result<Option<CheckIn>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, day, xp_gained, streak_id, created_at
             FROM check_ins WHERE user_id = ?1 AND day = ?2",
            params![user_id, format_date(&day)],
            |row| {
                Ok(CheckIn {
                    user_id: row.get(0)?,
                    day: parse_date(&row.get::<_, String>(1)?),
                    xp_gained: row.get(2)?,
                    streak_id: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // Community operations

    fn create_post(&self, post: &Post) -> Result<()> {
        self.conn().execute(
            "INSERT INTO posts (id, user_id, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                post.id,
                post.user_id,
                post.body,
                format_datetime(&post.created_at),
                format_datetime(&post.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_post(&self, id: &str) -> Result<Option<Post>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, user_id, body, created_at, updated_at FROM posts WHERE id = ?1",
            params![id],
            |row| {
                Ok(Post {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    body: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?),
                    updated_at: parse_datetime(&row.get::<_, String>(4)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_post_view(&self, id: &str, viewer_id: &str) -> Result<Option<PostView>> {
        let conn = self.conn();
        conn.query_row(
            &format!("{POST_VIEW_SELECT} WHERE p.id = ?2"),
            params![viewer_id, id],
            post_view_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_post_views(&self, viewer_id: &str, cursor: &str, limit: i32) -> Result<Vec<PostView>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{POST_VIEW_SELECT} WHERE (?2 = '' OR p.id < ?2) ORDER BY p.id DESC LIMIT ?3"
        ))?;

        let rows = stmt.query_map(params![viewer_id, cursor, limit], post_view_from_row)?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_post(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn like_post(&self, post_id: &str, user_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "INSERT OR IGNORE INTO post_likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![post_id, user_id, format_datetime(&Utc::now())],
        )?;
        Ok(rows > 0)
    }

    fn unlike_post(&self, post_id: &str, user_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
            params![post_id, user_id],
        )?;
        Ok(rows > 0)
    }

    fn create_comment(&self, comment: &Comment) -> Result<()> {
        self.conn().execute(
            "INSERT INTO comments (id, post_id, user_id, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id,
                comment.post_id,
                comment.user_id,
                comment.body,
                format_datetime(&comment.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_comments(&self, post_id: &str) -> Result<Vec<CommentView>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.post_id, c.user_id, c.body, c.created_at, u.display_name
             FROM comments c JOIN users u ON u.id = c.user_id
             WHERE c.post_id = ?1 ORDER BY c.rowid",
        )?;

        let rows = stmt.query_map(params![post_id], |row| {
            Ok(CommentView {
                comment: Comment {
                    id: row.get(0)?,
                    post_id: row.get(1)?,
                    user_id: row.get(2)?,
                    body: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                },
                author_name: row.get(5)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Coach operations

    fn create_coach_message(&self, message: &CoachMessage) -> Result<()> {
        self.conn().execute(
            "INSERT INTO coach_messages (id, user_id, role, content, is_fallback, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id,
                message.user_id,
                message.role.as_str(),
                message.content,
                message.is_fallback,
                format_datetime(&message.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_coach_messages(&self, user_id: &str, limit: i32) -> Result<Vec<CoachMessage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, role, content, is_fallback, created_at FROM (
                 SELECT rowid AS seq, id, user_id, role, content, is_fallback, created_at
                 FROM coach_messages WHERE user_id = ?1
                 ORDER BY rowid DESC LIMIT ?2
             ) ORDER BY seq",
        )?;

        let rows = stmt.query_map(params![user_id, limit], |row| {
            let role: String = row.get(2)?;
            Ok(CoachMessage {
                id: row.get(0)?,
                user_id: row.get(1)?,
                role: CoachRole::parse(&role).unwrap_or(CoachRole::Coach),
                content: row.get(3)?,
                is_fallback: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Billing operations

    fn apply_subscription_event(&self, subscription: &Subscription) -> Result<SubscriptionApplied> {
        let now = format_datetime(&subscription.updated_at);

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        load_user(&tx, &subscription.user_id)?;

        let existing = tx
            .query_row(
                &format!(
                    "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE provider_subscription_id = ?1"
                ),
                params![subscription.provider_subscription_id],
                subscription_from_row,
            )
            .optional()?;

        if let Some(prev) = &existing {
            if !subscription.supersedes(prev) {
                let is_premium: bool = tx.query_row(
                    "SELECT is_premium FROM users WHERE id = ?1",
                    params![subscription.user_id],
                    |row| row.get(0),
                )?;
                return Ok(SubscriptionApplied {
                    applied: false,
                    is_premium,
                });
            }
        }

        tx.execute(
            "INSERT INTO subscriptions (provider_subscription_id, user_id, status, current_period_end,
                                        event_created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(provider_subscription_id) DO UPDATE SET
                 user_id = excluded.user_id,
                 status = excluded.status,
                 current_period_end = excluded.current_period_end,
                 event_created_at = excluded.event_created_at,
                 updated_at = excluded.updated_at",
            params![
                subscription.provider_subscription_id,
                subscription.user_id,
                subscription.status,
                subscription.current_period_end.as_ref().map(format_datetime),
                format_datetime(&subscription.event_created_at),
                now,
            ],
        )?;

        if let Some(prev) = existing.filter(|prev| prev.user_id != subscription.user_id) {
            refresh_premium(&tx, &prev.user_id, &now)?;
        }
        let is_premium = refresh_premium(&tx, &subscription.user_id, &now)?;

        tx.commit()?;
        Ok(SubscriptionApplied {
            applied: true,
            is_premium,
        })
    }

    fn get_subscription(&self, provider_subscription_id: &str) -> Result<Option<Subscription>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE provider_subscription_id = ?1"
            ),
            params![provider_subscription_id],
            subscription_from_row,
        )
        .optional()
        .map_err(Error::from)
    }
}
