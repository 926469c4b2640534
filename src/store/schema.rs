pub const SCHEMA: &str = r#"
-- Users carry their own progression counters
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    display_name TEXT NOT NULL,
    xp INTEGER NOT NULL DEFAULT 0 CHECK (xp >= 0),
    level INTEGER NOT NULL DEFAULT 1,

    -- Weak reference to the active streak; history rows outlive it
    current_streak_id TEXT REFERENCES streaks(id) ON DELETE SET NULL,
    total_relapses INTEGER NOT NULL DEFAULT 0,
    is_premium INTEGER NOT NULL DEFAULT 0,

    -- Onboarding answers (JSON string arrays)
    goals TEXT NOT NULL DEFAULT '[]',
    triggers TEXT NOT NULL DEFAULT '[]',
    onboarding_completed_at TEXT,

    last_active_at TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Streaks: one continuous run of daily check-ins
CREATE TABLE IF NOT EXISTS streaks (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    start_date TEXT NOT NULL,          -- YYYY-MM-DD (UTC)
    duration_days INTEGER NOT NULL DEFAULT 1 CHECK (duration_days >= 1),
    is_active INTEGER NOT NULL DEFAULT 1,
    ended_at TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Check-in audit log; the primary key enforces once per UTC day
CREATE TABLE IF NOT EXISTS check_ins (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    day TEXT NOT NULL,                 -- YYYY-MM-DD (UTC)
    xp_gained INTEGER NOT NULL DEFAULT 0,
    streak_id TEXT REFERENCES streaks(id) ON DELETE SET NULL,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, day)
);

-- Tokens are auth credentials; non-admin tokens must belong to a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- 8 chars of the token for fast lookup
    is_admin INTEGER NOT NULL DEFAULT 0,
    user_id TEXT REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

-- Community feed
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,               -- UUIDv7, sorts by creation time
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    body TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS post_likes (
    post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (post_id, user_id)
);

CREATE TABLE IF NOT EXISTS comments (
    id TEXT PRIMARY KEY,               -- UUIDv7
    post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    body TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Coach conversation history
CREATE TABLE IF NOT EXISTS coach_messages (
    id TEXT PRIMARY KEY,               -- UUIDv7
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role TEXT NOT NULL CHECK (role IN ('user', 'coach')),
    content TEXT NOT NULL,
    is_fallback INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Subscription status mirrored from the billing provider
CREATE TABLE IF NOT EXISTS subscriptions (
    provider_subscription_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    status TEXT NOT NULL,
    current_period_end TEXT,
    event_created_at TEXT NOT NULL,    -- provider timestamp of the last applied event
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_streaks_one_active ON streaks(user_id) WHERE is_active = 1;
CREATE INDEX IF NOT EXISTS idx_streaks_user ON streaks(user_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_posts_user ON posts(user_id);
CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id);
CREATE INDEX IF NOT EXISTS idx_coach_messages_user ON coach_messages(user_id);
CREATE INDEX IF NOT EXISTS idx_subscriptions_user ON subscriptions(user_id);
"#;
