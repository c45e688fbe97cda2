//! v001 -- Initial schema creation.
//!
//! Creates the eight core tables: `users`, `skills`, `skill_offerings`,
//! `exchanges`, `messages`, `ratings`, `transactions`, and `notifications`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id             TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    public_id      TEXT NOT NULL UNIQUE,        -- display handle, e.g. SSL123456
    name           TEXT NOT NULL,
    email          TEXT NOT NULL UNIQUE,
    password_hash  TEXT NOT NULL,               -- salt$digest
    location       TEXT NOT NULL DEFAULT '',
    bio            TEXT NOT NULL DEFAULT '',
    points_balance INTEGER NOT NULL DEFAULT 0,
    average_rating REAL NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL,               -- ISO-8601 / RFC-3339
    updated_at     TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Skill catalog
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS skills (
    id          TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    slug        TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    category    TEXT NOT NULL,
    skill_level TEXT NOT NULL,
    hourly_rate INTEGER NOT NULL DEFAULT 0      -- suggested points/hour
);

CREATE INDEX IF NOT EXISTS idx_skills_category ON skills(category);

-- ----------------------------------------------------------------
-- Skill offerings (one row per user+skill, replaced on re-add)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS skill_offerings (
    id          TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    user_id     TEXT NOT NULL,
    skill_id    TEXT NOT NULL,
    skill_level TEXT NOT NULL,
    hourly_rate INTEGER NOT NULL DEFAULT 0,
    description TEXT NOT NULL DEFAULT '',

    UNIQUE (user_id, skill_id),
    FOREIGN KEY (user_id)  REFERENCES users(id),
    FOREIGN KEY (skill_id) REFERENCES skills(id)
);

-- ----------------------------------------------------------------
-- Exchanges
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS exchanges (
    id             TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    requester_id   TEXT NOT NULL,               -- pays points, learns
    provider_id    TEXT NOT NULL,               -- earns points, teaches
    skill_id       TEXT NOT NULL,
    skill          TEXT NOT NULL,               -- name snapshot at creation
    skill_level    TEXT NOT NULL,
    description    TEXT NOT NULL DEFAULT '',
    session_type   TEXT NOT NULL,
    hourly_rate    INTEGER NOT NULL,
    scheduled_date TEXT,
    duration_hours REAL NOT NULL,
    is_mutual      INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    status         TEXT NOT NULL DEFAULT 'Pending',
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,

    FOREIGN KEY (requester_id) REFERENCES users(id),
    FOREIGN KEY (provider_id)  REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_exchanges_requester ON exchanges(requester_id);
CREATE INDEX IF NOT EXISTS idx_exchanges_provider  ON exchanges(provider_id);

-- ----------------------------------------------------------------
-- Messages (append-only, per exchange)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id           TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    exchange_id  TEXT NOT NULL,
    sender_id    TEXT NOT NULL,
    content      TEXT NOT NULL,
    message_type TEXT NOT NULL DEFAULT 'text',
    created_at   TEXT NOT NULL,

    FOREIGN KEY (exchange_id) REFERENCES exchanges(id),
    FOREIGN KEY (sender_id)   REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_messages_exchange_ts
    ON messages(exchange_id, created_at ASC);

-- ----------------------------------------------------------------
-- Ratings (at most one per exchange, replaced on re-rate)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS ratings (
    id            TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    exchange_id   TEXT NOT NULL UNIQUE,
    rater_id      TEXT NOT NULL,
    rated_user_id TEXT NOT NULL,
    score         INTEGER NOT NULL,             -- 1..=5
    review_text   TEXT,
    created_at    TEXT NOT NULL,

    FOREIGN KEY (exchange_id)   REFERENCES exchanges(id),
    FOREIGN KEY (rater_id)      REFERENCES users(id),
    FOREIGN KEY (rated_user_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_ratings_rated_user ON ratings(rated_user_id);

-- ----------------------------------------------------------------
-- Ledger transactions (immutable; sum per user == points_balance)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS transactions (
    id          TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    user_id     TEXT NOT NULL,
    amount      INTEGER NOT NULL,               -- signed: negative = debit
    kind        TEXT NOT NULL,                  -- Payment | Award | Bonus
    description TEXT NOT NULL,
    exchange_id TEXT,
    created_at  TEXT NOT NULL,

    FOREIGN KEY (user_id)     REFERENCES users(id),
    FOREIGN KEY (exchange_id) REFERENCES exchanges(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_user_ts
    ON transactions(user_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_transactions_exchange
    ON transactions(exchange_id, kind);

-- ----------------------------------------------------------------
-- Notifications
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS notifications (
    id         TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    user_id    TEXT NOT NULL,
    kind       TEXT NOT NULL,
    title      TEXT NOT NULL,
    message    TEXT NOT NULL,
    payload    TEXT NOT NULL DEFAULT '{}',      -- opaque JSON
    is_read    INTEGER NOT NULL DEFAULT 0,      -- boolean 0/1
    created_at TEXT NOT NULL,
    read_at    TEXT,

    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_notifications_user_ts
    ON notifications(user_id, created_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
