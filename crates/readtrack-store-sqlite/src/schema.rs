//! SQL schema for the reading-tracker SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Book ids are `AUTOINCREMENT` and never reused: history rows outlive the
/// book they were recorded against and are keyed by its id.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id             INTEGER PRIMARY KEY,
    email               TEXT NOT NULL UNIQUE,
    password_hash       TEXT NOT NULL,   -- argon2 PHC string
    utc_offset_minutes  INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL    -- RFC 3339 UTC
);

-- Only the SHA-256 hex digest of a session token is stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash  TEXT PRIMARY KEY,
    user_id     INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL,
    expires_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS book (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    title                 TEXT NOT NULL,
    author                TEXT NOT NULL,
    total_page            INTEGER NOT NULL,
    status                TEXT NOT NULL,   -- 'To Be Read' | 'Current Read' | 'Finish'
    page_read             INTEGER NOT NULL DEFAULT 0,
    percentage_completed  REAL,            -- NULL when total_page = 0
    notes                 TEXT,
    user_id               INTEGER NOT NULL REFERENCES users(user_id)
);

-- One row per (book, day). No foreign key on book_id: history outlives the
-- book and keeps its own title/author snapshot.
CREATE TABLE IF NOT EXISTS reading_history (
    id          INTEGER PRIMARY KEY,
    book_id     INTEGER NOT NULL,
    date        TEXT NOT NULL,   -- YYYY-MM-DD in the owner's calendar
    book_title  TEXT NOT NULL,
    author      TEXT NOT NULL,
    start_page  INTEGER NOT NULL,
    end_page    INTEGER NOT NULL,
    user_id     INTEGER NOT NULL REFERENCES users(user_id),
    UNIQUE (book_id, date)
);

CREATE TABLE IF NOT EXISTS learning (
    id             INTEGER PRIMARY KEY,
    user_id        INTEGER NOT NULL UNIQUE REFERENCES users(user_id),
    learning_list  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS book_user_idx     ON book(user_id);
CREATE INDEX IF NOT EXISTS history_user_idx  ON reading_history(user_id, date);
CREATE INDEX IF NOT EXISTS sessions_user_idx ON sessions(user_id);

PRAGMA user_version = 1;
";
