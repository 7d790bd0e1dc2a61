//! SQL schema for the Quorum SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Posts are never updated or deleted once written.
CREATE TABLE IF NOT EXISTS posts (
    post_id             TEXT PRIMARY KEY,
    title               TEXT NOT NULL,
    description         TEXT,
    poster_id           TEXT NOT NULL,
    poster_display_name TEXT,
    poster_photo_url    TEXT,
    tags                TEXT NOT NULL DEFAULT '[]',  -- JSON array of strings
    created_at          TEXT NOT NULL,               -- RFC 3339, fixed width, UTC
    modified_at         TEXT NOT NULL
);

-- Only `votes` and `user_votes` ever change, together, in one UPDATE.
CREATE TABLE IF NOT EXISTS answers (
    answer_id  TEXT PRIMARY KEY,
    post_id    TEXT NOT NULL REFERENCES posts(post_id),
    text       TEXT NOT NULL,
    votes      INTEGER NOT NULL DEFAULT 0,
    user_votes TEXT NOT NULL DEFAULT '[]',          -- JSON array of uids
    CHECK (votes >= 0)
);

CREATE TABLE IF NOT EXISTS users (
    uid          TEXT PRIMARY KEY,
    display_name TEXT,
    email        TEXT,
    photo_url    TEXT,
    votes        TEXT NOT NULL DEFAULT '{}',        -- JSON object post_id -> answer_id
    created_at   TEXT NOT NULL,
    last_login   TEXT,
    updated_at   TEXT NOT NULL
);

-- One row per (post, voter). The primary key is the single-vote gate.
CREATE TABLE IF NOT EXISTS vote_markers (
    post_id     TEXT NOT NULL REFERENCES posts(post_id),
    uid         TEXT NOT NULL,
    answer_id   TEXT NOT NULL,
    recorded_at TEXT NOT NULL,
    PRIMARY KEY (post_id, uid)
);

CREATE INDEX IF NOT EXISTS answers_post_idx   ON answers(post_id);
CREATE INDEX IF NOT EXISTS posts_created_idx  ON posts(created_at);

PRAGMA user_version = 1;
";
