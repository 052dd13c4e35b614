//! SQL schema for the UniTap SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL UNIQUE,
    university  TEXT NOT NULL DEFAULT '',
    role        TEXT NOT NULL DEFAULT 'student',
    card_uid    TEXT UNIQUE,     -- normalised hex; NULL until linked
    created_at  TEXT NOT NULL
);

-- Folded gamification aggregate, one row per user who has ever tapped.
-- Written only inside the tap-commit transaction; reconstructable by
-- replaying tap_events.
CREATE TABLE IF NOT EXISTS user_stats (
    user_id              TEXT PRIMARY KEY REFERENCES users(user_id),
    points               INTEGER NOT NULL DEFAULT 0,
    current_streak       INTEGER NOT NULL DEFAULT 0,
    best_streak          INTEGER NOT NULL DEFAULT 0,
    first_arrivals       INTEGER NOT NULL DEFAULT 0,
    event_checkins       INTEGER NOT NULL DEFAULT 0,
    last_qualifying_date TEXT,            -- ISO date or NULL
    bonuses_json         TEXT NOT NULL DEFAULT '[]',
    badges_json          TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS devices (
    device_id  TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    location   TEXT NOT NULL DEFAULT '',
    mode       TEXT NOT NULL,    -- 'attendance' | 'equipment' | 'event'
    last_seen  TEXT
);

CREATE TABLE IF NOT EXISTS contexts (
    context_id TEXT PRIMARY KEY,
    device_id  TEXT NOT NULL REFERENCES devices(device_id),
    kind       TEXT NOT NULL,    -- discriminant of ContextBody variant
    body_json  TEXT NOT NULL     -- JSON payload (inner data only)
);

-- Tap events are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS tap_events (
    tap_id           TEXT PRIMARY KEY,
    user_id          TEXT NOT NULL REFERENCES users(user_id),
    user_name        TEXT NOT NULL,
    device_id        TEXT NOT NULL,
    action           TEXT NOT NULL,
    context_id       TEXT NOT NULL,
    context_label    TEXT NOT NULL,
    timestamp        TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    is_first_arrival INTEGER NOT NULL DEFAULT 0
);

-- One row per applied tap; tap_id doubles as the ledger idempotency key.
CREATE TABLE IF NOT EXISTS ledger_entries (
    tap_id         TEXT PRIMARY KEY REFERENCES tap_events(tap_id),
    user_id        TEXT NOT NULL REFERENCES users(user_id),
    points_awarded INTEGER NOT NULL,
    streak_after   INTEGER NOT NULL,
    recorded_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS contexts_device_idx   ON contexts(device_id);
CREATE INDEX IF NOT EXISTS taps_user_idx         ON tap_events(user_id);
CREATE INDEX IF NOT EXISTS taps_timestamp_idx    ON tap_events(timestamp);
CREATE INDEX IF NOT EXISTS ledger_user_time_idx  ON ledger_entries(user_id, recorded_at);

PRAGMA user_version = 1;
";
