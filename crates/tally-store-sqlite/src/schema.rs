//! SQL schema for the Tally SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Append-only apart from the chat-wide clear.
-- No UPDATE is ever issued against this table.
CREATE TABLE IF NOT EXISTS transactions (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    chat_id        INTEGER NOT NULL,
    user           TEXT    NOT NULL,
    kind           TEXT    NOT NULL CHECK (kind IN ('income', 'payout')),
    amount_local   TEXT    NOT NULL,   -- decimal string
    amount_foreign TEXT    NOT NULL,   -- decimal string
    rate           TEXT    NOT NULL,   -- exchange rate at recording time
    recorded_at    INTEGER NOT NULL    -- UTC, microseconds since the epoch
);

CREATE TABLE IF NOT EXISTS chat_settings (
    chat_id       INTEGER PRIMARY KEY,
    exchange_rate TEXT,                -- NULL until first set
    fee_rate      TEXT                 -- NULL until first set
);

-- Runtime-added operators only; built-ins come from configuration.
CREATE TABLE IF NOT EXISTS operators (
    operator_id INTEGER PRIMARY KEY,
    added_at    INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS transactions_chat_time_idx
    ON transactions(chat_id, recorded_at);

PRAGMA user_version = 1;
";
