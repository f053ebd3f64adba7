//! Relational schema for the structured store.
//!
//! Single-writer/many-reader discipline: WAL journal mode so external reads
//! never block on an in-progress index run. Every foreign key cascades so
//! delete-by-file removes all dependent rows atomically.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Bump when the table layout changes incompatibly.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    path         TEXT PRIMARY KEY,
    language     TEXT NOT NULL,
    loc          INTEGER NOT NULL,
    content_hash TEXT NOT NULL,
    mtime        INTEGER NOT NULL,
    size         INTEGER NOT NULL,
    updated_at   INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS symbols (
    id         TEXT PRIMARY KEY,
    file       TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
    kind       TEXT NOT NULL,
    name       TEXT NOT NULL,
    line_start INTEGER NOT NULL,
    line_end   INTEGER NOT NULL,
    complexity INTEGER,
    parameters TEXT NOT NULL,
    raw_calls  TEXT NOT NULL,
    exported   INTEGER NOT NULL,
    decorators TEXT NOT NULL,
    code       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols(file);
CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(name);
CREATE INDEX IF NOT EXISTS idx_symbols_complexity ON symbols(complexity);

CREATE TABLE IF NOT EXISTS imports (
    id              INTEGER PRIMARY KEY,
    file            TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
    statement       TEXT NOT NULL,
    module          TEXT NOT NULL,
    line            INTEGER NOT NULL,
    resolved_target TEXT
);
CREATE INDEX IF NOT EXISTS idx_imports_file ON imports(file);

CREATE TABLE IF NOT EXISTS exports (
    id   INTEGER PRIMARY KEY,
    file TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
    name TEXT NOT NULL,
    kind TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_exports_file ON exports(file);

CREATE TABLE IF NOT EXISTS file_edges (
    source     TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
    target     TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
    via_import INTEGER NOT NULL REFERENCES imports(id) ON DELETE CASCADE,
    line       INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_file_edges_source ON file_edges(source);
CREATE INDEX IF NOT EXISTS idx_file_edges_target ON file_edges(target);

CREATE TABLE IF NOT EXISTS call_edges (
    caller_symbol TEXT NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    callee_symbol TEXT NOT NULL REFERENCES symbols(id) ON DELETE CASCADE,
    line          INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_call_edges_caller ON call_edges(caller_symbol);
CREATE INDEX IF NOT EXISTS idx_call_edges_callee ON call_edges(callee_symbol);

CREATE TABLE IF NOT EXISTS entry_points (
    file TEXT NOT NULL REFERENCES files(path) ON DELETE CASCADE,
    name TEXT NOT NULL,
    PRIMARY KEY (file, name)
);
"#;

/// Configure pragmas and apply the schema to a fresh or existing connection.
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("failed to enable WAL journal mode")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("failed to enable foreign key enforcement")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous mode")?;

    let version: i64 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("failed to read schema version")?;

    if version > SCHEMA_VERSION {
        anyhow::bail!(
            "store schema version {} is newer than supported version {}",
            version,
            SCHEMA_VERSION
        );
    }

    conn.execute_batch(SCHEMA_SQL)
        .context("failed to apply store schema")?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)
        .context("failed to record schema version")?;

    Ok(())
}
