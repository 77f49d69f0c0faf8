//! Database schema migrations.
//!
//! Applies the initial schema: users, todos, reflections, emotions and the
//! schema_migrations bookkeeping table.

use rusqlite::Connection;
use tracing::info;

use growlog_core::error::GrowlogError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), GrowlogError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| GrowlogError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| GrowlogError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
///
/// Dates are stored as `YYYY-MM-DD` text, timestamps as epoch milliseconds.
fn apply_v1(conn: &Connection) -> Result<(), GrowlogError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY NOT NULL,
            email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
            nickname        TEXT NOT NULL,
            password_hash   TEXT NOT NULL,
            created_at      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS todos (
            id              TEXT PRIMARY KEY NOT NULL,
            user_id         TEXT NOT NULL,
            title           TEXT NOT NULL,
            done            INTEGER NOT NULL DEFAULT 0 CHECK (done IN (0, 1)),
            date            TEXT NOT NULL,
            created_at      INTEGER NOT NULL,
            updated_at      INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_todos_user_date
            ON todos (user_id, date, created_at);

        -- user_id is nullable: reflections may be written anonymously.
        CREATE TABLE IF NOT EXISTS reflections (
            id              TEXT PRIMARY KEY NOT NULL,
            user_id         TEXT,
            content         TEXT NOT NULL,
            date            TEXT NOT NULL,
            created_at      INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_reflections_date
            ON reflections (date, created_at DESC);

        CREATE INDEX IF NOT EXISTS idx_reflections_user_date
            ON reflections (user_id, date)
            WHERE user_id IS NOT NULL;

        CREATE TABLE IF NOT EXISTS emotions (
            id              TEXT PRIMARY KEY NOT NULL,
            user_id         TEXT NOT NULL,
            kind            TEXT NOT NULL
                            CHECK (kind IN ('joy', 'gratitude', 'calm', 'sadness',
                                            'anger', 'anxiety', 'tired')),
            intensity       INTEGER NOT NULL CHECK (intensity BETWEEN 1 AND 5),
            note            TEXT,
            date            TEXT NOT NULL,
            created_at      INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_emotions_user_date
            ON emotions (user_id, date, created_at);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| GrowlogError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}
