//! Database schema migrations for novacal.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Create the schema_version table if it doesn't exist.
fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: tasks, custom tasks and working hours.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id                    TEXT PRIMARY KEY,
            owner_id              TEXT NOT NULL,
            title                 TEXT NOT NULL,
            start_time            TEXT NOT NULL,
            end_time              TEXT NOT NULL,
            due_time              TEXT,
            importance            INTEGER NOT NULL DEFAULT 2,
            description           TEXT NOT NULL DEFAULT '',
            links                 TEXT NOT NULL DEFAULT '',
            files                 TEXT NOT NULL DEFAULT '',
            parent_custom_task_id TEXT,
            created_at            TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS custom_tasks (
            id                     TEXT PRIMARY KEY,
            owner_id               TEXT NOT NULL,
            name                   TEXT NOT NULL,
            description            TEXT NOT NULL DEFAULT '',
            links                  TEXT NOT NULL DEFAULT '',
            files                  TEXT NOT NULL DEFAULT '',
            overall_start_time     TEXT NOT NULL,
            overall_due_time       TEXT NOT NULL,
            total_length_minutes   INTEGER NOT NULL,
            importance             INTEGER NOT NULL DEFAULT 2,
            split_enabled          INTEGER NOT NULL DEFAULT 0,
            block_duration_minutes INTEGER NOT NULL DEFAULT 30,
            created_at             TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS working_hours (
            owner_id   TEXT NOT NULL,
            day        TEXT NOT NULL,
            start_time TEXT NOT NULL,
            end_time   TEXT NOT NULL,
            PRIMARY KEY (owner_id, day)
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: indexes for the obstacle range query and child lookups.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_tasks_owner_start ON tasks(owner_id, start_time);
         CREATE INDEX IF NOT EXISTS idx_tasks_owner_end ON tasks(owner_id, end_time);
         CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_custom_task_id);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn v1_database_is_upgraded() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 1);

        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), 2);
        let index_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_tasks_owner_start'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(index_count, 1);
    }
}
