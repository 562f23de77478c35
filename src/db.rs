use std::time::Duration;

use rusqlite::{params, Connection, DatabaseName, ErrorCode, OptionalExtension, Result};
use serde::Serialize;

use crate::domain::dates::now_utc_rfc3339;
use crate::store::{KvStore, PersistenceError, COLLECTION_KEYS};

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    name: "baseline_collections_v1",
    sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS kv_collection (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#,
}];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_for_speed(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_for_speed(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tracing::debug!(version = migration.version, name = migration.name, "applying migration");
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now_utc_rfc3339()],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;
    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('activity_limit', '100'), ('urgent_limit', '3')
ON CONFLICT(key) DO NOTHING
"#,
        [],
    )?;

    tx.commit()
}

pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO meta (key, value)
VALUES (?1, ?2)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![key, value],
    )?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStat {
    pub key: &'static str,
    pub bytes: i64,
    pub updated_at: Option<String>,
}

/// Size and last write time of every collection key, missing keys included.
pub fn collection_stats(conn: &Connection) -> Result<Vec<CollectionStat>> {
    let mut stmt =
        conn.prepare("SELECT length(value), updated_at FROM kv_collection WHERE key = ?1")?;
    let mut stats = Vec::with_capacity(COLLECTION_KEYS.len());
    for key in COLLECTION_KEYS {
        let row: Option<(i64, String)> = stmt
            .query_row(params![key], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;
        stats.push(match row {
            Some((bytes, updated_at)) => CollectionStat {
                key,
                bytes,
                updated_at: Some(updated_at),
            },
            None => CollectionStat {
                key,
                bytes: 0,
                updated_at: None,
            },
        });
    }
    Ok(stats)
}

/// `KvStore` over the `kv_collection` table. Each `set` is its own
/// statement; there is no transaction spanning keys.
pub struct SqliteKv<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteKv<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl KvStore for SqliteKv<'_> {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, PersistenceError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_collection WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), PersistenceError> {
        let written = self.conn.execute(
            r#"
INSERT INTO kv_collection (key, value, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
    value = excluded.value,
    updated_at = excluded.updated_at
"#,
            params![key, value, now_utc_rfc3339()],
        );
        match written {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if matches!(failure.code, ErrorCode::DiskFull | ErrorCode::ReadOnly) =>
            {
                Err(PersistenceError::Unavailable {
                    key: key.to_string(),
                    reason: failure.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}
