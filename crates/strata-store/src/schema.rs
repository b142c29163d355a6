use crate::error::{StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: &'static str,
    pub name: &'static str,
    pub sql: &'static str,
}

pub fn bundled_migrations() -> Vec<Migration> {
    vec![Migration {
        version: "001",
        name: "001_report_tables.sql",
        sql: include_str!("../../../sql/001_report_tables.sql"),
    }]
}

/// Applies any bundled migration not yet recorded in the ledger. Each
/// migration runs in its own transaction together with its ledger entry.
pub fn run_migrations(conn: &mut Connection) -> StoreResult<Vec<String>> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )?;

    let mut executed = Vec::new();
    for migration in bundled_migrations() {
        let applied: Option<String> = conn
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;
        if applied.is_some() {
            continue;
        }

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|source| StoreError::Migration {
                name: migration.name.to_string(),
                source,
            })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;
        tx.commit()?;

        executed.push(migration.version.to_string());
    }

    Ok(executed)
}
