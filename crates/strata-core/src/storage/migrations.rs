//! Schema migrations, additive-only from v1 onward (§4.2, §6.4).
//!
//! Each entry's `up` SQL is applied inside the same transaction as the
//! `meta.schema_version` bump, so a crash mid-migration never leaves the
//! store at a partially-applied version.

use rusqlite::{Connection, Transaction};

use super::StoreError;

pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static str,
}

pub const CURRENT_SCHEMA_VERSION: i64 = 2;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "base property graph schema: nodes, labels, edges, FTS5",
        up: r#"
            CREATE TABLE IF NOT EXISTS nodes (
                rowid_pk      INTEGER PRIMARY KEY AUTOINCREMENT,
                id            TEXT NOT NULL UNIQUE,
                title         TEXT NOT NULL,
                content       TEXT NOT NULL,
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL,
                properties_json TEXT NOT NULL DEFAULT '{}'
            );

            CREATE TABLE IF NOT EXISTS node_labels (
                node_id TEXT NOT NULL,
                label   TEXT NOT NULL,
                PRIMARY KEY (node_id, label)
            );
            CREATE INDEX IF NOT EXISTS idx_node_labels_label ON node_labels(label);

            CREATE TABLE IF NOT EXISTS edges (
                from_id       TEXT NOT NULL,
                to_id         TEXT NOT NULL,
                type          TEXT NOT NULL,
                weight        REAL NOT NULL,
                created_at    TEXT NOT NULL,
                last_accessed TEXT NOT NULL,
                PRIMARY KEY (from_id, to_id, type)
            );
            CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_id);
            CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_id);
            CREATE INDEX IF NOT EXISTS idx_edges_type ON edges(type);

            CREATE TABLE IF NOT EXISTS meta (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE VIRTUAL TABLE IF NOT EXISTS nodes_fts USING fts5(
                title, content, content='nodes', content_rowid='rowid_pk'
            );

            CREATE TRIGGER IF NOT EXISTS nodes_fts_ai AFTER INSERT ON nodes BEGIN
                INSERT INTO nodes_fts(rowid, title, content) VALUES (new.rowid_pk, new.title, new.content);
            END;
            CREATE TRIGGER IF NOT EXISTS nodes_fts_ad AFTER DELETE ON nodes BEGIN
                INSERT INTO nodes_fts(nodes_fts, rowid, title, content) VALUES ('delete', old.rowid_pk, old.title, old.content);
            END;
            CREATE TRIGGER IF NOT EXISTS nodes_fts_au AFTER UPDATE ON nodes BEGIN
                INSERT INTO nodes_fts(nodes_fts, rowid, title, content) VALUES ('delete', old.rowid_pk, old.title, old.content);
                INSERT INTO nodes_fts(rowid, title, content) VALUES (new.rowid_pk, new.title, new.content);
            END;
        "#,
    },
    Migration {
        version: 2,
        description: "indexes for decay/archival scans over nodes.updated_at",
        up: r#"
            CREATE INDEX IF NOT EXISTS idx_nodes_updated_at ON nodes(updated_at);
        "#,
    },
];

pub fn get_current_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT value FROM meta WHERE key = 'schema_version'",
        [],
        |row| row.get::<_, String>(0),
    )
    .map(|s| s.parse::<i64>().unwrap_or(0))
    .or(Ok(0))
}

pub fn apply_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    // `meta` may not exist yet on a brand new file; the first migration
    // creates it, so we can't query schema_version before running migration 1.
    let meta_exists: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='meta'",
            [],
            |_| Ok(true),
        )
        .unwrap_or(false);
    let current = if meta_exists {
        get_current_version(conn)?
    } else {
        0
    };

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tracing::info!(version = migration.version, description = migration.description, "applying migration");
        let tx: Transaction = conn.transaction()?;
        tx.execute_batch(migration.up)?;
        tx.execute(
            "INSERT INTO meta(key, value) VALUES ('schema_version', ?1) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [migration.version.to_string()],
        )?;
        tx.commit()?;
    }
    Ok(())
}
