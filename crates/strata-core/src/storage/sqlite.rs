//! Embedded relational + full-text store (C2).
//!
//! One [`Store`] owns two `rusqlite` connections: a `writer` behind a mutex
//! (single in-process write lock, §5) and a `reader` opened read-only so
//! concurrent recalls don't block on a populate/sleep run under WAL. A
//! best-effort lockfile guards against a second process opening the same
//! store directory for writing.

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde_json::Value;

use crate::config::StrataConfig;
use crate::model::{Direction, Edge, EdgeType, Node, NodeId, Properties};

use super::migrations;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// §7 class 1: cannot open or read the database file.
    #[error("store unavailable: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// §7 class 2: schema version newer than this build supports.
    #[error("schema mismatch: store is at version {found}, this build supports up to {supported}")]
    SchemaMismatch { found: i64, supported: i64 },

    /// §7 class 8: a write attempted to violate an identity/label/bounds invariant.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("node not found: {0}")]
    NotFound(String),

    /// Another process already holds the write lock on this store directory.
    #[error("store at {0} is locked by another process")]
    Locked(PathBuf),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Applies the pragma tuning that makes WAL-mode concurrent reads safe and
/// fast (§5: "readers don't block writers").
fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -64000;
         PRAGMA temp_store = MEMORY;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA mmap_size = 268435456;",
    )
}

/// Best-effort cross-process write lock (§5 "shared-resource policy"). Not a
/// correctness guarantee against a determined second writer, only a guard
/// against accidental double-open.
struct Lockfile {
    path: PathBuf,
}

impl Lockfile {
    fn acquire(store_dir: &Path) -> Result<Self> {
        let path = store_dir.join(".strata.lock");
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                use std::io::Write;
                let _ = write!(file, "{}", std::process::id());
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::Locked(store_dir.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for Lockfile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// The durable home for nodes, labels, properties, and edges (C2).
pub struct Store {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    store_dir: PathBuf,
    _lock: Lockfile,
}

impl Store {
    /// Opens (creating if absent) the store at the path resolved from
    /// `config` (§4.2, §9). Applies pending migrations and sets owner-only
    /// permissions on the directory and database file on Unix.
    pub fn open(config: &StrataConfig) -> Result<Self> {
        let store_dir = config.resolve_store_path();
        fs::create_dir_all(&store_dir)?;
        set_owner_only_dir(&store_dir);

        let lock = Lockfile::acquire(&store_dir)?;

        let db_path = store_dir.join("brain.db");
        let mut writer = Connection::open(&db_path)?;
        configure_connection(&writer)?;
        migrations::apply_migrations(&mut writer)?;
        let found = migrations::get_current_version(&writer)?;
        if found > migrations::CURRENT_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch {
                found,
                supported: migrations::CURRENT_SCHEMA_VERSION,
            });
        }
        set_owner_only_file(&db_path);

        let reader = Connection::open(&db_path)?;
        configure_connection(&reader)?;

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            store_dir,
            _lock: lock,
        })
    }

    /// Opens an in-memory store, for tests and short-lived callers that don't
    /// want a lockfile or on-disk artifacts. Both connections share the same
    /// named in-memory database via SQLite's shared-cache mode, so the
    /// reader actually observes the writer's data.
    pub fn open_in_memory() -> Result<Self> {
        let uri = format!("file:strata-mem-{}?mode=memory&cache=shared", uuid::Uuid::new_v4());
        let flags = rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
            | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
            | rusqlite::OpenFlags::SQLITE_OPEN_URI
            | rusqlite::OpenFlags::SQLITE_OPEN_SHARED_CACHE;

        let mut writer = Connection::open_with_flags(&uri, flags)?;
        migrations::apply_migrations(&mut writer)?;
        let reader = Connection::open_with_flags(&uri, flags)?;
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            store_dir: PathBuf::new(),
            _lock: Lockfile { path: PathBuf::new() },
        })
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    /// Runs `f` inside a single transaction on the writer connection (§4.2
    /// begin/commit/rollback, §9 "transactional adapters"). Any `Err`
    /// returned from `f` rolls the transaction back; the store is left
    /// unchanged.
    pub fn transaction<T>(&self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let mut conn = self.writer.lock().expect("writer mutex poisoned");
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// Inserts or updates a node. Labels are unioned with any existing labels
    /// unless `labels_replace` is set (§4.2 `upsert_node`).
    pub fn upsert_node(
        &self,
        id: &str,
        title: &str,
        content: &str,
        labels: &BTreeSet<String>,
        properties: &Properties,
        labels_replace: bool,
    ) -> Result<()> {
        if labels.is_empty() {
            return Err(StoreError::InvariantViolation(format!(
                "node {id} must carry at least one label"
            )));
        }
        self.transaction(|tx| {
            upsert_node_tx(tx, id, title, content, labels, properties, labels_replace)
        })
    }

    /// Merges `properties_patch` at the top level and optionally replaces
    /// `content` (§4.2 `update_node_content`).
    pub fn update_node_content(
        &self,
        id: &str,
        content: Option<&str>,
        properties_patch: &Properties,
    ) -> Result<()> {
        self.transaction(|tx| {
            let existing = get_node_tx(tx, id)?.ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let mut props = existing.properties;
            for (k, v) in properties_patch {
                props.insert(k.clone(), v.clone());
            }
            let new_content = content.unwrap_or(&existing.content);
            tx.execute(
                "UPDATE nodes SET content = ?1, properties_json = ?2, updated_at = ?3 WHERE id = ?4",
                params![new_content, serde_json::to_string(&props)?, Utc::now().to_rfc3339(), id],
            )?;
            Ok(())
        })
    }

    pub fn get_node(&self, id: &str) -> Result<Option<Node>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        get_node_tx(&conn, id)
    }

    pub fn find_by_title_labels(&self, title: &str, labels: &[&str]) -> Result<Option<Node>> {
        let candidate = crate::identity::node_id(title, labels);
        self.get_node(&candidate)
    }

    pub fn find_by_label(&self, label: &str) -> Result<Vec<Node>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT node_id FROM node_labels WHERE label = ?1",
        )?;
        let ids: Vec<String> = stmt
            .query_map([label], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        ids.into_iter()
            .filter_map(|id| get_node_tx(&conn, &id).transpose())
            .collect()
    }

    pub fn find_by_property(&self, key: &str, value: &Value) -> Result<Vec<Node>> {
        // properties are stored as a JSON blob; scanning is O(n) but bounded
        // by the expected corpus size (≤ 1e5 nodes, §4.1 collision policy).
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare("SELECT id, properties_json FROM nodes")?;
        let rows: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;
        let mut out = Vec::new();
        for (id, props_json) in rows {
            let props: Properties = serde_json::from_str(&props_json).unwrap_or_default();
            if props.get(key) == Some(value) {
                if let Some(node) = get_node_tx(&conn, &id)? {
                    out.push(node);
                }
            }
        }
        Ok(out)
    }

    /// Finds a node by exact title match, ignoring labels. Used by the
    /// cross-reference pass (§4.6) to resolve wikilink targets.
    pub fn find_by_title(&self, title: &str) -> Result<Option<Node>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let id: Option<String> = conn
            .query_row("SELECT id FROM nodes WHERE title = ?1 LIMIT 1", [title], |row| row.get(0))
            .optional()?;
        match id {
            Some(id) => get_node_tx(&conn, &id),
            None => Ok(None),
        }
    }

    /// Finds a node whose title starts with `prefix`. Used as the
    /// second-chance lookup in the cross-reference pass (§4.6: "looked up by
    /// title prefix or props id") for links like `[[ADR-007: Use an embedded
    /// store]]` matching a section titled exactly `ADR-007: Use an embedded store`.
    pub fn find_by_title_prefix(&self, prefix: &str) -> Result<Option<Node>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let pattern = format!("{}%", prefix.replace('%', "").replace('_', ""));
        let id: Option<String> = conn
            .query_row("SELECT id FROM nodes WHERE title LIKE ?1 LIMIT 1", [pattern], |row| row.get(0))
            .optional()?;
        match id {
            Some(id) => get_node_tx(&conn, &id),
            None => Ok(None),
        }
    }

    pub fn all_node_ids(&self) -> Result<Vec<NodeId>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare("SELECT id FROM nodes")?;
        let ids = stmt.query_map([], |row| row.get(0))?.collect::<rusqlite::Result<_>>()?;
        Ok(ids)
    }

    pub fn all_nodes(&self) -> Result<Vec<Node>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare("SELECT id FROM nodes")?;
        let ids: Vec<String> = stmt.query_map([], |row| row.get(0))?.collect::<rusqlite::Result<_>>()?;
        ids.into_iter()
            .filter_map(|id| get_node_tx(&conn, &id).transpose())
            .collect()
    }

    /// Upserts an edge, merging by maximum weight and refreshing
    /// `last_accessed` on conflict (§3 "Edge uniqueness", §4.2 `add_edge`).
    pub fn add_edge(&self, edge: &Edge) -> Result<()> {
        self.transaction(|tx| add_edge_tx(tx, edge))
    }

    pub fn neighbors(
        &self,
        id: &str,
        direction: Direction,
        types: Option<&[EdgeType]>,
    ) -> Result<Vec<(NodeId, EdgeType, f32)>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut out = Vec::new();
        let type_filter = |t: EdgeType| types.is_none_or(|allowed| allowed.contains(&t));

        if matches!(direction, Direction::Outgoing | Direction::Both) {
            let mut stmt = conn.prepare("SELECT to_id, type, weight FROM edges WHERE from_id = ?1")?;
            let rows = stmt.query_map([id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, f64>(2)?))
            })?;
            for row in rows {
                let (to_id, type_str, weight) = row?;
                if let Some(edge_type) = EdgeType::parse(&type_str) {
                    if type_filter(edge_type) {
                        out.push((to_id, edge_type, weight as f32));
                    }
                }
            }
        }
        if matches!(direction, Direction::Incoming | Direction::Both) {
            let mut stmt = conn.prepare("SELECT from_id, type, weight FROM edges WHERE to_id = ?1")?;
            let rows = stmt.query_map([id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, f64>(2)?))
            })?;
            for row in rows {
                let (from_id, type_str, weight) = row?;
                if let Some(edge_type) = EdgeType::parse(&type_str) {
                    if type_filter(edge_type) {
                        out.push((from_id, edge_type, weight as f32));
                    }
                }
            }
        }
        Ok(out)
    }

    /// Looks up a single edge by its composite key, used by recall's
    /// `CO_ACCESSED` accumulation (§4.7 step 6) to compute the incremented
    /// weight before handing it to [`Store::add_edge`]'s max-weight merge.
    pub fn get_edge(&self, from_id: &str, to_id: &str, edge_type: EdgeType) -> Result<Option<Edge>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let row: Option<(f64, String, String)> = conn
            .query_row(
                "SELECT weight, created_at, last_accessed FROM edges WHERE from_id = ?1 AND to_id = ?2 AND type = ?3",
                params![from_id, to_id, edge_type.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        Ok(row.map(|(weight, created_at, last_accessed)| Edge {
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            edge_type,
            weight: weight as f32,
            created_at: parse_ts(&created_at),
            last_accessed: parse_ts(&last_accessed),
        }))
    }

    /// Overwrites an existing edge's weight directly, bypassing the
    /// max-weight merge [`Store::add_edge`] applies on conflict. Used by
    /// sleep's CALIBRATE phase to decay edges whose endpoints have gone
    /// stale (§4.8 step 6) — a case `add_edge`'s monotone merge can't express.
    /// No-op if the edge doesn't exist.
    pub fn set_edge_weight(&self, from_id: &str, to_id: &str, edge_type: EdgeType, weight: f32) -> Result<()> {
        self.transaction(|tx| {
            tx.execute(
                "UPDATE edges SET weight = ?1 WHERE from_id = ?2 AND to_id = ?3 AND type = ?4",
                params![weight as f64, from_id, to_id, edge_type.as_str()],
            )?;
            Ok(())
        })
    }

    pub fn edges_of_type(&self, edge_type: EdgeType) -> Result<Vec<Edge>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT from_id, to_id, weight, created_at, last_accessed FROM edges WHERE type = ?1",
        )?;
        let rows = stmt.query_map([edge_type.as_str()], |row| {
            Ok(Edge {
                from_id: row.get(0)?,
                to_id: row.get(1)?,
                edge_type,
                weight: row.get::<_, f64>(2)? as f32,
                created_at: parse_ts(&row.get::<_, String>(3)?),
                last_accessed: parse_ts(&row.get::<_, String>(4)?),
            })
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    /// FTS5 full-text search, BM25-ranked and linearly normalized to [0,1]
    /// within the result set (§4.2, §4.7 step 2).
    pub fn fts_search(&self, query: &str, k: usize) -> Result<Vec<(NodeId, f64)>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT nodes.id, bm25(nodes_fts) AS rank \
             FROM nodes_fts JOIN nodes ON nodes.rowid_pk = nodes_fts.rowid \
             WHERE nodes_fts MATCH ?1 ORDER BY rank LIMIT ?2",
        )?;
        let escaped = escape_fts_query(query);
        let rows: Vec<(String, f64)> = match stmt.query_map(params![escaped, k as i64], |row| {
            Ok((row.get(0)?, row.get(1)?))
        }) {
            Ok(mapped) => mapped.collect::<rusqlite::Result<_>>()?,
            Err(_) => Vec::new(),
        };
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        // bm25() is lower-is-better; normalize so the best match scores 1.0.
        let min = rows.iter().map(|(_, r)| *r).fold(f64::INFINITY, f64::min);
        let max = rows.iter().map(|(_, r)| *r).fold(f64::NEG_INFINITY, f64::max);
        let span = (max - min).max(1e-9);
        Ok(rows
            .into_iter()
            .map(|(id, rank)| (id, 1.0 - (rank - min) / span))
            .collect())
    }

    /// `LIKE`-based fallback when FTS5 is unavailable (§4.2, §7 class 3/4
    /// adjacent — this is the lexical fallback, not the vector one).
    pub fn keyword_search(&self, query: &str, k: usize) -> Result<Vec<(NodeId, f64)>> {
        let conn = self.reader.lock().expect("reader mutex poisoned");
        let pattern = format!("%{}%", query.replace('%', "").replace('_', ""));
        let mut stmt = conn.prepare(
            "SELECT id, CASE WHEN title LIKE ?1 THEN 1.0 ELSE 0.5 END AS score \
             FROM nodes WHERE title LIKE ?1 OR content LIKE ?1 \
             ORDER BY score DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![pattern, k as i64], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    pub fn delete_node(&self, id: &str) -> Result<()> {
        self.transaction(|tx| {
            tx.execute("DELETE FROM node_labels WHERE node_id = ?1", [id])?;
            tx.execute("DELETE FROM nodes WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Rewires every edge endpoint from `old_id` to `new_id`, used by sleep's
    /// DEDUP phase when merging a duplicate into the older node (§4.8 step 1).
    /// Edges that would become self-loops or duplicate an existing edge are
    /// dropped rather than violating edge uniqueness.
    pub fn rewire_edges(&self, old_id: &str, new_id: &str) -> Result<usize> {
        self.transaction(|tx| {
            let mut moved = 0usize;
            let mut stmt = tx.prepare("SELECT from_id, to_id, type, weight FROM edges WHERE from_id = ?1 OR to_id = ?1")?;
            let rows: Vec<(String, String, String, f64)> = stmt
                .query_map([old_id], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<rusqlite::Result<_>>()?;
            drop(stmt);
            for (from, to, etype, weight) in rows {
                let new_from = if from == old_id { new_id } else { from.as_str() };
                let new_to = if to == old_id { new_id } else { to.as_str() };
                if new_from == new_to {
                    continue;
                }
                if let Some(edge_type) = EdgeType::parse(&etype) {
                    let edge = Edge::new(new_from, new_to, edge_type).with_weight(weight as f32);
                    add_edge_tx(tx, &edge)?;
                    moved += 1;
                }
            }
            tx.execute("DELETE FROM edges WHERE from_id = ?1 OR to_id = ?1", [old_id])?;
            Ok(moved)
        })
    }

    /// Physical deletion of nodes labeled `Archived` for at least
    /// `older_than_days` (§9 Open Question a: explicit, never automatic).
    pub fn prune_archived(&self, older_than_days: i64) -> Result<usize> {
        let cutoff = (Utc::now() - chrono::Duration::days(older_than_days)).to_rfc3339();
        self.transaction(|tx| {
            let mut stmt = tx.prepare(
                "SELECT n.id FROM nodes n JOIN node_labels l ON l.node_id = n.id \
                 WHERE l.label = 'Archived' AND n.updated_at < ?1",
            )?;
            let ids: Vec<String> = stmt.query_map([&cutoff], |row| row.get(0))?.collect::<rusqlite::Result<_>>()?;
            drop(stmt);
            for id in &ids {
                tx.execute("DELETE FROM node_labels WHERE node_id = ?1", [id])?;
                tx.execute("DELETE FROM edges WHERE from_id = ?1 OR to_id = ?1", [id])?;
                tx.execute("DELETE FROM nodes WHERE id = ?1", [id])?;
            }
            Ok(ids.len())
        })
    }
}

fn upsert_node_tx(
    tx: &Transaction,
    id: &str,
    title: &str,
    content: &str,
    labels: &BTreeSet<String>,
    properties: &Properties,
    labels_replace: bool,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let existing = get_node_tx(tx, id)?;

    let merged_props = if let Some(existing) = &existing {
        let mut merged = existing.properties.clone();
        for (k, v) in properties {
            merged.insert(k.clone(), v.clone());
        }
        merged
    } else {
        properties.clone()
    };

    let props_json = serde_json::to_string(&merged_props)?;

    if existing.is_some() {
        tx.execute(
            "UPDATE nodes SET title = ?1, content = ?2, properties_json = ?3, updated_at = ?4 WHERE id = ?5",
            params![title, content, props_json, now, id],
        )?;
    } else {
        tx.execute(
            "INSERT INTO nodes(id, title, content, created_at, updated_at, properties_json) \
             VALUES (?1, ?2, ?3, ?4, ?4, ?5)",
            params![id, title, content, now, props_json],
        )?;
    }

    if labels_replace {
        tx.execute("DELETE FROM node_labels WHERE node_id = ?1", [id])?;
    }
    for label in labels {
        tx.execute(
            "INSERT OR IGNORE INTO node_labels(node_id, label) VALUES (?1, ?2)",
            params![id, label],
        )?;
    }
    Ok(())
}

fn add_edge_tx(tx: &Transaction, edge: &Edge) -> Result<()> {
    let existing: Option<(f64, String)> = tx
        .query_row(
            "SELECT weight, created_at FROM edges WHERE from_id = ?1 AND to_id = ?2 AND type = ?3",
            params![edge.from_id, edge.to_id, edge.edge_type.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let now = edge.last_accessed.to_rfc3339();
    match existing {
        Some((old_weight, created_at)) => {
            let new_weight = old_weight.max(edge.weight as f64);
            tx.execute(
                "UPDATE edges SET weight = ?1, last_accessed = ?2 WHERE from_id = ?3 AND to_id = ?4 AND type = ?5",
                params![new_weight, now, edge.from_id, edge.to_id, edge.edge_type.as_str()],
            )?;
            let _ = created_at;
        }
        None => {
            tx.execute(
                "INSERT INTO edges(from_id, to_id, type, weight, created_at, last_accessed) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    edge.from_id,
                    edge.to_id,
                    edge.edge_type.as_str(),
                    edge.weight as f64,
                    edge.created_at.to_rfc3339()
                ],
            )?;
        }
    }
    Ok(())
}

fn get_node_tx(conn: &Connection, id: &str) -> Result<Option<Node>> {
    let row: Option<(String, String, String, String, String, String)> = conn
        .query_row(
            "SELECT id, title, content, created_at, updated_at, properties_json FROM nodes WHERE id = ?1",
            [id],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .optional()?;

    let Some((id, title, content, created_at, updated_at, props_json)) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare("SELECT label FROM node_labels WHERE node_id = ?1")?;
    let labels: BTreeSet<String> = stmt
        .query_map([&id], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;

    Ok(Some(Node {
        id,
        title,
        content,
        labels,
        properties: serde_json::from_str(&props_json).unwrap_or_default(),
        created_at: parse_ts(&created_at),
        updated_at: parse_ts(&updated_at),
    }))
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// FTS5 MATCH treats punctuation specially; a query containing it as a raw
/// phrase degrades to no-results instead of an error, so we quote it.
fn escape_fts_query(query: &str) -> String {
    format!("\"{}\"", query.replace('"', "\"\""))
}

#[cfg(unix)]
fn set_owner_only_dir(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = fs::metadata(path) {
        let mut perms = meta.permissions();
        perms.set_mode(0o700);
        let _ = fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn set_owner_only_dir(_path: &Path) {}

#[cfg(unix)]
fn set_owner_only_file(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = fs::metadata(path) {
        let mut perms = meta.permissions();
        perms.set_mode(0o600);
        let _ = fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn set_owner_only_file(_path: &Path) {}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::InvariantViolation(format!("malformed properties JSON: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn upsert_then_get_roundtrips() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_node("n1", "Title", "Body", &labels(&["Concept"]), &Properties::new(), false)
            .unwrap();
        let node = store.get_node("n1").unwrap().unwrap();
        assert_eq!(node.title, "Title");
        assert_eq!(node.content, "Body");
        assert!(node.labels.contains("Concept"));
    }

    #[test]
    fn upsert_is_idempotent_and_unions_labels() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_node("n1", "T", "C", &labels(&["Concept"]), &Properties::new(), false)
            .unwrap();
        store
            .upsert_node("n1", "T", "C2", &labels(&["Glossary"]), &Properties::new(), false)
            .unwrap();
        let node = store.get_node("n1").unwrap().unwrap();
        assert_eq!(node.content, "C2");
        assert!(node.labels.contains("Concept"));
        assert!(node.labels.contains("Glossary"));
        assert_eq!(store.all_node_ids().unwrap().len(), 1);
    }

    #[test]
    fn upsert_rejects_empty_labels() {
        let store = Store::open_in_memory().unwrap();
        let err = store.upsert_node("n1", "T", "C", &BTreeSet::new(), &Properties::new(), false);
        assert!(matches!(err, Err(StoreError::InvariantViolation(_))));
    }

    #[test]
    fn add_edge_merges_by_max_weight() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_node("a", "A", "a", &labels(&["Concept"]), &Properties::new(), false).unwrap();
        store.upsert_node("b", "B", "b", &labels(&["Concept"]), &Properties::new(), false).unwrap();
        store.add_edge(&Edge::new("a", "b", EdgeType::RelatedTo).with_weight(0.3)).unwrap();
        store.add_edge(&Edge::new("a", "b", EdgeType::RelatedTo).with_weight(0.9)).unwrap();
        let neighbors = store.neighbors("a", Direction::Outgoing, None).unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].2, 0.9);
    }

    #[test]
    fn find_by_property_matches_json_value() {
        let store = Store::open_in_memory().unwrap();
        let mut props = Properties::new();
        props.insert("commit_hash".into(), json!("abc123"));
        store.upsert_node("c1", "feat: x", "body", &labels(&["Episode", "Commit"]), &props, false).unwrap();
        let found = store.find_by_property("commit_hash", &json!("abc123")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "c1");
    }

    #[test]
    fn keyword_search_finds_title_substring() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_node("n1", "Use an embedded store", "discussion", &labels(&["Decision"]), &Properties::new(), false).unwrap();
        let hits = store.keyword_search("embedded store", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "n1");
        assert_eq!(hits[0].1, 1.0);
    }

    #[test]
    fn rewire_edges_moves_endpoints_and_drops_self_loops() {
        let store = Store::open_in_memory().unwrap();
        for id in ["old", "new", "other"] {
            store.upsert_node(id, id, id, &labels(&["Concept"]), &Properties::new(), false).unwrap();
        }
        store.add_edge(&Edge::new("old", "other", EdgeType::RelatedTo)).unwrap();
        store.add_edge(&Edge::new("other", "old", EdgeType::RelatedTo)).unwrap();
        store.add_edge(&Edge::new("old", "new", EdgeType::RelatedTo)).unwrap();
        let moved = store.rewire_edges("old", "new").unwrap();
        // old->other becomes new->other; other->old becomes other->new;
        // old->new would become new->new and is dropped.
        assert_eq!(moved, 2);
        let out = store.neighbors("new", Direction::Both, None).unwrap();
        assert!(out.iter().any(|(id, _, _)| id == "other"));
    }

    #[test]
    fn get_edge_returns_none_when_absent() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_edge("a", "b", EdgeType::RelatedTo).unwrap().is_none());
    }

    #[test]
    fn prune_archived_removes_old_archived_nodes_only() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_node("n1", "T", "C", &labels(&["Concept", "Archived"]), &Properties::new(), false).unwrap();
        store.upsert_node("n2", "T2", "C2", &labels(&["Concept"]), &Properties::new(), false).unwrap();
        let pruned = store.prune_archived(-1).unwrap();
        assert_eq!(pruned, 1);
        assert!(store.get_node("n1").unwrap().is_none());
        assert!(store.get_node("n2").unwrap().is_some());
    }
}
