use anyhow::Result;
use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::StoreError;
use crate::graph::edge::{EdgeId, EdgeLabel, GraphEdge};
use crate::graph::node::{GraphNode, NodeId, NodeKind, NodeLabel};
use crate::graph::store::{GraphStore, NodePage, PageRequest};

/// Database schema version - increment when schema changes
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Upper bound on pooled connections shared by concurrent retrievals
const POOL_SIZE: u32 = 8;

/// How long a reader waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const NODE_COLUMNS: &str = "id, label, name, table_name, pk";
const EDGE_COLUMNS: &str = "id, label, source_id, target_id, pk";

/// SQL query with parameters, used to avoid SQL injection
struct SafeQuery {
    sql: String,
    params: Vec<Value>,
}

/// SQLite-backed schema graph store
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
    db_path: String,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("pool", &"SQLite connection pool")
            .field("db_path", &self.db_path)
            .finish()
    }
}

impl Database {
    /// Open (or create) the graph database, initializing the schema if needed
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db_path = path.as_ref().to_string_lossy().to_string();
        let manager = SqliteConnectionManager::file(path.as_ref())
            .with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
        let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;

        let db = Self { pool, db_path };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize the database schema if needed
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            [],
        )?;
        conn.execute(
            "INSERT INTO schema_version (version)
             SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM schema_version)",
            [],
        )?;

        apply_migrations(&conn)
    }

    /// Insert or replace nodes and edges in a single transaction.
    ///
    /// Ids are content-derived, so writing the same graph twice leaves the
    /// store unchanged.
    pub fn upsert_all(&self, nodes: &[GraphNode], edges: &[GraphEdge]) -> Result<()> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        for node in nodes {
            tx.execute(
                "INSERT OR REPLACE INTO nodes (id, label, name, name_lower, table_name, pk)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    node.id.as_str(),
                    node.label().as_str(),
                    node.name,
                    node.name.to_lowercase(),
                    node.owning_table(),
                    node.partition_key,
                ],
            )?;
        }

        for edge in edges {
            tx.execute(
                "INSERT OR REPLACE INTO edges (id, label, source_id, target_id, pk)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    edge.id.as_str(),
                    edge.label.as_str(),
                    edge.from.as_str(),
                    edge.to.as_str(),
                    edge.partition_key,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn upsert_nodes(&self, nodes: &[GraphNode]) -> Result<()> {
        self.upsert_all(nodes, &[])
    }

    pub fn node_count(&self) -> Result<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM nodes", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn edge_count(&self) -> Result<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Run a query on a pooled connection off the async runtime
    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {}", e)))?
    }

    async fn query_node_page(&self, filter: SafeQuery, page: PageRequest) -> Result<NodePage, StoreError> {
        let offset = match &page.continuation {
            Some(token) => token
                .parse::<i64>()
                .map_err(|_| StoreError::Query(format!("invalid continuation '{}'", token)))?,
            None => 0,
        };
        let limit = page.limit as i64;

        self.run(move |conn| {
            let sql = format!(
                "SELECT {} FROM nodes WHERE {} ORDER BY id LIMIT ? OFFSET ?",
                NODE_COLUMNS, filter.sql
            );
            let mut params = filter.params;
            // One extra row tells us whether another page exists
            params.push(Value::Integer(limit + 1));
            params.push(Value::Integer(offset));

            let mut nodes = query_nodes(conn, &sql, &params)?;
            let continuation = if nodes.len() as i64 > limit {
                nodes.truncate(limit as usize);
                Some((offset + limit).to_string())
            } else {
                None
            };

            Ok(NodePage {
                nodes,
                continuation,
            })
        })
        .await
    }
}

/// Apply schema migrations as needed
fn apply_migrations(conn: &Connection) -> Result<()> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    if version < 1 {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                name TEXT NOT NULL,
                name_lower TEXT NOT NULL,
                table_name TEXT,
                pk TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS edges (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                pk TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_node_label ON nodes(label);
            CREATE INDEX IF NOT EXISTS idx_node_name ON nodes(name_lower);

            CREATE INDEX IF NOT EXISTS idx_edge_source ON edges(source_id);
            CREATE INDEX IF NOT EXISTS idx_edge_target ON edges(target_id);
            CREATE INDEX IF NOT EXISTS idx_edge_label ON edges(label);",
        )?;

        conn.execute(
            "DELETE FROM schema_version WHERE version < ?",
            [CURRENT_SCHEMA_VERSION],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version) VALUES (?)",
            [CURRENT_SCHEMA_VERSION],
        )?;
    }

    Ok(())
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn text_params<'a>(values: impl Iterator<Item = &'a str>) -> Vec<Value> {
    values.map(|v| Value::Text(v.to_string())).collect()
}

fn node_label_filter(labels: &[NodeLabel]) -> SafeQuery {
    SafeQuery {
        sql: format!("label IN ({})", placeholders(labels.len())),
        params: text_params(labels.iter().map(|l| l.as_str())),
    }
}

/// `label IN (...) AND (instr(name_lower, ?) > 0 OR ...)`
///
/// `name_lower` is folded in Rust at write time; SQLite's `lower()` only
/// folds ASCII.
fn name_contains_filter(tokens: &[String], labels: &[NodeLabel]) -> SafeQuery {
    let mut query = node_label_filter(labels);
    let clauses = vec!["instr(name_lower, ?) > 0"; tokens.len()].join(" OR ");
    query.sql = format!("{} AND ({})", query.sql, clauses);
    query
        .params
        .extend(tokens.iter().map(|t| Value::Text(t.to_lowercase())));
    query
}

type NodeRow = (String, String, String, Option<String>, String);

fn read_node_row(row: &Row) -> rusqlite::Result<NodeRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn query_nodes(conn: &Connection, sql: &str, params: &[Value]) -> Result<Vec<GraphNode>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), read_node_row)?;

    let mut nodes = Vec::new();
    for row in rows {
        let (id, label, name, table_name, pk) = row?;
        let kind = match label.parse::<NodeLabel>() {
            Ok(NodeLabel::Table) => NodeKind::Table,
            Ok(NodeLabel::Column) => NodeKind::Column { table: table_name },
            Err(e) => {
                warn!("Skipping node {}: {}", id, e);
                continue;
            }
        };
        nodes.push(GraphNode {
            id: NodeId(id),
            name,
            kind,
            partition_key: pk,
        });
    }
    Ok(nodes)
}

#[async_trait]
impl GraphStore for Database {
    async fn query_nodes_by_name_contains_any(
        &self,
        tokens: &[String],
        labels: &[NodeLabel],
        page: PageRequest,
    ) -> Result<NodePage, StoreError> {
        if tokens.is_empty() || labels.is_empty() {
            return Ok(NodePage::default());
        }
        self.query_node_page(name_contains_filter(tokens, labels), page)
            .await
    }

    async fn query_all_by_label(
        &self,
        labels: &[NodeLabel],
        page: PageRequest,
    ) -> Result<NodePage, StoreError> {
        if labels.is_empty() {
            return Ok(NodePage::default());
        }
        self.query_node_page(node_label_filter(labels), page).await
    }

    async fn query_nodes_by_id_in(&self, ids: &[NodeId]) -> Result<Vec<GraphNode>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let params = text_params(ids.iter().map(|id| id.as_str()));

        self.run(move |conn| {
            let sql = format!(
                "SELECT {} FROM nodes WHERE id IN ({}) ORDER BY id",
                NODE_COLUMNS,
                placeholders(params.len())
            );
            query_nodes(conn, &sql, &params)
        })
        .await
    }

    async fn query_edges_by_endpoint_in(
        &self,
        ids: &[NodeId],
        labels: &[EdgeLabel],
    ) -> Result<Vec<GraphEdge>, StoreError> {
        if ids.is_empty() || labels.is_empty() {
            return Ok(Vec::new());
        }
        let label_count = labels.len();
        let id_count = ids.len();
        let mut params = text_params(labels.iter().map(|l| l.as_str()));
        let id_params = text_params(ids.iter().map(|id| id.as_str()));
        params.extend(id_params.iter().cloned());
        params.extend(id_params);

        self.run(move |conn| {
            let sql = format!(
                "SELECT {} FROM edges
                 WHERE label IN ({}) AND (source_id IN ({}) OR target_id IN ({}))
                 ORDER BY id",
                EDGE_COLUMNS,
                placeholders(label_count),
                placeholders(id_count),
                placeholders(id_count)
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?;

            let mut edges = Vec::new();
            for row in rows {
                let (id, label, source_id, target_id, pk) = row?;
                let label = label
                    .parse::<EdgeLabel>()
                    .map_err(StoreError::Malformed)?;
                edges.push(GraphEdge {
                    id: EdgeId(id),
                    label,
                    from: NodeId(source_id),
                    to: NodeId(target_id),
                    partition_key: pk,
                });
            }
            Ok(edges)
        })
        .await
    }
}
