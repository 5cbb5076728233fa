// spiderexpress-core/src/infrastructure/store/duckdb_store.rs
//
// The sole Store backend (§4.1, §4.1.bis): an embedded, bundled DuckDB
// database behind a single mutex-guarded writer connection. Per-layer
// tables are created lazily on first write, widened with
// `ALTER TABLE ... ADD COLUMN IF NOT EXISTS` as new user columns appear.
//
// Every operation that writes more than one row runs inside a real
// `BEGIN TRANSACTION` / `COMMIT` / `ROLLBACK` bracket (`begin_scope`,
// `end_scope` below), and `transaction()` lets callers widen that
// bracket across several `Store` calls. Scopes nest by depth counter
// rather than by DuckDB savepoint, since the whole store is already
// serialized behind one writer connection.

use crate::domain::ids::LayerName;
use crate::domain::model::{
    AggregatedEdge, AppState, Node, Phase, RawEdge, Seed, SeedStatus, StrategyStateRow,
};
use crate::domain::value::Value;
use crate::domain::{ColumnType, NodeId};
use crate::error::SpiderError;
use crate::infrastructure::store::value_sql::{ddl_type, from_sql_text_or_int, to_sql_value};
use crate::ports::store::{LayerFrame, Store};
use async_trait::async_trait;
use duckdb::{params, Config, Connection};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Depth counter for nested `transaction`/method-level scopes. Only the
/// outermost scope issues a real `BEGIN`/`COMMIT`/`ROLLBACK`; `failed`
/// latches so an inner scope's error rolls back the whole nest even if
/// an outer scope would otherwise see success.
#[derive(Default)]
struct TxState {
    depth: u32,
    failed: bool,
}

pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
    tx: Mutex<TxState>,
}

impl DuckDbStore {
    /// `db_schema`, when set, namespaces every table this store creates
    /// under that DuckDB schema instead of `main` (§4.1.bis).
    pub fn open(db_url: &str, db_schema: Option<&str>) -> Result<Self, SpiderError> {
        let config = Config::default();
        let conn = if db_url.is_empty() || db_url == ":memory:" {
            Connection::open_in_memory_with_flags(config)
        } else {
            Connection::open_with_flags(db_url, config)
        }
        .map_err(crate::infrastructure::InfrastructureError::Store)?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            tx: Mutex::new(TxState::default()),
        };
        if let Some(schema) = db_schema.filter(|s| !s.is_empty()) {
            let conn = store.lock()?;
            conn.execute_batch(&format!(
                "CREATE SCHEMA IF NOT EXISTS \"{0}\"; SET search_path = '{0}';",
                schema
            ))
            .map_err(crate::infrastructure::InfrastructureError::Store)?;
        }
        store.bootstrap()?;
        Ok(store)
    }

    fn bootstrap(&self) -> Result<(), SpiderError> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE SEQUENCE IF NOT EXISTS seed_seq;
             CREATE TABLE IF NOT EXISTS seeds (
                 seq BIGINT DEFAULT nextval('seed_seq'),
                 layer VARCHAR NOT NULL,
                 node_id VARCHAR NOT NULL,
                 iteration BIGINT NOT NULL,
                 visited_at TIMESTAMP,
                 status VARCHAR NOT NULL
             );
             CREATE TABLE IF NOT EXISTS app_state (
                 iteration BIGINT NOT NULL,
                 max_iteration BIGINT NOT NULL,
                 phase VARCHAR NOT NULL,
                 last_updated TIMESTAMP NOT NULL,
                 random_seed UBIGINT NOT NULL,
                 retry_attempts INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS strategy_state (
                 layer VARCHAR NOT NULL,
                 strategy VARCHAR NOT NULL,
                 payload VARCHAR NOT NULL
             );",
        )
        .map_err(crate::infrastructure::InfrastructureError::Store)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SpiderError> {
        self.conn.lock().map_err(|_| {
            SpiderError::Internal("DuckDB connection mutex was poisoned".to_string())
        })
    }

    fn tx_state(&self) -> Result<std::sync::MutexGuard<'_, TxState>, SpiderError> {
        self.tx
            .lock()
            .map_err(|_| SpiderError::Internal("DuckDB transaction state mutex was poisoned".to_string()))
    }

    /// Opens a transaction scope, issuing `BEGIN TRANSACTION` only when
    /// entering from depth zero. Must be paired with `end_scope`.
    fn begin_scope(&self, conn: &Connection) -> Result<(), SpiderError> {
        let mut state = self.tx_state()?;
        if state.depth == 0 {
            conn.execute_batch("BEGIN TRANSACTION")
                .map_err(crate::infrastructure::InfrastructureError::Store)?;
            state.failed = false;
        }
        state.depth += 1;
        Ok(())
    }

    /// Closes a transaction scope opened by `begin_scope`. `failed` marks
    /// this scope's own work as having errored; the whole nest rolls back
    /// if any scope in it failed, even when closed from the outside in.
    fn end_scope(&self, conn: &Connection, failed: bool) -> Result<(), SpiderError> {
        let mut state = self.tx_state()?;
        if failed {
            state.failed = true;
        }
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            let rollback = state.failed;
            state.failed = false;
            drop(state);
            if rollback {
                conn.execute_batch("ROLLBACK")
                    .map_err(crate::infrastructure::InfrastructureError::Store)?;
            } else {
                conn.execute_batch("COMMIT")
                    .map_err(crate::infrastructure::InfrastructureError::Store)?;
            }
        }
        Ok(())
    }

    fn ensure_table(
        &self,
        conn: &Connection,
        table: &str,
        core_columns: &[(&str, &str)],
        user_columns: &HashMap<String, Value>,
        column_types: &HashMap<String, ColumnType>,
    ) -> Result<(), SpiderError> {
        let core_ddl = core_columns
            .iter()
            .map(|(name, ty)| format!("\"{}\" {}", name, ty))
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute(
            &format!("CREATE TABLE IF NOT EXISTS \"{}\" ({})", table, core_ddl),
            params![],
        )
        .map_err(crate::infrastructure::InfrastructureError::Store)?;

        for column in user_columns.keys() {
            let declared = column_types.get(column).copied().unwrap_or(ColumnType::Text);
            let ty = ddl_type(declared);
            let _ = conn.execute(
                &format!(
                    "ALTER TABLE \"{}\" ADD COLUMN IF NOT EXISTS \"{}\" {}",
                    table, column, ty
                ),
                params![],
            );
        }
        Ok(())
    }

    fn raw_table(layer: &LayerName) -> String {
        format!("raw_edges_{}", layer.as_str())
    }

    fn agg_table(layer: &LayerName) -> String {
        format!("agg_edges_{}", layer.as_str())
    }

    fn node_table(layer: &LayerName) -> String {
        format!("nodes_{}", layer.as_str())
    }

    fn upsert_nodes_inner(
        &self,
        conn: &Connection,
        layer: &LayerName,
        rows: &[Node],
        column_types: &HashMap<String, ColumnType>,
    ) -> Result<(), SpiderError> {
        let table = Self::node_table(layer);
        let all_columns: HashMap<String, Value> = rows
            .iter()
            .flat_map(|n| n.columns.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect();
        self.ensure_table(
            conn,
            &table,
            &[("name", "VARCHAR PRIMARY KEY")],
            &all_columns,
            column_types,
        )?;

        for row in rows {
            conn.execute(
                &format!(
                    "INSERT INTO \"{}\" (name) VALUES (?) ON CONFLICT (name) DO NOTHING",
                    table
                ),
                params![row.name.as_str()],
            )
            .map_err(crate::infrastructure::InfrastructureError::Store)?;

            for (col, value) in &row.columns {
                conn.execute(
                    &format!("UPDATE \"{}\" SET \"{}\" = ? WHERE name = ?", table, col),
                    duckdb::params_from_iter(vec![
                        Box::new(to_sql_value(value)) as Box<dyn duckdb::ToSql>,
                        Box::new(row.name.as_str().to_string()) as Box<dyn duckdb::ToSql>,
                    ]),
                )
                .map_err(crate::infrastructure::InfrastructureError::Store)?;
            }
        }
        Ok(())
    }

    fn append_raw_edges_inner(
        &self,
        conn: &Connection,
        layer: &LayerName,
        rows: &[RawEdge],
        column_types: &HashMap<String, ColumnType>,
    ) -> Result<(), SpiderError> {
        let table = Self::raw_table(layer);
        let all_columns: HashMap<String, Value> = rows
            .iter()
            .flat_map(|e| e.columns.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect();
        self.ensure_table(
            conn,
            &table,
            &[
                ("source", "VARCHAR"),
                ("target", "VARCHAR"),
                ("iteration", "BIGINT"),
            ],
            &all_columns,
            column_types,
        )?;

        for row in rows {
            conn.execute(
                &format!(
                    "INSERT INTO \"{}\" (source, target, iteration) VALUES (?, ?, ?)",
                    table
                ),
                params![row.source.as_str(), row.target.as_str(), row.iteration as i64],
            )
            .map_err(crate::infrastructure::InfrastructureError::Store)?;

            for (col, value) in &row.columns {
                conn.execute(
                    &format!(
                        "UPDATE \"{}\" SET \"{}\" = ? WHERE rowid = (SELECT max(rowid) FROM \"{}\")",
                        table, col, table
                    ),
                    duckdb::params_from_iter(vec![Box::new(to_sql_value(value)) as Box<dyn duckdb::ToSql>]),
                )
                .map_err(crate::infrastructure::InfrastructureError::Store)?;
            }
        }
        Ok(())
    }

    fn upsert_aggregated_edges_inner(
        &self,
        conn: &Connection,
        layer: &LayerName,
        rows: &[AggregatedEdge],
        column_types: &HashMap<String, ColumnType>,
    ) -> Result<(), SpiderError> {
        let table = Self::agg_table(layer);
        let all_columns: HashMap<String, Value> = rows
            .iter()
            .flat_map(|e| e.columns.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect();
        self.ensure_table(
            conn,
            &table,
            &[
                ("source", "VARCHAR"),
                ("target", "VARCHAR"),
                ("weight", "BIGINT"),
            ],
            &all_columns,
            column_types,
        )?;
        conn.execute(
            &format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS \"{}_pk\" ON \"{}\" (source, target)",
                table, table
            ),
            params![],
        )
        .map_err(crate::infrastructure::InfrastructureError::Store)?;

        for row in rows {
            conn.execute(
                &format!(
                    "INSERT INTO \"{}\" (source, target, weight) VALUES (?, ?, ?)
                     ON CONFLICT (source, target) DO UPDATE SET weight = excluded.weight",
                    table
                ),
                params![row.source.as_str(), row.target.as_str(), row.weight as i64],
            )
            .map_err(crate::infrastructure::InfrastructureError::Store)?;

            for (col, value) in &row.columns {
                conn.execute(
                    &format!(
                        "UPDATE \"{}\" SET \"{}\" = ? WHERE source = ? AND target = ?",
                        table, col
                    ),
                    duckdb::params_from_iter(vec![
                        Box::new(to_sql_value(value)) as Box<dyn duckdb::ToSql>,
                        Box::new(row.source.as_str().to_string()) as Box<dyn duckdb::ToSql>,
                        Box::new(row.target.as_str().to_string()) as Box<dyn duckdb::ToSql>,
                    ]),
                )
                .map_err(crate::infrastructure::InfrastructureError::Store)?;
            }
        }
        Ok(())
    }

    fn enqueue_seeds_inner(
        &self,
        conn: &Connection,
        layer: &LayerName,
        ids: &[NodeId],
        iteration: u64,
    ) -> Result<(), SpiderError> {
        for id in ids {
            conn.execute(
                "INSERT INTO seeds (layer, node_id, iteration, visited_at, status)
                 SELECT ?, ?, ?, NULL, 'pending'
                 WHERE NOT EXISTS (
                     SELECT 1 FROM seeds WHERE layer = ? AND node_id = ? AND status IN ('pending','processing','done')
                 )",
                params![
                    layer.as_str(),
                    id.as_str(),
                    iteration as i64,
                    layer.as_str(),
                    id.as_str()
                ],
            )
            .map_err(crate::infrastructure::InfrastructureError::Store)?;
        }
        Ok(())
    }

    fn claim_next_seed_batch_inner(
        &self,
        conn: &Connection,
        layer: &LayerName,
        n: usize,
    ) -> Result<Vec<Seed>, SpiderError> {
        let mut stmt = conn
            .prepare(
                "SELECT node_id, iteration FROM seeds
                 WHERE layer = ? AND status = 'pending'
                 ORDER BY seq ASC LIMIT ?",
            )
            .map_err(crate::infrastructure::InfrastructureError::Store)?;
        let claimed: Vec<(String, i64)> = stmt
            .query_map(params![layer.as_str(), n as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(crate::infrastructure::InfrastructureError::Store)?
            .collect::<Result<_, _>>()
            .map_err(crate::infrastructure::InfrastructureError::Store)?;

        let mut out = Vec::with_capacity(claimed.len());
        for (node_id, iteration) in claimed {
            conn.execute(
                "UPDATE seeds SET status = 'processing' WHERE layer = ? AND node_id = ? AND status = 'pending'",
                params![layer.as_str(), node_id],
            )
            .map_err(crate::infrastructure::InfrastructureError::Store)?;
            out.push(Seed {
                node_id: NodeId::from(node_id.as_str()),
                layer: layer.clone(),
                iteration: iteration as u64,
                visited_at: None,
                status: SeedStatus::Processing,
            });
        }
        Ok(out)
    }

    fn save_state_inner(&self, conn: &Connection, state: &AppState) -> Result<(), SpiderError> {
        conn.execute("DELETE FROM app_state", params![])
            .map_err(crate::infrastructure::InfrastructureError::Store)?;
        conn.execute(
            "INSERT INTO app_state (iteration, max_iteration, phase, last_updated, random_seed, retry_attempts)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                state.iteration as i64,
                state.max_iteration as i64,
                phase_str(state.phase),
                state.last_updated,
                state.random_seed as i64,
                state.retry_attempts as i32,
            ],
        )
        .map_err(crate::infrastructure::InfrastructureError::Store)?;
        Ok(())
    }

    fn save_strategy_state_inner(
        &self,
        conn: &Connection,
        layer: &LayerName,
        strategy: &str,
        rows: &[StrategyStateRow],
    ) -> Result<(), SpiderError> {
        conn.execute(
            "DELETE FROM strategy_state WHERE layer = ? AND strategy = ?",
            params![layer.as_str(), strategy],
        )
        .map_err(crate::infrastructure::InfrastructureError::Store)?;
        for row in rows {
            let payload = serde_json::to_string(&row.payload)
                .map_err(crate::infrastructure::InfrastructureError::JsonError)?;
            conn.execute(
                "INSERT INTO strategy_state (layer, strategy, payload) VALUES (?, ?, ?)",
                params![layer.as_str(), strategy, payload],
            )
            .map_err(crate::infrastructure::InfrastructureError::Store)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for DuckDbStore {
    async fn upsert_nodes(
        &self,
        layer: &LayerName,
        rows: &[Node],
        column_types: &HashMap<String, ColumnType>,
    ) -> Result<(), SpiderError> {
        if rows.is_empty() {
            return Ok(());
        }
        let conn = self.lock()?;
        self.begin_scope(&conn)?;
        let result = self.upsert_nodes_inner(&conn, layer, rows, column_types);
        self.end_scope(&conn, result.is_err())?;
        result
    }

    async fn append_raw_edges(
        &self,
        layer: &LayerName,
        rows: &[RawEdge],
        column_types: &HashMap<String, ColumnType>,
    ) -> Result<(), SpiderError> {
        if rows.is_empty() {
            return Ok(());
        }
        let conn = self.lock()?;
        self.begin_scope(&conn)?;
        let result = self.append_raw_edges_inner(&conn, layer, rows, column_types);
        self.end_scope(&conn, result.is_err())?;
        result
    }

    async fn upsert_aggregated_edges(
        &self,
        layer: &LayerName,
        rows: &[AggregatedEdge],
        column_types: &HashMap<String, ColumnType>,
    ) -> Result<(), SpiderError> {
        if rows.is_empty() {
            return Ok(());
        }
        let conn = self.lock()?;
        self.begin_scope(&conn)?;
        let result = self.upsert_aggregated_edges_inner(&conn, layer, rows, column_types);
        self.end_scope(&conn, result.is_err())?;
        result
    }

    async fn enqueue_seeds(
        &self,
        layer: &LayerName,
        ids: &[NodeId],
        iteration: u64,
    ) -> Result<(), SpiderError> {
        let conn = self.lock()?;
        self.begin_scope(&conn)?;
        let result = self.enqueue_seeds_inner(&conn, layer, ids, iteration);
        self.end_scope(&conn, result.is_err())?;
        result
    }

    async fn claim_next_seed_batch(
        &self,
        layer: &LayerName,
        n: usize,
    ) -> Result<Vec<Seed>, SpiderError> {
        let conn = self.lock()?;
        self.begin_scope(&conn)?;
        let result = self.claim_next_seed_batch_inner(&conn, layer, n);
        self.end_scope(&conn, result.is_err())?;
        result
    }

    async fn complete_seed(
        &self,
        layer: &LayerName,
        id: &NodeId,
        status: SeedStatus,
    ) -> Result<(), SpiderError> {
        let conn = self.lock()?;
        let status_str = match status {
            SeedStatus::Pending => "pending",
            SeedStatus::Processing => "processing",
            SeedStatus::Done => "done",
            SeedStatus::Failed => "failed",
        };
        conn.execute(
            "UPDATE seeds SET status = ?, visited_at = now()
             WHERE layer = ? AND node_id = ? AND status = 'processing'",
            params![status_str, layer.as_str(), id.as_str()],
        )
        .map_err(crate::infrastructure::InfrastructureError::Store)?;
        Ok(())
    }

    async fn pending_count(&self, layer: &LayerName) -> Result<usize, SpiderError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT count(*) FROM seeds WHERE layer = ? AND status = 'pending'",
                params![layer.as_str()],
                |row| row.get(0),
            )
            .map_err(crate::infrastructure::InfrastructureError::Store)?;
        Ok(count as usize)
    }

    async fn all_raw_edges(&self, layer: &LayerName) -> Result<Vec<RawEdge>, SpiderError> {
        let conn = self.lock()?;
        let table = Self::raw_table(layer);
        if !table_exists(&conn, &table)? {
            return Ok(Vec::new());
        }
        let core = ["source", "target", "iteration"];
        let columns = table_columns(&conn, &table)?;
        let extra: Vec<&String> = columns.iter().filter(|c| !core.contains(&c.as_str())).collect();

        let select_list = columns
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM \"{}\"", select_list, table))
            .map_err(crate::infrastructure::InfrastructureError::Store)?;

        let rows = stmt
            .query_map(params![], |row| {
                let source: String = row.get(0)?;
                let target: String = row.get(1)?;
                let iteration: i64 = row.get(2)?;
                let mut cols = HashMap::new();
                for (idx, name) in extra.iter().enumerate() {
                    let v: duckdb::types::Value = row.get(idx + 3)?;
                    cols.insert((*name).clone(), from_sql_text_or_int(&v));
                }
                Ok(RawEdge {
                    source: NodeId::from(source.as_str()),
                    target: NodeId::from(target.as_str()),
                    layer: layer.clone(),
                    iteration: iteration as u64,
                    columns: cols,
                })
            })
            .map_err(crate::infrastructure::InfrastructureError::Store)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(crate::infrastructure::InfrastructureError::Store)?;
        Ok(rows)
    }

    async fn read_layer_frame(&self, layer: &LayerName) -> Result<LayerFrame, SpiderError> {
        let conn = self.lock()?;
        let edges_table = Self::agg_table(layer);
        let nodes_table = Self::node_table(layer);

        let mut edges = Vec::new();
        if table_exists(&conn, &edges_table)? {
            let columns = table_columns(&conn, &edges_table)?;
            let core = ["source", "target", "weight"];
            let extra: Vec<&String> = columns.iter().filter(|c| !core.contains(&c.as_str())).collect();
            let select_list = columns
                .iter()
                .map(|c| format!("\"{}\"", c))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = conn
                .prepare(&format!("SELECT {} FROM \"{}\"", select_list, edges_table))
                .map_err(crate::infrastructure::InfrastructureError::Store)?;
            edges = stmt
                .query_map(params![], |row| {
                    let source: String = row.get(0)?;
                    let target: String = row.get(1)?;
                    let weight: i64 = row.get(2)?;
                    let mut cols = HashMap::new();
                    for (idx, name) in extra.iter().enumerate() {
                        let v: duckdb::types::Value = row.get(idx + 3)?;
                        cols.insert((*name).clone(), from_sql_text_or_int(&v));
                    }
                    Ok(AggregatedEdge {
                        source: NodeId::from(source.as_str()),
                        target: NodeId::from(target.as_str()),
                        layer: layer.clone(),
                        weight: weight as u64,
                        columns: cols,
                    })
                })
                .map_err(crate::infrastructure::InfrastructureError::Store)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(crate::infrastructure::InfrastructureError::Store)?;
        }

        let mut nodes = Vec::new();
        if table_exists(&conn, &nodes_table)? {
            let columns = table_columns(&conn, &nodes_table)?;
            let extra: Vec<&String> = columns.iter().filter(|c| c.as_str() != "name").collect();
            let select_list = columns
                .iter()
                .map(|c| format!("\"{}\"", c))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = conn
                .prepare(&format!("SELECT {} FROM \"{}\"", select_list, nodes_table))
                .map_err(crate::infrastructure::InfrastructureError::Store)?;
            nodes = stmt
                .query_map(params![], |row| {
                    let name: String = row.get(0)?;
                    let mut cols = HashMap::new();
                    for (idx, colname) in extra.iter().enumerate() {
                        let v: duckdb::types::Value = row.get(idx + 1)?;
                        cols.insert((*colname).clone(), from_sql_text_or_int(&v));
                    }
                    Ok(Node {
                        name: NodeId::from(name.as_str()),
                        layer: layer.clone(),
                        columns: cols,
                    })
                })
                .map_err(crate::infrastructure::InfrastructureError::Store)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(crate::infrastructure::InfrastructureError::Store)?;
        }

        Ok(LayerFrame { edges, nodes })
    }

    async fn known_nodes(&self, layer: &LayerName) -> Result<Vec<NodeId>, SpiderError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT node_id FROM seeds WHERE layer = ? AND status = 'done'")
            .map_err(crate::infrastructure::InfrastructureError::Store)?;
        let rows = stmt
            .query_map(params![layer.as_str()], |row| row.get::<_, String>(0))
            .map_err(crate::infrastructure::InfrastructureError::Store)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(crate::infrastructure::InfrastructureError::Store)?;
        Ok(rows.into_iter().map(|s| NodeId::from(s.as_str())).collect())
    }

    async fn load_state(&self) -> Result<Option<AppState>, SpiderError> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT iteration, max_iteration, phase, last_updated, random_seed, retry_attempts FROM app_state LIMIT 1",
            params![],
            |row| {
                let phase_str: String = row.get(2)?;
                let phase = parse_phase(&phase_str);
                Ok(AppState {
                    iteration: row.get::<_, i64>(0)? as u64,
                    max_iteration: row.get::<_, i64>(1)? as u64,
                    phase,
                    last_updated: row.get(3)?,
                    random_seed: row.get::<_, i64>(4)? as u64,
                    retry_attempts: row.get::<_, i32>(5)? as u32,
                })
            },
        );
        match result {
            Ok(state) => Ok(Some(state)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(crate::infrastructure::InfrastructureError::Store(e).into()),
        }
    }

    async fn save_state(&self, state: &AppState) -> Result<(), SpiderError> {
        let conn = self.lock()?;
        self.begin_scope(&conn)?;
        let result = self.save_state_inner(&conn, state);
        self.end_scope(&conn, result.is_err())?;
        result
    }

    async fn load_strategy_state(
        &self,
        layer: &LayerName,
        strategy: &str,
    ) -> Result<Vec<StrategyStateRow>, SpiderError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT payload FROM strategy_state WHERE layer = ? AND strategy = ?")
            .map_err(crate::infrastructure::InfrastructureError::Store)?;
        let rows = stmt
            .query_map(params![layer.as_str(), strategy], |row| row.get::<_, String>(0))
            .map_err(crate::infrastructure::InfrastructureError::Store)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(crate::infrastructure::InfrastructureError::Store)?;
        Ok(rows
            .into_iter()
            .filter_map(|payload| serde_json::from_str(&payload).ok())
            .map(|payload| StrategyStateRow {
                layer: layer.clone(),
                strategy: strategy.to_string(),
                payload,
            })
            .collect())
    }

    async fn save_strategy_state(
        &self,
        layer: &LayerName,
        strategy: &str,
        rows: &[StrategyStateRow],
    ) -> Result<(), SpiderError> {
        let conn = self.lock()?;
        self.begin_scope(&conn)?;
        let result = self.save_strategy_state_inner(&conn, layer, strategy, rows);
        self.end_scope(&conn, result.is_err())?;
        result
    }

    async fn reset_processing_to_pending(&self, layer: &LayerName) -> Result<(), SpiderError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE seeds SET status = 'pending' WHERE layer = ? AND status = 'processing'",
            params![layer.as_str()],
        )
        .map_err(crate::infrastructure::InfrastructureError::Store)?;
        Ok(())
    }

    async fn requeue_stale_seeds(
        &self,
        layer: &LayerName,
        iteration: u64,
    ) -> Result<usize, SpiderError> {
        let conn = self.lock()?;
        let raw_table = Self::raw_table(layer);
        if !table_exists(&conn, &raw_table)? {
            // No raw edges observed for this layer at all: every `done`
            // seed is stale.
            let updated = conn
                .execute(
                    "UPDATE seeds SET status = 'pending', iteration = ?
                     WHERE layer = ? AND status = 'done'",
                    params![iteration as i64, layer.as_str()],
                )
                .map_err(crate::infrastructure::InfrastructureError::Store)?;
            return Ok(updated);
        }
        let updated = conn
            .execute(
                &format!(
                    "UPDATE seeds SET status = 'pending', iteration = ?
                     WHERE layer = ? AND status = 'done'
                     AND node_id NOT IN (SELECT DISTINCT source FROM \"{raw_table}\")"
                ),
                params![iteration as i64, layer.as_str()],
            )
            .map_err(crate::infrastructure::InfrastructureError::Store)?;
        Ok(updated)
    }

    async fn transaction(
        &self,
        body: BoxFuture<'_, Result<(), SpiderError>>,
    ) -> Result<(), SpiderError> {
        {
            let conn = self.lock()?;
            self.begin_scope(&conn)?;
        }
        let result = body.await;
        let conn = self.lock()?;
        self.end_scope(&conn, result.is_err())?;
        result
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, SpiderError> {
    let count: i64 = conn
        .query_row(
            "SELECT count(*) FROM information_schema.tables WHERE table_name = ?",
            params![table],
            |row| row.get(0),
        )
        .map_err(crate::infrastructure::InfrastructureError::Store)?;
    Ok(count > 0)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, SpiderError> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info('{}')", table))
        .map_err(crate::infrastructure::InfrastructureError::Store)?;
    let names = stmt
        .query_map(params![], |row| row.get::<_, String>(1))
        .map_err(crate::infrastructure::InfrastructureError::Store)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(crate::infrastructure::InfrastructureError::Store)?;
    Ok(names)
}

fn parse_phase(s: &str) -> Phase {
    match s {
        "starting" => Phase::Starting,
        "gathering" => Phase::Gathering,
        "sampling" => Phase::Sampling,
        "retrying" => Phase::Retrying,
        "stopping" => Phase::Stopping,
        _ => Phase::Idle,
    }
}

fn phase_str(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "idle",
        Phase::Starting => "starting",
        Phase::Gathering => "gathering",
        Phase::Sampling => "sampling",
        Phase::Retrying => "retrying",
        Phase::Stopping => "stopping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn seed_enqueue_is_idempotent() {
        let store = DuckDbStore::open(":memory:", None).unwrap();
        let layer = LayerName::from("L");
        let id = NodeId::from("a");
        store.enqueue_seeds(&layer, &[id.clone()], 0).await.unwrap();
        store.enqueue_seeds(&layer, &[id.clone()], 0).await.unwrap();
        assert_eq!(store.pending_count(&layer).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn claim_batch_transitions_to_processing() {
        let store = DuckDbStore::open(":memory:", None).unwrap();
        let layer = LayerName::from("L");
        store
            .enqueue_seeds(&layer, &[NodeId::from("a"), NodeId::from("b")], 0)
            .await
            .unwrap();
        let claimed = store.claim_next_seed_batch(&layer, 1).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(store.pending_count(&layer).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn app_state_roundtrips() {
        let store = DuckDbStore::open(":memory:", None).unwrap();
        let state = AppState {
            iteration: 2,
            max_iteration: 10,
            phase: Phase::Sampling,
            last_updated: Utc::now(),
            random_seed: 42,
            retry_attempts: 0,
        };
        store.save_state(&state).await.unwrap();
        let loaded = store.load_state().await.unwrap().unwrap();
        assert_eq!(loaded.iteration, 2);
        assert_eq!(loaded.phase, Phase::Sampling);
    }

    #[tokio::test]
    async fn raw_edges_and_aggregation_roundtrip() {
        let store = DuckDbStore::open(":memory:", None).unwrap();
        let layer = LayerName::from("L");
        let mut columns = HashMap::new();
        columns.insert("views".to_string(), Value::Integer(5));
        let edge = RawEdge {
            source: NodeId::from("a"),
            target: NodeId::from("b"),
            layer: layer.clone(),
            iteration: 0,
            columns,
        };
        let mut column_types = HashMap::new();
        column_types.insert("views".to_string(), ColumnType::Integer);
        store.append_raw_edges(&layer, &[edge], &column_types).await.unwrap();
        let rows = store.all_raw_edges(&layer).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source, NodeId::from("a"));
        assert_eq!(rows[0].columns.get("views"), Some(&Value::Integer(5)));
    }

    #[tokio::test]
    async fn requeue_stale_seeds_demotes_done_seeds_with_no_raw_edges() {
        let store = DuckDbStore::open(":memory:", None).unwrap();
        let layer = LayerName::from("L");
        store
            .enqueue_seeds(&layer, &[NodeId::from("a"), NodeId::from("b")], 0)
            .await
            .unwrap();
        store.claim_next_seed_batch(&layer, 2).await.unwrap();
        store
            .complete_seed(&layer, &NodeId::from("a"), SeedStatus::Done)
            .await
            .unwrap();
        store
            .complete_seed(&layer, &NodeId::from("b"), SeedStatus::Done)
            .await
            .unwrap();

        let edge = RawEdge {
            source: NodeId::from("a"),
            target: NodeId::from("z"),
            layer: layer.clone(),
            iteration: 0,
            columns: HashMap::new(),
        };
        store.append_raw_edges(&layer, &[edge], &HashMap::new()).await.unwrap();

        let requeued = store.requeue_stale_seeds(&layer, 1).await.unwrap();
        assert_eq!(requeued, 1);
        assert_eq!(store.pending_count(&layer).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn transaction_rolls_back_every_write_on_error() {
        let store = DuckDbStore::open(":memory:", None).unwrap();
        let layer = LayerName::from("L");

        let result: Result<(), SpiderError> = store
            .transaction(Box::pin(async {
                store
                    .enqueue_seeds(&layer, &[NodeId::from("a")], 0)
                    .await?;
                Err(SpiderError::Internal("forced failure".to_string()))
            }))
            .await;

        assert!(result.is_err());
        assert_eq!(store.pending_count(&layer).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn transaction_commits_every_write_on_success() {
        let store = DuckDbStore::open(":memory:", None).unwrap();
        let layer = LayerName::from("L");

        store
            .transaction(Box::pin(async {
                store
                    .enqueue_seeds(&layer, &[NodeId::from("a"), NodeId::from("b")], 0)
                    .await?;
                store
                    .enqueue_seeds(&layer, &[NodeId::from("c")], 0)
                    .await?;
                Ok(())
            }))
            .await
            .unwrap();

        assert_eq!(store.pending_count(&layer).await.unwrap(), 3);
    }
}
