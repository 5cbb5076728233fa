// spiderexpress-core/src/ports/store.rs
//
// The durable, table-oriented storage contract (§4.1). Application code
// depends on this trait, never on the concrete engine, so the DuckDB
// adapter in `infrastructure::store` can be swapped without touching the
// controller.

use crate::domain::ids::LayerName;
use crate::domain::model::{AggregatedEdge, AppState, Node, RawEdge, Seed, SeedStatus, StrategyStateRow};
use crate::domain::{ColumnType, NodeId};
use crate::error::SpiderError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::HashMap;

/// The sparse (sampled) and dense (all observed) rows for one layer,
/// as returned by `read_layer_frame` (§4.1).
#[derive(Debug, Clone, Default)]
pub struct LayerFrame {
    pub edges: Vec<AggregatedEdge>,
    pub nodes: Vec<Node>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// `column_types` is the layer's declared `node_table.columns` (§3):
    /// a column is created `BIGINT` or `VARCHAR` accordingly the first
    /// time it's seen, rather than defaulting every user column to text.
    async fn upsert_nodes(
        &self,
        layer: &LayerName,
        rows: &[Node],
        column_types: &HashMap<String, ColumnType>,
    ) -> Result<(), SpiderError>;

    async fn append_raw_edges(
        &self,
        layer: &LayerName,
        rows: &[RawEdge],
        column_types: &HashMap<String, ColumnType>,
    ) -> Result<(), SpiderError>;

    async fn upsert_aggregated_edges(
        &self,
        layer: &LayerName,
        rows: &[AggregatedEdge],
        column_types: &HashMap<String, ColumnType>,
    ) -> Result<(), SpiderError>;

    /// Idempotent: a (layer,id) already `pending` or `done` is dropped
    /// silently (Testable Property 1).
    async fn enqueue_seeds(
        &self,
        layer: &LayerName,
        ids: &[NodeId],
        iteration: u64,
    ) -> Result<(), SpiderError>;

    async fn claim_next_seed_batch(
        &self,
        layer: &LayerName,
        n: usize,
    ) -> Result<Vec<Seed>, SpiderError>;

    async fn complete_seed(
        &self,
        layer: &LayerName,
        id: &NodeId,
        status: SeedStatus,
    ) -> Result<(), SpiderError>;

    async fn pending_count(&self, layer: &LayerName) -> Result<usize, SpiderError>;

    async fn all_raw_edges(&self, layer: &LayerName) -> Result<Vec<RawEdge>, SpiderError>;

    async fn read_layer_frame(&self, layer: &LayerName) -> Result<LayerFrame, SpiderError>;

    async fn known_nodes(&self, layer: &LayerName) -> Result<Vec<NodeId>, SpiderError>;

    async fn load_state(&self) -> Result<Option<AppState>, SpiderError>;

    async fn save_state(&self, state: &AppState) -> Result<(), SpiderError>;

    async fn load_strategy_state(
        &self,
        layer: &LayerName,
        strategy: &str,
    ) -> Result<Vec<StrategyStateRow>, SpiderError>;

    async fn save_strategy_state(
        &self,
        layer: &LayerName,
        strategy: &str,
        rows: &[StrategyStateRow],
    ) -> Result<(), SpiderError>;

    /// Demotes every `processing` seed back to `pending` for the layer —
    /// called on startup to undo an interrupted batch (§8, scenario 6).
    async fn reset_processing_to_pending(&self, layer: &LayerName) -> Result<(), SpiderError>;

    /// Demotes `done` seeds with zero observed raw edges back to `pending`
    /// for one more chance, stamped at `iteration` (§4.6 `retrying`).
    /// Returns how many seeds were requeued.
    async fn requeue_stale_seeds(
        &self,
        layer: &LayerName,
        iteration: u64,
    ) -> Result<usize, SpiderError>;

    /// Scoped acquisition of a transaction (§4.1): every `Store` call made
    /// from within `body` commits together, or none do. `body` is a
    /// pre-built boxed future rather than a generic closure so the trait
    /// stays object-safe for `&dyn Store`; callers build it with
    /// `Box::pin(async move { ... })`. Calls nest by sharing the
    /// outermost scope — a `transaction` invoked while another is already
    /// open joins it instead of opening a second one.
    async fn transaction(
        &self,
        body: BoxFuture<'_, Result<(), SpiderError>>,
    ) -> Result<(), SpiderError>;
}
