// spiderexpress-core/src/domain/model.rs

use crate::domain::ids::{LayerName, NodeId};
use crate::domain::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An edge exactly as it came off the connector, before deduplication.
/// Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub layer: LayerName,
    pub iteration: u64,
    #[serde(default)]
    pub columns: HashMap<String, Value>,
}

/// The deduplicated, weighted, (eventually) sampled edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub layer: LayerName,
    pub weight: u64,
    #[serde(default)]
    pub columns: HashMap<String, Value>,
}

/// At most one row per (name, layer); later observations upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: NodeId,
    pub layer: LayerName,
    #[serde(default)]
    pub columns: HashMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    pub node_id: NodeId,
    pub layer: LayerName,
    pub iteration: u64,
    pub visited_at: Option<DateTime<Utc>>,
    pub status: SeedStatus,
}

/// The loop's own state machine phase (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Starting,
    Gathering,
    Sampling,
    Retrying,
    Stopping,
}

/// Exactly one row exists; `iteration` is monotonically non-decreasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub iteration: u64,
    pub max_iteration: u64,
    pub phase: Phase,
    pub last_updated: DateTime<Utc>,
    /// Seeded once (from config or OS entropy) and persisted so resumed
    /// runs reuse the same random stream (§4.4.bis).
    pub random_seed: u64,
    /// How many consecutive `retrying` attempts have been made for the
    /// current iteration.
    pub retry_attempts: u32,
}

impl AppState {
    pub fn new(max_iteration: u64, random_seed: u64) -> Self {
        Self {
            iteration: 0,
            max_iteration,
            phase: Phase::Idle,
            last_updated: Utc::now(),
            random_seed,
            retry_attempts: 0,
        }
    }
}

/// Per-strategy, per-layer opaque state row (§3, §4.4, §9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStateRow {
    pub layer: LayerName,
    pub strategy: String,
    pub payload: serde_json::Value,
}
