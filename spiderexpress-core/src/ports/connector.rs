// spiderexpress-core/src/ports/connector.rs
//
// What the engine needs from a data source, without knowing how it's
// fetched. It's the electrical outlet in the wall: it defines the shape,
// not whether the electricity comes from a REST API, a CSV file, or a
// scraper.

use crate::domain::{NodeId, Record};
use crate::error::SpiderError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// One node observed by a connector call, alongside its record columns.
#[derive(Debug, Clone)]
pub struct ConnectorNode {
    pub name: NodeId,
    pub columns: Record,
}

/// The frame a connector call returns: zero or more edge records (to be
/// routed, §4.2) and zero or more node observations (§4.5).
#[derive(Debug, Clone, Default)]
pub struct ConnectorFrame {
    pub edges: Vec<Record>,
    pub nodes: Vec<ConnectorNode>,
}

/// Contract: `connector(node_ids, configuration) -> ConnectorFrame` (§4.5).
///
/// Implementations are untrusted plug-ins: the adapter in
/// `application::gathering` validates their output before it touches the
/// Store (node rows outside the requested batch are dropped with a
/// warning; column coercion failures become `null`, never a panic).
#[async_trait]
pub trait Connector: Send + Sync {
    /// Stable name this connector is registered under (§6, "plug-in
    /// registration").
    fn name(&self) -> &str;

    /// Fetches data for one batch of requested node identifiers. The
    /// `configuration` is the merged dictionary declared under
    /// `layers.<name>.connector.<conn_name>`.
    async fn fetch(
        &self,
        node_ids: &[NodeId],
        configuration: &JsonValue,
    ) -> Result<ConnectorFrame, SpiderError>;
}
