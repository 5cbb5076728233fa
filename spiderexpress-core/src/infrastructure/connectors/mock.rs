// spiderexpress-core/src/infrastructure/connectors/mock.rs
//
// The one in-process connector this crate ships (§1): a deterministic,
// hash-derived neighbor generator. It exists for demos and for the test
// suite — it is not one of the out-of-scope named integrations (CSV,
// Telegram, Twitter), which are left to downstream plug-ins.
//
// Determinism matters here: the same node id always yields the same
// synthetic neighbors and edge columns, with no RNG and no wall clock,
// so a crawl over `mock` is reproducible run to run (Testable Property 5
// depends on every non-Store input being deterministic or seeded).

use crate::domain::value::{Record, Value};
use crate::domain::NodeId;
use crate::error::SpiderError;
use crate::ports::connector::{Connector, ConnectorFrame, ConnectorNode};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Deserialize)]
struct MockConfig {
    #[serde(default = "default_fanout")]
    fanout: usize,
    #[serde(default)]
    salt: String,
}

fn default_fanout() -> usize {
    3
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            fanout: default_fanout(),
            salt: String::new(),
        }
    }
}

pub struct MockConnector;

impl MockConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

/// FNV-1a, chosen over `DefaultHasher` because its output is stable
/// across Rust versions and process runs — `DefaultHasher`'s algorithm
/// is explicitly unspecified and may change.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn neighbors_for(id: &str, salt: &str, fanout: usize) -> Vec<String> {
    (0..fanout)
        .map(|i| {
            let h = fnv1a(format!("{salt}:{id}:{i}").as_bytes());
            format!("n{:06x}", h % 0x1000000)
        })
        .collect()
}

#[async_trait]
impl Connector for MockConnector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        node_ids: &[NodeId],
        configuration: &JsonValue,
    ) -> Result<ConnectorFrame, SpiderError> {
        let config: MockConfig = if configuration.is_null() {
            MockConfig::default()
        } else {
            serde_json::from_value(configuration.clone()).unwrap_or_default()
        };

        let mut edges = Vec::with_capacity(node_ids.len());
        let mut nodes = Vec::with_capacity(node_ids.len());

        for id in node_ids {
            let targets = neighbors_for(id.as_str(), &config.salt, config.fanout);
            let weight = (fnv1a(format!("w:{}", id.as_str()).as_bytes()) % 50) as i64 + 1;

            let mut record: Record = Record::new();
            record.insert("from".to_string(), Value::Text(id.as_str().to_string()));
            record.insert(
                "to".to_string(),
                Value::List(targets.iter().cloned().map(Value::Text).collect()),
            );
            record.insert("views".to_string(), Value::Integer(weight));
            edges.push(record);

            let mut columns = Record::new();
            columns.insert(
                "label".to_string(),
                Value::Text(format!("node-{}", id.as_str())),
            );
            nodes.push(ConnectorNode {
                name: id.clone(),
                columns,
            });
        }

        Ok(ConnectorFrame { edges, nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_node_yields_same_neighbors_across_calls() {
        let connector = MockConnector::new();
        let ids = vec![NodeId::from("alice")];
        let config = serde_json::json!({"fanout": 2});
        let first = connector.fetch(&ids, &config).await.unwrap();
        let second = connector.fetch(&ids, &config).await.unwrap();
        assert_eq!(first.edges, second.edges);
    }

    #[tokio::test]
    async fn fanout_controls_neighbor_count() {
        let connector = MockConnector::new();
        let ids = vec![NodeId::from("bob")];
        let config = serde_json::json!({"fanout": 4});
        let frame = connector.fetch(&ids, &config).await.unwrap();
        let to = frame.edges[0].get("to").unwrap();
        assert_eq!(to.scalars().len(), 4);
    }

    #[tokio::test]
    async fn nodes_are_scoped_to_requested_ids() {
        let connector = MockConnector::new();
        let ids = vec![NodeId::from("a"), NodeId::from("b")];
        let frame = connector.fetch(&ids, &serde_json::json!({})).await.unwrap();
        let names: Vec<_> = frame.nodes.iter().map(|n| n.name.clone()).collect();
        assert_eq!(names, ids);
    }
}
