// spiderexpress-core/src/infrastructure/config/layer.rs
//
// Per-layer configuration (§4.7): connector/sampler bindings are
// single-key maps (`{connector_name: {..cfg..}}`) so the bound plug-in
// name and its configuration dictionary travel together.

use crate::domain::aggregator::{AggregationFn, AggregationSpec};
use crate::domain::router::RouterSpec;
use crate::domain::ColumnType;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LayerConfig {
    pub connector: HashMap<String, JsonValue>,

    #[serde(default)]
    pub routers: Vec<RouterSpec>,

    pub sampler: HashMap<String, JsonValue>,

    #[serde(default)]
    pub eager: bool,

    #[serde(default)]
    pub edge_raw_table: TableSchema,

    #[serde(default)]
    pub edge_agg_table: TableSchema,

    #[serde(default)]
    pub node_table: TableSchema,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TableSchema {
    #[serde(default)]
    pub columns: HashMap<String, ColumnType>,

    /// `<column>: <sum|min|max|avg|count>` (§4.3). Only meaningful on
    /// `edge_agg_table`; empty on `edge_raw_table`/`node_table`.
    #[serde(default)]
    pub aggregations: HashMap<String, AggregationFn>,
}

impl TableSchema {
    pub fn aggregation_specs(&self) -> Vec<AggregationSpec> {
        self.aggregations
            .iter()
            .map(|(column, function)| AggregationSpec {
                column: column.clone(),
                function: *function,
            })
            .collect()
    }
}

/// A plug-in binding is required to name exactly one registered plug-in;
/// zero or many keys is a configuration error caught at validation time.
pub fn single_binding(bindings: &HashMap<String, JsonValue>) -> Option<(&str, &JsonValue)> {
    if bindings.len() != 1 {
        return None;
    }
    bindings.iter().next().map(|(k, v)| (k.as_str(), v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_binding_rejects_ambiguous_maps() {
        let mut map = HashMap::new();
        map.insert("random".to_string(), serde_json::json!({}));
        map.insert("snowball".to_string(), serde_json::json!({}));
        assert!(single_binding(&map).is_none());
    }

    #[test]
    fn single_binding_resolves_the_one_entry() {
        let mut map = HashMap::new();
        map.insert("random".to_string(), serde_json::json!({"sample_size": 2}));
        let (name, cfg) = single_binding(&map).unwrap();
        assert_eq!(name, "random");
        assert_eq!(cfg["sample_size"], 2);
    }
}
