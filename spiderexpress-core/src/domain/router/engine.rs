// spiderexpress-core/src/domain/router/engine.rs
//
// Translates one connector record into zero or more typed edges (§4.2).
// Pure, synchronous, deterministic — Testable Property 4 (router
// determinism) depends on this function never consulting wall-clock time,
// RNG, or any other non-deterministic input.

use crate::domain::router::spec::{RouterSpec, TargetSpec, TargetValue};
use crate::domain::value::{Record, Value};
use crate::domain::{LayerName, NodeId};
use regex::Regex;
use std::collections::HashMap;

/// One edge produced by routing, addressed to the layer it should land
/// on (its own layer, or a `dispatch_with` layer).
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEdge {
    pub source: NodeId,
    pub target: NodeId,
    /// The layer this edge is persisted to. Differs from the router's
    /// own layer only for `dispatch_with` targetspecs.
    pub layer: LayerName,
    pub columns: HashMap<String, Value>,
    /// Whether the target should be enqueued as a seed for `layer`
    /// (always true for `dispatch_with`; otherwise governed by the
    /// layer's `eager` flag, applied by the caller).
    pub dispatched: bool,
}

/// Routes a single record against a layer's ordered router specs.
///
/// Emission rules (§4.2):
/// - a record with a missing/empty `source` field is dropped silently;
/// - a targetspec that matches nothing on this record contributes zero
///   edges, not an error;
/// - emission order follows targetspec declaration order, then the order
///   of scalar values within a field.
pub fn route(own_layer: &LayerName, specs: &[RouterSpec], record: &Record) -> Vec<RoutedEdge> {
    let mut edges = Vec::new();

    for spec in specs {
        let Some(source_value) = record.get(&spec.source) else {
            continue;
        };
        if source_value.is_empty() {
            continue;
        }
        let Some(source_text) = source_value.as_text() else {
            continue;
        };
        let source = NodeId::from(source_text);

        let extra_columns = resolve_extra_columns(&spec.extra_columns(), record);

        for targetspec in &spec.target {
            for target in emit_targets(targetspec, record) {
                let dest_layer = targetspec
                    .dispatch_with
                    .as_deref()
                    .map(LayerName::from)
                    .unwrap_or_else(|| own_layer.clone());
                let dispatched = targetspec.dispatch_with.is_some();

                edges.push(RoutedEdge {
                    source: source.clone(),
                    target,
                    layer: dest_layer,
                    columns: extra_columns.clone(),
                    dispatched,
                });
            }
        }
    }

    edges
}

fn resolve_extra_columns(
    extras: &HashMap<String, TargetValue>,
    record: &Record,
) -> HashMap<String, Value> {
    let mut out = HashMap::new();
    for (name, target_value) in extras {
        let resolved = match target_value {
            TargetValue::Literal(v) => v.clone(),
            TargetValue::Field { field } => record.get(field).cloned().unwrap_or(Value::Null),
        };
        out.insert(name.clone(), resolved);
    }
    out
}

fn emit_targets(targetspec: &TargetSpec, record: &Record) -> Vec<NodeId> {
    let Some(field_value) = record.get(&targetspec.field) else {
        return Vec::new();
    };

    let scalars = field_value.scalars();

    match &targetspec.pattern {
        None => scalars
            .into_iter()
            .filter_map(|v| v.as_text())
            .filter(|s| !s.is_empty())
            .map(NodeId::from)
            .collect(),
        Some(pattern) => {
            // A malformed regex is a configuration error surfaced at
            // router-setup validation time (§4.7.bis), not here; at the
            // hot path we treat it as "no matches" to stay total.
            let Ok(re) = Regex::new(pattern) else {
                return Vec::new();
            };
            let mut out = Vec::new();
            for scalar in scalars {
                let Some(text) = scalar.as_text() else {
                    continue;
                };
                for caps in re.captures_iter(text) {
                    if let Some(m) = caps.get(1) {
                        out.push(NodeId::from(m.as_str()));
                    }
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn missing_source_drops_record_silently() {
        let spec = RouterSpec {
            source: "from".into(),
            target: vec![TargetSpec {
                field: "to".into(),
                pattern: None,
                dispatch_with: None,
            }],
            extra_raw: HashMap::new(),
        };
        let rec = record(&[("to", Value::Text("b".into()))]);
        let edges = route(&LayerName::from("L"), &[spec], &rec);
        assert!(edges.is_empty());
    }

    #[test]
    fn field_targetspec_emits_one_edge_per_scalar() {
        let spec = RouterSpec {
            source: "from".into(),
            target: vec![TargetSpec {
                field: "to".into(),
                pattern: None,
                dispatch_with: None,
            }],
            extra_raw: HashMap::new(),
        };
        let rec = record(&[
            ("from", Value::Text("a".into())),
            (
                "to",
                Value::List(vec![Value::Text("b".into()), Value::Text("c".into())]),
            ),
        ]);
        let edges = route(&LayerName::from("L"), &[spec], &rec);
        let targets: Vec<_> = edges.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["b", "c"]);
    }

    /// Scenario 2: record `{from:"a", body:"see @bob and @carol"}` with
    /// router `{source: from, target:[{field: body, pattern:"@(\w+)"}]}`
    /// yields edges `{(a,bob),(a,carol)}` in that order.
    #[test]
    fn regex_targetspec_emits_captures_in_order() {
        let spec = RouterSpec {
            source: "from".into(),
            target: vec![TargetSpec {
                field: "body".into(),
                pattern: Some(r"@(\w+)".into()),
                dispatch_with: None,
            }],
            extra_raw: HashMap::new(),
        };
        let rec = record(&[
            ("from", Value::Text("a".into())),
            ("body", Value::Text("see @bob and @carol".into())),
        ]);
        let edges = route(&LayerName::from("L"), &[spec], &rec);
        let pairs: Vec<_> = edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "bob"), ("a", "carol")]);
    }

    /// Scenario 3: a `dispatch_with: L2` targetspec routes onto L2, not
    /// the router's own layer.
    #[test]
    fn dispatch_with_routes_to_named_layer() {
        let spec = RouterSpec {
            source: "from".into(),
            target: vec![TargetSpec {
                field: "mentions".into(),
                pattern: None,
                dispatch_with: Some("L2".into()),
            }],
            extra_raw: HashMap::new(),
        };
        let rec = record(&[
            ("from", Value::Text("a".into())),
            ("mentions", Value::Text("bob".into())),
        ]);
        let edges = route(&LayerName::from("L1"), &[spec], &rec);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].layer, LayerName::from("L2"));
        assert!(edges[0].dispatched);
    }

    #[test]
    fn no_matching_targetspec_yields_zero_edges_not_error() {
        let spec = RouterSpec {
            source: "from".into(),
            target: vec![TargetSpec {
                field: "body".into(),
                pattern: Some(r"@(\w+)".into()),
                dispatch_with: None,
            }],
            extra_raw: HashMap::new(),
        };
        let rec = record(&[
            ("from", Value::Text("a".into())),
            ("body", Value::Text("no mentions here".into())),
        ]);
        let edges = route(&LayerName::from("L"), &[spec], &rec);
        assert!(edges.is_empty());
    }

    #[test]
    fn extra_columns_copy_field_values_and_numeric_literals() {
        let mut extra_raw = HashMap::new();
        // A bare YAML string names a record field to copy verbatim.
        extra_raw.insert("weight".into(), serde_yaml::Value::String("views".into()));
        // A bare YAML number is always a literal constant (§4.2).
        extra_raw.insert("schema_version".into(), serde_yaml::Value::Number(2.into()));
        let spec = RouterSpec {
            source: "from".into(),
            target: vec![TargetSpec {
                field: "to".into(),
                pattern: None,
                dispatch_with: None,
            }],
            extra_raw,
        };
        let rec = record(&[
            ("from", Value::Text("a".into())),
            ("to", Value::Text("b".into())),
            ("views", Value::Integer(7)),
        ]);
        let edges = route(&LayerName::from("L"), &[spec], &rec);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].columns.get("weight"), Some(&Value::Integer(7)));
        assert_eq!(
            edges[0].columns.get("schema_version"),
            Some(&Value::Integer(2))
        );
    }

    #[test]
    fn determinism_same_input_same_output() {
        let spec = RouterSpec {
            source: "from".into(),
            target: vec![TargetSpec {
                field: "body".into(),
                pattern: Some(r"@(\w+)".into()),
                dispatch_with: None,
            }],
            extra_raw: HashMap::new(),
        };
        let rec = record(&[
            ("from", Value::Text("a".into())),
            ("body", Value::Text("@bob @carol @dave".into())),
        ]);
        let run1 = route(&LayerName::from("L"), &[spec.clone()], &rec);
        let run2 = route(&LayerName::from("L"), &[spec], &rec);
        assert_eq!(run1, run2);
    }
}
