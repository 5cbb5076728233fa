// spiderexpress-core/src/domain/aggregator.rs
//
// Folds RawEdges into AggregatedEdges per layer (§4.3). Recomputed from
// the *complete* raw edge table for the affected keys every time, never
// incrementally, so re-running aggregation is idempotent (Testable
// Property 3).

use crate::domain::error::DomainError;
use crate::domain::model::{AggregatedEdge, RawEdge};
use crate::domain::value::Value;
use std::collections::HashMap;

/// The only recognized fold functions (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationFn {
    Sum,
    Min,
    Max,
    Avg,
    Count,
}

/// A single `<column>: <function>` declaration from
/// `edge_agg_table.columns`/aggregation config.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AggregationSpec {
    pub column: String,
    pub function: AggregationFn,
}

/// Validates that every declared aggregation is legal before folding:
/// non-numeric columns may only carry `count` (§4.3).
pub fn validate_specs(
    specs: &[AggregationSpec],
    raw_edges: &[RawEdge],
) -> Result<(), DomainError> {
    for spec in specs {
        if spec.function == AggregationFn::Count {
            continue;
        }
        let is_numeric = raw_edges.iter().all(|e| {
            e.columns
                .get(&spec.column)
                .map(|v| matches!(v, Value::Integer(_) | Value::Float(_) | Value::Null))
                .unwrap_or(true)
        });
        if !is_numeric {
            return Err(DomainError::AggregationError {
                column: spec.column.clone(),
                function: format!("{:?}", spec.function).to_lowercase(),
                reason: "non-numeric columns may only use 'count'".into(),
            });
        }
    }
    Ok(())
}

/// Full recomputation of the aggregated edge table from a raw edge
/// multiset, grouped by (source, target, layer).
pub fn aggregate(raw_edges: &[RawEdge], specs: &[AggregationSpec]) -> Vec<AggregatedEdge> {
    let mut groups: HashMap<(String, String, String), Vec<&RawEdge>> = HashMap::new();
    for edge in raw_edges {
        let key = (
            edge.source.as_str().to_string(),
            edge.target.as_str().to_string(),
            edge.layer.as_str().to_string(),
        );
        groups.entry(key).or_default().push(edge);
    }

    let mut out: Vec<AggregatedEdge> = groups
        .into_iter()
        .map(|((source, target, layer), rows)| {
            let weight = rows.len() as u64;
            let mut columns = HashMap::new();
            for spec in specs {
                let value = fold_column(&rows, &spec.column, spec.function);
                columns.insert(spec.column.clone(), value);
            }
            AggregatedEdge {
                source: source.into(),
                target: target.into(),
                layer: layer.into(),
                weight,
                columns,
            }
        })
        .collect();

    // Deterministic ordering for stable output/tests; storage layer keys
    // on (source,target,layer) regardless.
    out.sort_by(|a, b| {
        (a.source.as_str(), a.target.as_str(), a.layer.as_str()).cmp(&(
            b.source.as_str(),
            b.target.as_str(),
            b.layer.as_str(),
        ))
    });
    out
}

fn fold_column(rows: &[&RawEdge], column: &str, function: AggregationFn) -> Value {
    if function == AggregationFn::Count {
        let n = rows.iter().filter(|r| r.columns.contains_key(column)).count();
        return Value::Integer(n as i64);
    }

    let numbers: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.columns.get(column).and_then(Value::as_f64))
        .collect();

    if numbers.is_empty() {
        return Value::Null;
    }

    match function {
        AggregationFn::Sum => Value::Float(numbers.iter().sum()),
        AggregationFn::Min => Value::Float(numbers.iter().cloned().fold(f64::INFINITY, f64::min)),
        AggregationFn::Max => {
            Value::Float(numbers.iter().cloned().fold(f64::NEG_INFINITY, f64::max))
        }
        AggregationFn::Avg => Value::Float(numbers.iter().sum::<f64>() / numbers.len() as f64),
        AggregationFn::Count => unreachable!("handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{LayerName, NodeId};

    fn raw(source: &str, target: &str, layer: &str, views: Option<i64>) -> RawEdge {
        let mut columns = HashMap::new();
        if let Some(v) = views {
            columns.insert("views".to_string(), Value::Integer(v));
        }
        RawEdge {
            source: NodeId::from(source),
            target: NodeId::from(target),
            layer: LayerName::from(layer),
            iteration: 0,
            columns,
        }
    }

    #[test]
    fn weight_is_raw_edge_count_per_key() {
        let edges = vec![
            raw("a", "b", "L", None),
            raw("a", "b", "L", None),
            raw("a", "c", "L", None),
        ];
        let agg = aggregate(&edges, &[]);
        let ab = agg.iter().find(|e| e.target.as_str() == "b").unwrap();
        let ac = agg.iter().find(|e| e.target.as_str() == "c").unwrap();
        assert_eq!(ab.weight, 2);
        assert_eq!(ac.weight, 1);
    }

    #[test]
    fn sum_and_avg_fold_numeric_column() {
        let edges = vec![
            raw("a", "b", "L", Some(10)),
            raw("a", "b", "L", Some(20)),
        ];
        let specs = vec![
            AggregationSpec {
                column: "views".into(),
                function: AggregationFn::Sum,
            },
            AggregationSpec {
                column: "views".into(),
                function: AggregationFn::Avg,
            },
        ];
        let agg = aggregate(&edges, &specs);
        assert_eq!(agg[0].columns.get("views"), Some(&Value::Float(15.0)));
    }

    #[test]
    fn idempotent_recomputation() {
        let edges = vec![
            raw("a", "b", "L", Some(1)),
            raw("a", "b", "L", Some(2)),
            raw("a", "b", "L", Some(3)),
        ];
        let specs = vec![AggregationSpec {
            column: "views".into(),
            function: AggregationFn::Sum,
        }];
        let first = aggregate(&edges, &specs);
        let second = aggregate(&edges, &specs);
        assert_eq!(first, second);
    }

    #[test]
    fn non_numeric_column_rejects_sum() {
        let mut edge = raw("a", "b", "L", None);
        edge.columns
            .insert("label".to_string(), Value::Text("x".into()));
        let specs = vec![AggregationSpec {
            column: "label".into(),
            function: AggregationFn::Sum,
        }];
        let result = validate_specs(&specs, std::slice::from_ref(&edge));
        assert!(result.is_err());
    }
}
