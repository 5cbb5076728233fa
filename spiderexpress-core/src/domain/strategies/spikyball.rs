// spiderexpress-core/src/domain/strategies/spikyball.rs
//
// Weighted random edge sampling (§4.4, "spikyball"). Each outward edge's
// unnormalized weight is
//
//   P = rho_s * sum(w_s[i] * src[i]) + rho_t * sum(w_t[i] * tgt[i]) + rho_e * sum(w_e[i] * edge[i])
//
// over the columns named in `source_node_probability`, `target_node_probability`
// and `edge_probability`. Missing columns (row or node) contribute 0.

use crate::domain::model::{AggregatedEdge, Node, StrategyStateRow};
use crate::domain::strategies::partition_by_known;
use crate::domain::{DomainError, NodeId};
use crate::ports::strategy::{Strategy, StrategyInput, StrategyOutput};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Deserialize)]
struct ProbabilitySpec {
    #[serde(default)]
    rho: f64,
    #[serde(default)]
    weights: HashMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct SpikyballConfig {
    #[serde(default)]
    source_node_probability: ProbabilitySpec,
    #[serde(default)]
    target_node_probability: ProbabilitySpec,
    #[serde(default)]
    edge_probability: ProbabilitySpec,
    layer_max_size: usize,
}

impl Default for ProbabilitySpec {
    fn default() -> Self {
        Self {
            rho: 0.0,
            weights: HashMap::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SpikyballStrategy;

fn weighted_sum(spec: &ProbabilitySpec, columns: &HashMap<String, crate::domain::Value>) -> f64 {
    if spec.rho == 0.0 || spec.weights.is_empty() {
        return 0.0;
    }
    let sum: f64 = spec
        .weights
        .iter()
        .map(|(col, w)| {
            let v = columns
                .get(col)
                .and_then(crate::domain::Value::as_f64)
                .unwrap_or(0.0);
            v * w
        })
        .sum();
    spec.rho * sum
}

fn node_columns<'a>(nodes: &'a [Node], id: &NodeId) -> Option<&'a HashMap<String, crate::domain::Value>> {
    nodes.iter().find(|n| &n.name == id).map(|n| &n.columns)
}

impl Strategy for SpikyballStrategy {
    fn name(&self) -> &str {
        "spikyball"
    }

    fn validate(
        &self,
        configuration: &JsonValue,
        edges: &[AggregatedEdge],
        nodes: &[Node],
    ) -> Result<(), DomainError> {
        let config: SpikyballConfig =
            serde_json::from_value(configuration.clone()).map_err(|e| DomainError::ConfigError {
                path: "layers.*.strategy.spikyball".into(),
                message: e.to_string(),
            })?;

        for col in config.edge_probability.weights.keys() {
            let exists = edges.iter().any(|e| e.columns.contains_key(col));
            if !exists && !edges.is_empty() {
                return Err(DomainError::AggregationError {
                    column: col.clone(),
                    function: "spikyball.edge_probability".into(),
                    reason: "referenced weight column is absent from the edge table".into(),
                });
            }
        }
        for col in config
            .source_node_probability
            .weights
            .keys()
            .chain(config.target_node_probability.weights.keys())
        {
            let exists = nodes.iter().any(|n| n.columns.contains_key(col));
            if !exists && !nodes.is_empty() {
                return Err(DomainError::AggregationError {
                    column: col.clone(),
                    function: "spikyball.node_probability".into(),
                    reason: "referenced weight column is absent from the node table".into(),
                });
            }
        }
        Ok(())
    }

    fn sample(&self, input: StrategyInput<'_>, rng: &mut StdRng) -> StrategyOutput {
        let config: SpikyballConfig = serde_json::from_value(input.configuration.clone())
            .unwrap_or(SpikyballConfig {
                source_node_probability: ProbabilitySpec::default(),
                target_node_probability: ProbabilitySpec::default(),
                edge_probability: ProbabilitySpec::default(),
                layer_max_size: 0,
            });

        let (inward, outward) = partition_by_known(input.edges, input.known_nodes);

        let candidates: Vec<(&AggregatedEdge, f64)> = outward
            .iter()
            .map(|e| {
                let src = node_columns(input.nodes, &e.source)
                    .map(|c| weighted_sum(&config.source_node_probability, c))
                    .unwrap_or(0.0);
                let tgt = node_columns(input.nodes, &e.target)
                    .map(|c| weighted_sum(&config.target_node_probability, c))
                    .unwrap_or(0.0);
                let edge = weighted_sum(&config.edge_probability, &e.columns);
                (*e, (src + tgt + edge).max(0.0))
            })
            .collect();

        let take = config.layer_max_size.min(candidates.len());
        let chosen: Vec<&AggregatedEdge> = if take == 0 {
            Vec::new()
        } else {
            match candidates.choose_multiple_weighted(rng, take, |(_, w)| w.max(f64::MIN_POSITIVE))
            {
                Ok(iter) => iter.map(|(e, _)| *e).collect(),
                Err(_) => {
                    let mut pool: Vec<&AggregatedEdge> = outward.clone();
                    let (picked, _) = pool.partial_shuffle(rng, take);
                    picked.to_vec()
                }
            }
        };

        let mut sampled_edges: Vec<_> = inward.into_iter().cloned().collect();
        sampled_edges.extend(chosen.iter().map(|e| (*e).clone()));

        let mut seen = HashSet::new();
        let new_seeds = chosen
            .iter()
            .map(|e| e.target.clone())
            .filter(|id| seen.insert(id.clone()))
            .collect();

        StrategyOutput {
            new_seeds,
            sampled_edges,
            sampled_nodes: Vec::new(),
            new_state: Vec::<StrategyStateRow>::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::LayerName;
    use std::collections::HashMap as Map;

    fn edge(target: &str, views: i64) -> AggregatedEdge {
        let mut columns = Map::new();
        columns.insert("views".to_string(), crate::domain::Value::Integer(views));
        AggregatedEdge {
            source: NodeId::from("a"),
            target: NodeId::from(target),
            layer: LayerName::from("L"),
            weight: 1,
            columns,
        }
    }

    #[test]
    fn highest_weight_edge_is_chosen_deterministically() {
        let edges = vec![edge("b", 10), edge("c", 0)];
        let known = HashSet::new();
        let config = serde_json::json!({
            "edge_probability": {"rho": 1.0, "weights": {"views": 1.0}},
            "layer_max_size": 1
        });
        let strategy = SpikyballStrategy;
        let mut rng = crate::domain::rng::seeded_rng(3);
        let out = strategy.sample(
            StrategyInput {
                edges: &edges,
                nodes: &[],
                known_nodes: &known,
                state: &[],
                configuration: &config,
            },
            &mut rng,
        );
        assert_eq!(out.new_seeds, vec![NodeId::from("b")]);
    }

    #[test]
    fn validate_rejects_missing_weight_column() {
        let edges = vec![edge("b", 10)];
        let config = serde_json::json!({
            "edge_probability": {"rho": 1.0, "weights": {"missing_col": 1.0}},
            "layer_max_size": 1
        });
        let strategy = SpikyballStrategy;
        let result = strategy.validate(&config, &edges, &[]);
        assert!(result.is_err());
    }
}
