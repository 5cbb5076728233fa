// spiderexpress-core/src/domain/strategies/snowball.rs
//
// No sampling at all (§4.4, "snowball"): every outward edge survives,
// every unique target becomes a new seed. Ordering is deterministic —
// aggregated-table order for edges, first-seen order for seeds — so two
// runs over the same raw data produce the same seed queue (§9).

use crate::domain::model::StrategyStateRow;
use crate::domain::strategies::partition_by_known;
use crate::domain::DomainError;
use crate::ports::strategy::{Strategy, StrategyInput, StrategyOutput};
use rand::rngs::StdRng;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashSet;

#[derive(Debug, Deserialize, Default)]
struct SnowballConfig {
    layer_max_size: Option<usize>,
}

#[derive(Debug, Default)]
pub struct SnowballStrategy;

impl Strategy for SnowballStrategy {
    fn name(&self) -> &str {
        "snowball"
    }

    fn validate(
        &self,
        _configuration: &JsonValue,
        _edges: &[crate::domain::model::AggregatedEdge],
        _nodes: &[crate::domain::model::Node],
    ) -> Result<(), DomainError> {
        Ok(())
    }

    fn sample(&self, input: StrategyInput<'_>, _rng: &mut StdRng) -> StrategyOutput {
        let config: SnowballConfig =
            serde_json::from_value(input.configuration.clone()).unwrap_or_default();
        let (inward, mut outward) = partition_by_known(input.edges, input.known_nodes);

        if let Some(max) = config.layer_max_size {
            outward.truncate(max);
        }

        let mut sampled_edges: Vec<_> = inward.into_iter().cloned().collect();
        sampled_edges.extend(outward.iter().map(|e| (*e).clone()));

        let mut seen = HashSet::new();
        let new_seeds = outward
            .into_iter()
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
    use crate::domain::ids::{LayerName, NodeId};
    use crate::domain::model::AggregatedEdge;
    use std::collections::HashMap;

    fn edge(target: &str) -> AggregatedEdge {
        AggregatedEdge {
            source: NodeId::from("a"),
            target: NodeId::from(target),
            layer: LayerName::from("L"),
            weight: 1,
            columns: HashMap::new(),
        }
    }

    #[test]
    fn every_outward_edge_and_unique_target_survives() {
        let edges = vec![edge("b"), edge("c"), edge("b")];
        let known = HashSet::new();
        let strategy = SnowballStrategy;
        let mut rng = crate::domain::rng::seeded_rng(1);
        let out = strategy.sample(
            StrategyInput {
                edges: &edges,
                nodes: &[],
                known_nodes: &known,
                state: &[],
                configuration: &serde_json::json!({}),
            },
            &mut rng,
        );
        assert_eq!(out.sampled_edges.len(), 3);
        assert_eq!(out.new_seeds, vec![NodeId::from("b"), NodeId::from("c")]);
    }

    #[test]
    fn layer_max_size_truncates_the_outward_set() {
        let edges = vec![edge("b"), edge("c"), edge("d")];
        let known = HashSet::new();
        let strategy = SnowballStrategy;
        let mut rng = crate::domain::rng::seeded_rng(1);
        let out = strategy.sample(
            StrategyInput {
                edges: &edges,
                nodes: &[],
                known_nodes: &known,
                state: &[],
                configuration: &serde_json::json!({"layer_max_size": 2}),
            },
            &mut rng,
        );
        assert_eq!(out.sampled_edges.len(), 2);
        assert_eq!(out.new_seeds, vec![NodeId::from("b"), NodeId::from("c")]);
    }

    #[test]
    fn known_targets_do_not_become_new_seeds() {
        let mut known = HashSet::new();
        known.insert(NodeId::from("b"));
        let edges = vec![edge("b"), edge("c")];
        let strategy = SnowballStrategy;
        let mut rng = crate::domain::rng::seeded_rng(1);
        let out = strategy.sample(
            StrategyInput {
                edges: &edges,
                nodes: &[],
                known_nodes: &known,
                state: &[],
                configuration: &serde_json::json!({}),
            },
            &mut rng,
        );
        assert_eq!(out.new_seeds, vec![NodeId::from("c")]);
    }
}
