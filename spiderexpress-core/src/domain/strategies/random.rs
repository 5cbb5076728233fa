// spiderexpress-core/src/domain/strategies/random.rs
//
// Uniform random sampling without replacement (§4.4, "random"). All
// outward edges are candidates; `sample_size` of their targets are drawn
// uniformly, the rest are discarded for this iteration.

use crate::domain::model::StrategyStateRow;
use crate::domain::strategies::partition_by_known;
use crate::domain::DomainError;
use crate::ports::strategy::{Strategy, StrategyInput, StrategyOutput};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Deserialize)]
struct RandomConfig {
    sample_size: usize,
}

#[derive(Debug, Default)]
pub struct RandomStrategy;

impl Strategy for RandomStrategy {
    fn name(&self) -> &str {
        "random"
    }

    fn validate(
        &self,
        configuration: &JsonValue,
        _edges: &[crate::domain::model::AggregatedEdge],
        _nodes: &[crate::domain::model::Node],
    ) -> Result<(), DomainError> {
        serde_json::from_value::<RandomConfig>(configuration.clone()).map_err(|e| {
            DomainError::ConfigError {
                path: "layers.*.strategy.random".into(),
                message: e.to_string(),
            }
        })?;
        Ok(())
    }

    fn sample(&self, input: StrategyInput<'_>, rng: &mut StdRng) -> StrategyOutput {
        let config: RandomConfig = serde_json::from_value(input.configuration.clone())
            .unwrap_or(RandomConfig { sample_size: 0 });

        let (inward, outward) = partition_by_known(input.edges, input.known_nodes);

        let mut sampled: Vec<_> = outward;
        let take = config.sample_size.min(sampled.len());
        let (chosen, _rest) = sampled.partial_shuffle(rng, take);

        let mut sampled_edges: Vec<_> = inward.into_iter().cloned().collect();
        sampled_edges.extend(chosen.iter().map(|e| (*e).clone()));

        let mut seen = std::collections::HashSet::new();
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
    use crate::domain::ids::{LayerName, NodeId};
    use crate::domain::model::AggregatedEdge;
    use std::collections::{HashMap, HashSet};

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
    fn sample_size_bounds_the_new_seed_count() {
        let edges = vec![edge("b"), edge("c"), edge("d"), edge("e")];
        let known = HashSet::new();
        let config = serde_json::json!({"sample_size": 2});
        let strategy = RandomStrategy;
        let mut rng = crate::domain::rng::seeded_rng(7);
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
        assert_eq!(out.new_seeds.len(), 2);
        assert_eq!(out.sampled_edges.len(), 2);
    }

    #[test]
    fn same_seed_yields_same_sample() {
        let edges = vec![edge("b"), edge("c"), edge("d"), edge("e"), edge("f")];
        let known = HashSet::new();
        let config = serde_json::json!({"sample_size": 3});
        let strategy = RandomStrategy;

        let mut rng_a = crate::domain::rng::seeded_rng(42);
        let out_a = strategy.sample(
            StrategyInput {
                edges: &edges,
                nodes: &[],
                known_nodes: &known,
                state: &[],
                configuration: &config,
            },
            &mut rng_a,
        );
        let mut rng_b = crate::domain::rng::seeded_rng(42);
        let out_b = strategy.sample(
            StrategyInput {
                edges: &edges,
                nodes: &[],
                known_nodes: &known,
                state: &[],
                configuration: &config,
            },
            &mut rng_b,
        );
        assert_eq!(out_a.new_seeds, out_b.new_seeds);
    }

    #[test]
    fn inward_edges_to_known_nodes_always_survive() {
        let mut known = HashSet::new();
        known.insert(NodeId::from("b"));
        let edges = vec![edge("b"), edge("c")];
        let config = serde_json::json!({"sample_size": 0});
        let strategy = RandomStrategy;
        let mut rng = crate::domain::rng::seeded_rng(1);
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
        assert_eq!(out.sampled_edges.len(), 1);
        assert!(out.new_seeds.is_empty());
    }
}
