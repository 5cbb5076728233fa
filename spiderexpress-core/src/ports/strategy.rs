// spiderexpress-core/src/ports/strategy.rs
//
// The sampler contract (§4.4): a pure function of its inputs, with no
// hidden state beyond what it reads/writes through the declared state
// table. Strategies are synchronous — they never touch I/O, which is what
// lets the controller call them without a transaction boundary of their
// own (the Store transaction wraps the whole `sampling` phase instead).

use crate::domain::model::{AggregatedEdge, Node, StrategyStateRow};
use crate::domain::{DomainError, NodeId};
use rand::rngs::StdRng;
use serde_json::Value as JsonValue;
use std::collections::HashSet;

pub struct StrategyInput<'a> {
    pub edges: &'a [AggregatedEdge],
    pub nodes: &'a [Node],
    pub known_nodes: &'a HashSet<NodeId>,
    pub state: &'a [StrategyStateRow],
    pub configuration: &'a JsonValue,
}

#[derive(Debug, Clone, Default)]
pub struct StrategyOutput {
    pub new_seeds: Vec<NodeId>,
    pub sampled_edges: Vec<AggregatedEdge>,
    pub sampled_nodes: Vec<Node>,
    pub new_state: Vec<StrategyStateRow>,
}

pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Pre-validates that every weight/fold column this strategy's
    /// configuration references actually exists on `edges`/`nodes`,
    /// before `sample` is invoked (§4.4, "the adapter pre-validates").
    fn validate(
        &self,
        configuration: &JsonValue,
        edges: &[AggregatedEdge],
        nodes: &[Node],
    ) -> Result<(), DomainError>;

    fn sample(&self, input: StrategyInput<'_>, rng: &mut StdRng) -> StrategyOutput;
}
