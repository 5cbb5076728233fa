pub mod random;
pub mod snowball;
pub mod spikyball;

pub use random::RandomStrategy;
pub use snowball::SnowballStrategy;
pub use spikyball::SpikyballStrategy;

use crate::domain::model::AggregatedEdge;
use crate::domain::NodeId;
use std::collections::HashSet;

/// Shared helper: split aggregated edges into inward (target already
/// known) and outward (target not yet visited) per §4.4.
pub(crate) fn partition_by_known<'a>(
    edges: &'a [AggregatedEdge],
    known_nodes: &HashSet<NodeId>,
) -> (Vec<&'a AggregatedEdge>, Vec<&'a AggregatedEdge>) {
    edges
        .iter()
        .partition(|e| known_nodes.contains(&e.target))
}
