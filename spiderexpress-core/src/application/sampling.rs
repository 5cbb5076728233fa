// spiderexpress-core/src/application/sampling.rs
//
// The `sampling` phase-entry action (§4.6): for each layer touched this
// iteration, recompute the full aggregation from raw edges, invoke the
// bound strategy, persist what it chose to keep, and enqueue its
// new_seeds for the next iteration.

use crate::domain::aggregator::{aggregate, validate_specs};
use crate::domain::ids::LayerName;
use crate::domain::model::StrategyStateRow;
use crate::domain::rng::{derive_sampling_seed, seeded_rng};
use crate::domain::NodeId;
use crate::error::SpiderError;
use crate::infrastructure::config::layer::single_binding;
use crate::infrastructure::config::ProjectConfig;
use crate::infrastructure::registry::StrategyRegistry;
use crate::ports::store::Store;
use crate::ports::strategy::StrategyInput;
use std::collections::HashSet;

/// Total count of `new_seeds` produced across every sampled layer — the
/// controller uses this to decide `gathering` vs `retrying` (§4.6).
///
/// `iteration` is the round currently being sampled, `master_seed` the
/// crawl's `AppState.random_seed`; each layer re-derives its own RNG from
/// `(master_seed, iteration, layer)` rather than drawing from one shared
/// stream, so a kill-and-resume reproduces the same draws an
/// uninterrupted run would have made for this iteration (§4.4.bis,
/// Testable Property 5) — the same reasoning `gathering`'s
/// `derive_layer_seed` already applies to connector-call jitter.
pub async fn run_sampling_pass(
    store: &dyn Store,
    config: &ProjectConfig,
    strategies: &StrategyRegistry,
    touched_layers: &HashSet<LayerName>,
    iteration: u64,
    next_iteration: u64,
    master_seed: u64,
) -> Result<usize, SpiderError> {
    let mut total_new_seeds = 0;

    for layer_name in touched_layers {
        let layer_config = config
            .layers
            .get(layer_name.as_str())
            .expect("touched layer must be declared in configuration");
        let mut rng = seeded_rng(derive_sampling_seed(master_seed, iteration, layer_name.as_str()));

        let raw_edges = store.all_raw_edges(layer_name).await?;
        let specs = layer_config.edge_agg_table.aggregation_specs();
        validate_specs(&specs, &raw_edges)?;
        let aggregated = aggregate(&raw_edges, &specs);

        let frame = store.read_layer_frame(layer_name).await?;
        let known: Vec<NodeId> = store.known_nodes(layer_name).await?;
        let known_nodes: HashSet<NodeId> = known.into_iter().collect();

        let (strategy_name, strategy_cfg) = single_binding(&layer_config.sampler)
            .expect("validated at startup: exactly one sampler binding");
        let strategy = strategies.resolve(strategy_name)?;

        strategy.validate(strategy_cfg, &aggregated, &frame.nodes)?;

        let state = store.load_strategy_state(layer_name, strategy_name).await?;
        let output = strategy.sample(
            StrategyInput {
                edges: &aggregated,
                nodes: &frame.nodes,
                known_nodes: &known_nodes,
                state: &state,
                configuration: strategy_cfg,
            },
            &mut rng,
        );

        if !output.sampled_edges.is_empty() {
            store
                .upsert_aggregated_edges(layer_name, &output.sampled_edges, &layer_config.edge_agg_table.columns)
                .await?;
        }
        if !output.sampled_nodes.is_empty() {
            store
                .upsert_nodes(layer_name, &output.sampled_nodes, &layer_config.node_table.columns)
                .await?;
        }
        if !output.new_seeds.is_empty() {
            store
                .enqueue_seeds(layer_name, &output.new_seeds, next_iteration)
                .await?;
        }
        let new_state: Vec<StrategyStateRow> = output.new_state;
        store
            .save_strategy_state(layer_name, strategy_name, &new_state)
            .await?;

        total_new_seeds += output.new_seeds.len();
    }

    Ok(total_new_seeds)
}
