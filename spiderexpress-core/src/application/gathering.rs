// spiderexpress-core/src/application/gathering.rs
//
// The `gathering` phase-entry action (§4.6): claim a batch of pending
// seeds per layer, invoke the layer's connector, route the returned
// records into typed edges, persist everything, and settle the claimed
// seeds. Layers with pending seeds are dispatched concurrently, bounded
// at a fixed concurrency (§5.bis), the same `futures::stream::iter(...)
// .buffer_unordered(N)` idiom the teacher uses for its own per-layer
// model execution; the single mutex-guarded Store still serializes every
// write underneath.

use crate::domain::ids::LayerName;
use crate::domain::model::{Node, RawEdge, SeedStatus};
use crate::domain::rng::{derive_layer_seed, seeded_rng};
use crate::domain::router::route;
use crate::domain::value::Value;
use crate::domain::NodeId;
use crate::error::SpiderError;
use crate::infrastructure::config::layer::{single_binding, LayerConfig};
use crate::infrastructure::config::ProjectConfig;
use crate::infrastructure::registry::ConnectorRegistry;
use crate::infrastructure::retry::with_retry;
use crate::ports::connector::ConnectorFrame;
use crate::ports::store::Store;
use futures::stream::{self, StreamExt};
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::warn;

/// Layers with pending work run concurrently, but never more than this
/// many at once, so one slow connector cannot starve the others nor
/// overwhelm the single Store writer (§5.bis).
const MAX_CONCURRENT_LAYERS: usize = 8;

/// Outcome of one gathering pass over every layer with a non-empty queue.
#[derive(Debug, Default)]
pub struct GatherOutcome {
    /// Layers that received at least one raw edge this iteration — the
    /// set the `sampling` phase must aggregate over (§4.3 trigger policy).
    pub touched_layers: HashSet<LayerName>,
    /// Whether any claimed seed ended in `failed` this pass.
    pub any_failed: bool,
}

/// Processes exactly one claimed batch per layer that currently has
/// pending seeds, concurrently across layers (§5.bis). Returns `true` if
/// any layer still had pending seeds *before* this pass (so the
/// controller knows whether to loop again or move to `sampling`).
pub async fn run_one_round(
    store: &dyn Store,
    config: &ProjectConfig,
    connectors: &ConnectorRegistry,
    iteration: u64,
    master_seed: u64,
) -> Result<(GatherOutcome, bool), SpiderError> {
    let mut outcome = GatherOutcome::default();
    let mut any_pending_before = false;

    let mut ready_layers = Vec::new();
    for (layer_name, layer_config) in &config.layers {
        let layer = LayerName::from(layer_name.as_str());
        if store.pending_count(&layer).await? > 0 {
            any_pending_before = true;
            ready_layers.push((layer, layer_config));
        }
    }

    let tasks = ready_layers.into_iter().map(|(layer, layer_config)| {
        let layer_for_log = layer.clone();
        async move {
            let result =
                process_layer_batch(store, config, connectors, &layer, layer_config, iteration, master_seed)
                    .await;
            (layer_for_log, result)
        }
    });

    let mut stream = stream::iter(tasks).buffer_unordered(MAX_CONCURRENT_LAYERS);
    while let Some((layer, result)) = stream.next().await {
        let layer_outcome = result?;
        outcome.touched_layers.extend(layer_outcome.touched_layers);
        outcome.any_failed |= layer_outcome.any_failed;
        let _ = &layer;
    }

    Ok((outcome, any_pending_before))
}

async fn process_layer_batch(
    store: &dyn Store,
    config: &ProjectConfig,
    connectors: &ConnectorRegistry,
    layer: &LayerName,
    layer_config: &LayerConfig,
    iteration: u64,
    master_seed: u64,
) -> Result<GatherOutcome, SpiderError> {
    let mut outcome = GatherOutcome::default();
    let mut rng = seeded_rng(derive_layer_seed(master_seed, iteration, layer.as_str()));

    let seeds = store.claim_next_seed_batch(layer, config.batch_size).await?;
    if seeds.is_empty() {
        return Ok(outcome);
    }
    let node_ids: Vec<NodeId> = seeds.iter().map(|s| s.node_id.clone()).collect();

    let (connector_name, connector_cfg) = single_binding(&layer_config.connector)
        .expect("validated at startup: exactly one connector binding");
    let connector = connectors.resolve(connector_name)?;

    let fetch_result = with_retry(&format!("connector:{connector_name}"), &mut rng, || {
        connector.fetch(&node_ids, connector_cfg)
    })
    .await;

    if config.random_wait {
        let millis = rng.random_range(0..2000);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    match fetch_result {
        Ok(frame) => {
            process_frame(
                store,
                config,
                layer,
                layer_config,
                frame,
                &node_ids,
                iteration,
                &mut outcome,
            )
            .await?;
            for id in &node_ids {
                store.complete_seed(layer, id, SeedStatus::Done).await?;
            }
        }
        Err(err) => {
            warn!(layer = %layer.as_str(), %err, batch = node_ids.len(), "batch failed after retry budget exhausted");
            outcome.any_failed = true;
            for id in &node_ids {
                store.complete_seed(layer, id, SeedStatus::Failed).await?;
            }
        }
    }

    Ok(outcome)
}

#[allow(clippy::too_many_arguments)]
async fn process_frame(
    store: &dyn Store,
    config: &ProjectConfig,
    layer: &LayerName,
    layer_config: &LayerConfig,
    frame: ConnectorFrame,
    requested: &[NodeId],
    iteration: u64,
    outcome: &mut GatherOutcome,
) -> Result<(), SpiderError> {
    let requested_set: HashSet<&NodeId> = requested.iter().collect();

    // §4.5: drop node rows outside the requested batch, with a warning.
    let mut nodes = Vec::with_capacity(frame.nodes.len());
    for observed in frame.nodes {
        if !requested_set.contains(&observed.name) {
            warn!(layer = %layer, node = %observed.name, "connector returned a node outside the requested batch; dropping");
            continue;
        }
        let columns = coerce_columns(&observed.columns, &layer_config.node_table.columns);
        nodes.push(Node {
            name: observed.name,
            layer: layer.clone(),
            columns,
        });
    }
    // Route each record; group resulting edges by destination layer,
    // since `dispatch_with` can target a layer other than this one.
    let mut by_layer: HashMap<LayerName, Vec<RawEdge>> = HashMap::new();
    let mut eager_targets: HashMap<LayerName, Vec<NodeId>> = HashMap::new();

    for record in &frame.edges {
        let routed = route(layer, &layer_config.routers, record);
        for edge in routed {
            let dest_schema = if &edge.layer == layer {
                &layer_config.edge_raw_table.columns
            } else {
                config
                    .layers
                    .get(edge.layer.as_str())
                    .map(|l| &l.edge_raw_table.columns)
                    .unwrap_or(&layer_config.edge_raw_table.columns)
            };
            let columns = coerce_columns(&edge.columns, dest_schema);

            let dispatch_or_eager = edge.dispatched || layer_config.eager;
            if dispatch_or_eager {
                eager_targets
                    .entry(edge.layer.clone())
                    .or_default()
                    .push(edge.target.clone());
            }

            by_layer.entry(edge.layer.clone()).or_default().push(RawEdge {
                source: edge.source,
                target: edge.target,
                layer: edge.layer,
                iteration,
                columns,
            });
        }
    }

    // One connector frame's writes commit or roll back together: a crash
    // partway through must not leave nodes persisted without their edges,
    // or edges persisted without the eager seeds they were supposed to
    // enqueue (§4.1).
    store
        .transaction(Box::pin(async {
            if !nodes.is_empty() {
                store
                    .upsert_nodes(layer, &nodes, &layer_config.node_table.columns)
                    .await?;
            }
            for (dest_layer, edges) in &by_layer {
                if edges.is_empty() {
                    continue;
                }
                let dest_schema = config
                    .layers
                    .get(dest_layer.as_str())
                    .map(|l| &l.edge_raw_table.columns)
                    .unwrap_or(&layer_config.edge_raw_table.columns);
                store.append_raw_edges(dest_layer, edges, dest_schema).await?;
            }
            for (dest_layer, targets) in &eager_targets {
                store.enqueue_seeds(dest_layer, targets, iteration).await?;
            }
            Ok(())
        }))
        .await?;

    for (dest_layer, edges) in &by_layer {
        if !edges.is_empty() {
            outcome.touched_layers.insert(dest_layer.clone());
        }
    }

    Ok(())
}

fn coerce_columns(
    raw: &HashMap<String, Value>,
    declared: &HashMap<String, crate::domain::ColumnType>,
) -> HashMap<String, Value> {
    let mut out = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        match declared.get(key) {
            Some(ty) => match value.coerce(*ty) {
                Some(coerced) => {
                    out.insert(key.clone(), coerced);
                }
                None => {
                    warn!(column = %key, "column coercion failed; substituting null");
                    out.insert(key.clone(), Value::Null);
                }
            },
            None => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}
