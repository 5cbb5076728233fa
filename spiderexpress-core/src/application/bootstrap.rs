// spiderexpress-core/src/application/bootstrap.rs
//
// The `starting` phase-entry action (§4.6): resolve the configured seed
// source (file takes precedence over inline `seeds`, §4.7) against the
// declared layer set and enqueue everything at iteration 0.

use crate::error::SpiderError;
use crate::infrastructure::config::seeds::load_seed_file;
use crate::infrastructure::config::ProjectConfig;
use crate::ports::store::Store;
use std::path::Path;
use tracing::info;

pub async fn seed_initial_queue(
    store: &dyn Store,
    config: &ProjectConfig,
    project_dir: &Path,
) -> Result<(), SpiderError> {
    let declared_layers: Vec<String> = config.layers.keys().cloned().collect();

    let per_layer = if let Some(seed_file) = &config.seed_file {
        let path = project_dir.join(seed_file);
        let ids = load_seed_file(&path)?;
        declared_layers
            .iter()
            .map(|layer| (layer.clone(), ids.clone()))
            .collect::<std::collections::HashMap<_, _>>()
    } else if let Some(seeds) = &config.seeds {
        seeds.resolve(&declared_layers)
    } else {
        info!("no seeds or seed_file configured; starting with an empty frontier");
        std::collections::HashMap::new()
    };

    for (layer_name, ids) in per_layer {
        if ids.is_empty() {
            continue;
        }
        let layer = crate::domain::ids::LayerName::from(layer_name.as_str());
        info!(layer = %layer_name, count = ids.len(), "enqueuing bootstrap seeds");
        store.enqueue_seeds(&layer, &ids, 0).await?;
    }

    Ok(())
}
