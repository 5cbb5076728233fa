// spiderexpress-core/src/infrastructure/config/seeds.rs
//
// Inline `seeds:` (mapping layer→[NodeId] or a flat list) and the
// newline-delimited `seed_file` format (§4.7, §6).

use crate::domain::NodeId;
use crate::infrastructure::error::InfrastructureError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SeedsSpec {
    PerLayer(HashMap<String, Vec<String>>),
    Flat(Vec<String>),
}

impl SeedsSpec {
    /// Resolves the spec against the declared layer set. A flat list (or a
    /// per-layer entry naming an undeclared layer) is broadcast to every
    /// declared layer, per §4.6 ("a seed list missing a layer is enqueued
    /// on every declared layer").
    pub fn resolve(&self, declared_layers: &[String]) -> HashMap<String, Vec<NodeId>> {
        let mut out: HashMap<String, Vec<NodeId>> = HashMap::new();
        match self {
            SeedsSpec::Flat(ids) => {
                for layer in declared_layers {
                    out.insert(
                        layer.clone(),
                        ids.iter().map(|s| NodeId::from(s.as_str())).collect(),
                    );
                }
            }
            SeedsSpec::PerLayer(map) => {
                for layer in declared_layers {
                    let ids = map
                        .get(layer)
                        .map(|ids| ids.iter().map(|s| NodeId::from(s.as_str())).collect())
                        .unwrap_or_default();
                    out.insert(layer.clone(), ids);
                }
            }
        }
        out
    }
}

/// Parses a newline-delimited seed file: one NodeId per non-empty line,
/// `#`-prefixed lines are comments (§6).
pub fn load_seed_file(path: &Path) -> Result<Vec<NodeId>, InfrastructureError> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(NodeId::from)
        .collect())
}
