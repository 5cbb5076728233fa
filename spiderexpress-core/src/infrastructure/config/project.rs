// spiderexpress-core/src/infrastructure/config/project.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};
use validator::Validate;

use crate::infrastructure::config::layer::LayerConfig;
use crate::infrastructure::config::seeds::SeedsSpec;
use crate::infrastructure::error::InfrastructureError;

fn default_batch_size() -> usize {
    150
}

fn default_max_iteration() -> u64 {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptySeedsPolicy {
    Stop,
    Continue,
}

impl Default for EmptySeedsPolicy {
    fn default() -> Self {
        EmptySeedsPolicy::Continue
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ProjectConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,

    #[serde(default)]
    pub db_url: String,

    #[serde(default)]
    pub db_schema: Option<String>,

    #[serde(default = "default_max_iteration")]
    #[validate(range(min = 1))]
    pub max_iteration: u64,

    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1))]
    pub batch_size: usize,

    #[serde(default)]
    pub random_wait: bool,

    #[serde(default)]
    pub random_seed: Option<u64>,

    #[serde(default)]
    pub empty_seeds: EmptySeedsPolicy,

    #[serde(default)]
    pub seeds: Option<SeedsSpec>,

    #[serde(default)]
    pub seed_file: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "at least one layer must be declared"))]
    pub layers: HashMap<String, LayerConfig>,
}

fn default_project_name() -> String {
    "spiderexpress-project".to_string()
}

const CONFIG_CANDIDATES: [&str; 2] = ["spider.yaml", "spiderexpress.yaml"];

/// `path` may name the config file directly (`start path/to/my-crawl.yaml`)
/// or a project directory to search by convention (`spider.yaml` /
/// `spiderexpress.yaml`); a file is always preferred over discovery.
#[instrument(skip(path))]
pub fn load_project_config(path: &Path) -> Result<ProjectConfig, InfrastructureError> {
    let config_path = resolve_config_path(path)?;
    info!(path = ?config_path, "loading project configuration");

    let content = fs::read_to_string(&config_path)?;
    let mut config: ProjectConfig = serde_yaml::from_str(&content)?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        InfrastructureError::ConfigError(format!("{:?}: {}", config_path, e))
    })?;

    if config.seeds.is_none() && config.seed_file.is_none() {
        tracing::warn!(
            "no `seeds` or `seed_file` declared; defaulting to empty_seeds={:?}",
            config.empty_seeds
        );
    }

    Ok(config)
}

fn resolve_config_path(path: &Path) -> Result<PathBuf, InfrastructureError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    find_main_config(path)
}

fn find_main_config(root: &Path) -> Result<PathBuf, InfrastructureError> {
    for filename in CONFIG_CANDIDATES {
        let p = root.join(filename);
        if p.exists() {
            return Ok(p);
        }
    }
    Err(InfrastructureError::ConfigNotFound(format!(
        "{:?} (checked {:?})",
        root, CONFIG_CANDIDATES
    )))
}

fn apply_env_overrides(config: &mut ProjectConfig) {
    if let Ok(val) = std::env::var("SPIDEREXPRESS_DB_URL") {
        info!(old = %config.db_url, new = %val, "overriding db_url via environment");
        config.db_url = val;
    }
    if let Ok(val) = std::env::var("SPIDEREXPRESS_MAX_ITERATION") {
        if let Ok(parsed) = val.parse::<u64>() {
            info!(old = config.max_iteration, new = parsed, "overriding max_iteration via environment");
            config.max_iteration = parsed;
        }
    }
}
