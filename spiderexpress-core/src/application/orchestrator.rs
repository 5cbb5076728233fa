// spiderexpress-core/src/application/orchestrator.rs
//
// The top-level façade a CLI command drives: load configuration, wire up
// the Store and plug-in registries, validate, then hand control to the
// Controller until it reaches a terminal outcome.

use crate::application::controller::{Controller, ControllerOutcome};
use crate::application::validation::validate_project;
use crate::error::SpiderError;
use crate::infrastructure::config::{load_project_config, ProjectConfig};
use crate::infrastructure::registry::{builtin_connectors, builtin_strategies, ConnectorRegistry, StrategyRegistry};
use crate::infrastructure::store::DuckDbStore;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Owns the long-lived pieces of a crawl: the loaded configuration, the
/// registries resolved at startup, and the Store the whole run shares.
pub struct Orchestrator {
    project_dir: PathBuf,
    config: ProjectConfig,
    connectors: ConnectorRegistry,
    strategies: StrategyRegistry,
    store: DuckDbStore,
}

impl Orchestrator {
    /// `config_path` may name the config file directly or a project
    /// directory to search by convention (`spider.yaml`/`spiderexpress.yaml`,
    /// §6); either way, relative paths inside the config (e.g. `seed_file`)
    /// resolve against the file's containing directory. Opens the
    /// configured Store and resolves every connector/sampler binding
    /// against the built-in registries (§6). Fails fast on any unresolved
    /// name so a typo surfaces before the first batch, not mid-crawl.
    pub fn bootstrap(config_path: impl AsRef<Path>) -> Result<Self, SpiderError> {
        let config_path = config_path.as_ref();
        let config = load_project_config(config_path)?;
        let project_dir = if config_path.is_file() {
            match config_path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            }
        } else {
            config_path.to_path_buf()
        };

        let connectors = builtin_connectors();
        let strategies = builtin_strategies();
        validate_project(&config, &connectors, &strategies)?;

        let db_url = if config.db_url.is_empty() {
            project_dir.join(".spiderexpress.duckdb").to_string_lossy().into_owned()
        } else {
            config.db_url.clone()
        };
        let store = DuckDbStore::open(&db_url, config.db_schema.as_deref())?;

        Ok(Self {
            project_dir,
            config,
            connectors,
            strategies,
            store,
        })
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Runs the crawl to completion, honoring `cancel` as a cooperative
    /// cancellation latch checked between batches and phases (§5). A
    /// caller wiring up SIGINT should set this flag from its handler and
    /// let the in-flight batch finish rather than aborting the process.
    pub async fn run(&self, cancel: Arc<AtomicBool>) -> Result<ControllerOutcome, SpiderError> {
        let controller = Controller::new(
            &self.store,
            &self.config,
            &self.connectors,
            &self.strategies,
            &self.project_dir,
            cancel,
        );
        let outcome = controller.run().await;
        match &outcome {
            Ok(ControllerOutcome::MaxIterationReached) => {
                info!("crawl stopped: max_iteration reached");
            }
            Ok(ControllerOutcome::FrontierExhausted) => {
                info!("crawl stopped: frontier exhausted and retry budget spent");
            }
            Ok(ControllerOutcome::Cancelled) => {
                info!("crawl stopped: cancellation requested");
            }
            Err(err) => {
                error!(%err, "crawl aborted with a fatal error");
            }
        }
        outcome
    }

    /// Installs a SIGINT handler that flips the returned flag instead of
    /// terminating the process, so `run` can finish its current batch and
    /// persist AppState before exiting (§5).
    pub fn install_cancel_handler() -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        let handler_flag = flag.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received interrupt signal; finishing in-flight batch before stopping");
                handler_flag.store(true, Ordering::Relaxed);
            }
        });
        flag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_project(dir: &Path) {
        fs::write(
            dir.join("spider.yaml"),
            r#"
project_name: demo
max_iteration: 2
batch_size: 2
seeds: ["alice", "bob"]
layers:
  follows:
    connector: { mock: { fanout: 2 } }
    routers:
      - source: from
        target:
          - field: to
    sampler: { random: { sample_size: 10 } }
"#,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn bootstrap_and_run_reaches_max_iteration() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path());
        let orchestrator = Orchestrator::bootstrap(dir.path()).unwrap();
        let cancel = Arc::new(AtomicBool::new(false));
        let outcome = orchestrator.run(cancel).await.unwrap();
        assert_eq!(outcome, ControllerOutcome::MaxIterationReached);
    }

    #[test]
    fn bootstrap_rejects_unresolved_connector_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("spider.yaml"),
            r#"
layers:
  L1:
    connector: { not_a_real_connector: {} }
    sampler: { random: { sample_size: 1 } }
"#,
        )
        .unwrap();
        let result = Orchestrator::bootstrap(dir.path());
        assert!(result.is_err());
    }
}
