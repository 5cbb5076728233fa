// spiderexpress-core/src/application/controller.rs
//
// The iteration state machine (§4.6):
//
//   idle -> starting -> gathering -> (gathering | sampling)
//   sampling -> (gathering | retrying | stopping)
//   retrying -> (gathering | stopping)
//
// Every phase transition writes AppState atomically before the next
// phase's action begins, so a kill between phases resumes cleanly
// (Testable Property 5, §8 scenario 6).

use crate::application::{bootstrap, gathering, sampling};
use crate::domain::ids::LayerName;
use crate::domain::model::{AppState, Phase};
use crate::domain::rng::seeded_rng;
use crate::error::SpiderError;
use crate::infrastructure::config::ProjectConfig;
use crate::infrastructure::registry::{ConnectorRegistry, StrategyRegistry};
use crate::infrastructure::retry::DEFAULT_MAX_ATTEMPTS;
use crate::ports::store::Store;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Why the controller stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerOutcome {
    /// `max_iteration` reached.
    MaxIterationReached,
    /// The frontier emptied and the retry budget was exhausted.
    FrontierExhausted,
    /// A cancellation signal was observed between phases.
    Cancelled,
}

pub struct Controller<'a> {
    store: &'a dyn Store,
    config: &'a ProjectConfig,
    connectors: &'a ConnectorRegistry,
    strategies: &'a StrategyRegistry,
    project_dir: &'a Path,
    cancel: Arc<AtomicBool>,
}

impl<'a> Controller<'a> {
    pub fn new(
        store: &'a dyn Store,
        config: &'a ProjectConfig,
        connectors: &'a ConnectorRegistry,
        strategies: &'a StrategyRegistry,
        project_dir: &'a Path,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            store,
            config,
            connectors,
            strategies,
            project_dir,
            cancel,
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Runs `idle -> starting -> ... -> terminal`, resuming from whatever
    /// AppState the Store already holds.
    pub async fn run(&self) -> Result<ControllerOutcome, SpiderError> {
        let mut state = match self.store.load_state().await? {
            Some(existing) => {
                info!(iteration = existing.iteration, "resuming existing crawl");
                for layer_name in self.config.layers.keys() {
                    let layer = LayerName::from(layer_name.as_str());
                    self.store.reset_processing_to_pending(&layer).await?;
                }
                existing
            }
            None => {
                let random_seed = self.config.random_seed.unwrap_or_else(crate::domain::rng::derive_os_seed);
                let state = AppState::new(self.config.max_iteration, random_seed);
                self.enter_phase(&state, Phase::Starting).await?;
                bootstrap::seed_initial_queue(self.store, self.config, self.project_dir).await?;
                state
            }
        };

        loop {
            if self.cancelled() {
                return Ok(ControllerOutcome::Cancelled);
            }

            state.phase = Phase::Gathering;
            self.save(&state).await?;
            let mut any_pending = true;
            let mut touched = std::collections::HashSet::new();
            while any_pending {
                if self.cancelled() {
                    return Ok(ControllerOutcome::Cancelled);
                }
                let (round_outcome, had_pending) = gathering::run_one_round(
                    self.store,
                    self.config,
                    self.connectors,
                    state.iteration,
                    state.random_seed,
                )
                .await?;
                touched.extend(round_outcome.touched_layers);
                any_pending = had_pending;
            }

            if self.cancelled() {
                return Ok(ControllerOutcome::Cancelled);
            }

            state.phase = Phase::Sampling;
            self.save(&state).await?;
            let next_iteration = state.iteration + 1;
            let new_seeds = sampling::run_sampling_pass(
                self.store,
                self.config,
                self.strategies,
                &touched,
                state.iteration,
                next_iteration,
                state.random_seed,
            )
            .await?;

            state.iteration = next_iteration;

            if state.iteration >= state.max_iteration {
                state.phase = Phase::Stopping;
                self.save(&state).await?;
                return Ok(ControllerOutcome::MaxIterationReached);
            }

            if new_seeds == 0 {
                if let Some(outcome) = self.retry(&mut state).await? {
                    return Ok(outcome);
                }
                continue;
            }

            // A productive iteration clears the retry budget: it is meant
            // to bound attempts within one dry-frontier episode, not to
            // accumulate across the whole run.
            state.retry_attempts = 0;
            state.phase = Phase::Gathering;
            self.save(&state).await?;
        }
    }

    /// The `retrying` phase (§4.6): bounded attempts, demoting `done`
    /// seeds with no observed raw edges back to `pending` between tries.
    /// Returns `Some(outcome)` when the run should stop.
    async fn retry(&self, state: &mut AppState) -> Result<Option<ControllerOutcome>, SpiderError> {
        state.phase = Phase::Retrying;
        state.retry_attempts += 1;
        self.save(state).await?;

        if state.retry_attempts > DEFAULT_MAX_ATTEMPTS {
            state.phase = Phase::Stopping;
            self.save(state).await?;
            return Ok(Some(ControllerOutcome::FrontierExhausted));
        }

        let mut rng = seeded_rng(state.random_seed.wrapping_add(state.retry_attempts as u64));
        let mut requeued_any = false;
        for layer_name in self.config.layers.keys() {
            let layer = LayerName::from(layer_name.as_str());
            let delay = crate::infrastructure::retry::backoff_delay(state.retry_attempts - 1, &mut rng);
            tokio::time::sleep(delay).await;
            let requeued = self.store.requeue_stale_seeds(&layer, state.iteration).await?;
            if requeued > 0 {
                requeued_any = true;
            }
        }

        if !requeued_any && matches!(self.config.empty_seeds, crate::infrastructure::config::EmptySeedsPolicy::Stop) {
            state.phase = Phase::Stopping;
            self.save(state).await?;
            return Ok(Some(ControllerOutcome::FrontierExhausted));
        }

        state.phase = Phase::Gathering;
        self.save(state).await?;
        Ok(None)
    }

    async fn enter_phase(&self, state: &AppState, phase: Phase) -> Result<(), SpiderError> {
        let mut next = state.clone();
        next.phase = phase;
        self.save(&next).await
    }

    async fn save(&self, state: &AppState) -> Result<(), SpiderError> {
        let mut stamped = state.clone();
        stamped.last_updated = Utc::now();
        self.store.save_state(&stamped).await
    }
}
