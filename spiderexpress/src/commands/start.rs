// spiderexpress/src/commands/start.rs
//
// USE CASE: Run a crawl to a terminal outcome.

use anyhow::Context;
use spiderexpress_core::application::{ControllerOutcome, Orchestrator};
use std::path::PathBuf;

pub async fn execute(config_path: PathBuf) -> anyhow::Result<()> {
    let orchestrator = Orchestrator::bootstrap(&config_path)
        .with_context(|| format!("failed to load project at {}", config_path.display()))?;

    println!("starting crawl: {}", orchestrator.config().project_name);

    let cancel = Orchestrator::install_cancel_handler();
    match orchestrator.run(cancel).await {
        Ok(ControllerOutcome::MaxIterationReached) => {
            println!("crawl finished: max_iteration reached");
            Ok(())
        }
        Ok(ControllerOutcome::FrontierExhausted) => {
            println!("crawl finished: frontier exhausted");
            Ok(())
        }
        Ok(ControllerOutcome::Cancelled) => {
            println!("crawl stopped: cancelled");
            Ok(())
        }
        Err(err) => {
            eprintln!("crawl aborted: {err}");
            std::process::exit(1);
        }
    }
}
