// spiderexpress/src/commands/create.rs
//
// USE CASE: Scaffold a default project configuration file.

use anyhow::{bail, Context};
use spiderexpress_core::infrastructure::fs::atomic_write;
use std::io::{self, Write};
use std::path::PathBuf;

const DEFAULT_TEMPLATE: &str = r#"project_name: my-crawl
max_iteration: 5
batch_size: 150
random_wait: true
empty_seeds: continue

seeds:
  - alice
  - bob

layers:
  follows:
    connector:
      mock:
        fanout: 3
    routers:
      - source: from
        target:
          - field: to
    sampler:
      random:
        sample_size: 50
    edge_agg_table:
      aggregations:
        weight: sum
"#;

pub fn execute(config_path: PathBuf, interactive: bool) -> anyhow::Result<()> {
    if config_path.exists() {
        bail!(
            "refusing to overwrite existing configuration at {}",
            config_path.display()
        );
    }

    let content = if interactive {
        prompt_for_template()?
    } else {
        DEFAULT_TEMPLATE.to_string()
    };

    atomic_write(&config_path, content.as_bytes())
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!("wrote {}", config_path.display());
    Ok(())
}

/// Asks a handful of questions on stdin and renders them into the same
/// template shape `DEFAULT_TEMPLATE` uses, falling back to its defaults
/// on a blank answer.
fn prompt_for_template() -> anyhow::Result<String> {
    let project_name = ask("project name", "my-crawl")?;
    let layer_name = ask("first layer name", "follows")?;
    let fanout = ask("mock connector fanout", "3")?;
    let sample_size = ask("random sampler sample_size", "50")?;

    Ok(format!(
        "project_name: {project_name}\n\
max_iteration: 5\n\
batch_size: 150\n\
random_wait: true\n\
empty_seeds: continue\n\
\n\
seeds:\n\
  - alice\n\
  - bob\n\
\n\
layers:\n\
  {layer_name}:\n\
    connector:\n\
      mock:\n\
        fanout: {fanout}\n\
    routers:\n\
      - source: from\n\
        target:\n\
          - field: to\n\
    sampler:\n\
      random:\n\
        sample_size: {sample_size}\n\
    edge_agg_table:\n\
      aggregations:\n\
        weight: sum\n"
    ))
}

fn ask(prompt: &str, default: &str) -> anyhow::Result<String> {
    print!("{prompt} [{default}]: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_create_writes_the_default_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spider.yaml");
        execute(path.clone(), false).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("project_name: my-crawl"));
        assert!(written.contains("mock"));
    }

    #[test]
    fn create_refuses_to_overwrite_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spider.yaml");
        std::fs::write(&path, "project_name: existing\nlayers: {}\n").unwrap();
        assert!(execute(path, false).is_err());
    }
}
