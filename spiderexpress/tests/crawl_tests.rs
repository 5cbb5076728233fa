// spiderexpress/tests/crawl_tests.rs
//
// End-to-end CLI coverage driving the real binary against a temp project
// directory with the built-in mock connector, mirroring how the teacher
// repo drove its pipeline through `assert_cmd` rather than calling
// application code directly.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

struct ProjectEnv {
    _tmp: TempDir,
    root: std::path::PathBuf,
}

impl ProjectEnv {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        Self { _tmp: tmp, root }
    }

    fn write_config(&self, content: &str) {
        fs::write(self.root.join("spider.yaml"), content).unwrap();
    }

    fn write_config_at(&self, name: &str, content: &str) {
        fs::write(self.root.join(name), content).unwrap();
    }

    fn spiderexpress(&self) -> Command {
        let mut cmd = Command::cargo_bin("spiderexpress").unwrap();
        cmd.current_dir(&self.root);
        cmd
    }
}

const SMALL_CRAWL: &str = r#"
project_name: integration-test
max_iteration: 2
batch_size: 10
random_wait: false
random_seed: 7

seeds:
  - alice
  - bob

layers:
  follows:
    connector:
      mock:
        fanout: 2
        salt: "it"
    routers:
      - source: from
        target:
          - field: to
    sampler:
      random:
        sample_size: 100
    edge_agg_table:
      aggregations:
        weight: sum
"#;

#[test]
fn list_prints_builtin_connectors_and_strategies() {
    let env = ProjectEnv::new();
    env.spiderexpress()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("mock"))
        .stdout(predicate::str::contains("random"))
        .stdout(predicate::str::contains("snowball"))
        .stdout(predicate::str::contains("spikyball"));
}

#[test]
fn create_scaffolds_a_config_and_refuses_to_overwrite_it() {
    let env = ProjectEnv::new();
    let config_path = env.root.join("spider.yaml");

    env.spiderexpress()
        .arg("create")
        .arg(&config_path)
        .assert()
        .success();

    assert!(config_path.exists());

    env.spiderexpress()
        .arg("create")
        .arg(&config_path)
        .assert()
        .failure();
}

#[test]
fn start_runs_a_small_crawl_to_completion_with_the_mock_connector() {
    let env = ProjectEnv::new();
    env.write_config(SMALL_CRAWL);

    env.spiderexpress()
        .arg("start")
        .arg(env.root.join("spider.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("starting crawl: integration-test"))
        .stdout(predicate::str::contains("crawl finished"));
}

#[test]
fn start_loads_a_config_path_with_a_nonstandard_filename() {
    let env = ProjectEnv::new();
    env.write_config_at("my-crawl.yaml", SMALL_CRAWL);

    env.spiderexpress()
        .arg("start")
        .arg(env.root.join("my-crawl.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("starting crawl: integration-test"));
}

#[test]
fn start_fails_fast_on_an_unresolved_connector_name() {
    let env = ProjectEnv::new();
    env.write_config(
        r#"
layers:
  L1:
    connector:
      not_a_real_connector: {}
    sampler:
      random:
        sample_size: 1
"#,
    );

    env.spiderexpress()
        .arg("start")
        .arg(env.root.join("spider.yaml"))
        .assert()
        .failure();
}
