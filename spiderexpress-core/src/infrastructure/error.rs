// spiderexpress-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    #[error("Store engine error: {0}")]
    #[diagnostic(
        code(spiderexpress::infra::store),
        help("An error occurred inside the embedded DuckDB engine.")
    )]
    Store(#[from] duckdb::Error),

    #[error("File system error: {0}")]
    #[diagnostic(
        code(spiderexpress::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    #[diagnostic(code(spiderexpress::infra::yaml), help("Check your YAML syntax."))]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    #[diagnostic(code(spiderexpress::infra::json))]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(spiderexpress::infra::config))]
    ConfigError(String),

    #[error("Project configuration not found at '{0}'")]
    #[diagnostic(
        code(spiderexpress::infra::config_missing),
        help("Run `spiderexpress create <path>` to scaffold a project, or pass --config.")
    )]
    ConfigNotFound(String),

    #[error("Transient I/O failure after {attempts} attempt(s): {message}")]
    #[diagnostic(
        code(spiderexpress::infra::transient_io),
        help("The retry budget was exhausted; check connectivity to the upstream connector.")
    )]
    TransientIo { attempts: u32, message: String },
}
