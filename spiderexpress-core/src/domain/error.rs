// spiderexpress-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by pure domain logic: router, aggregator, strategies,
/// configuration validation. These never touch I/O.
#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Configuration error at '{path}': {message}")]
    #[diagnostic(
        code(spiderexpress::domain::config),
        help("Check the offending key in your project file.")
    )]
    ConfigError { path: String, message: String },

    #[error("Plug-in '{name}' returned a malformed frame: {message}")]
    #[diagnostic(
        code(spiderexpress::domain::plugin),
        help("The connector or strategy violated its output contract.")
    )]
    PluginError { name: String, message: String },

    #[error("Router spec for layer '{layer}' is invalid: {message}")]
    #[diagnostic(code(spiderexpress::domain::router))]
    RouterError { layer: String, message: String },

    #[error("Aggregation column '{column}' cannot use function '{function}': {reason}")]
    #[diagnostic(code(spiderexpress::domain::aggregation))]
    AggregationError {
        column: String,
        function: String,
        reason: String,
    },

    #[error("Unknown layer '{0}' referenced in configuration")]
    #[diagnostic(code(spiderexpress::domain::unknown_layer))]
    UnknownLayer(String),
}
