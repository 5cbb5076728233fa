// spiderexpress-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum SpiderError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Infrastructure(#[from] InfrastructureError),

    #[error("Internal error: {0}")]
    #[diagnostic(code(spiderexpress::internal))]
    Internal(String),
}

// Manual impl to avoid an ambiguous blanket From<io::Error> while keeping
// `?` ergonomic at call sites that only see std I/O.
impl From<std::io::Error> for SpiderError {
    fn from(err: std::io::Error) -> Self {
        SpiderError::Infrastructure(InfrastructureError::Io(err))
    }
}
