//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("no module source: give module paths (-p) or a hierarchy file (-H)")]
    NoModuleSource,

    #[error("a manifest and a dependency list are mutually exclusive")]
    ConflictingInput,

    #[error("not found: {0}")]
    PathNotFound(PathBuf),

    #[error("hierarchy file {path}: {message}")]
    Hierarchy { path: PathBuf, message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
