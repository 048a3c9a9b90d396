//! Domain-level errors (no external dependencies)

use std::path::PathBuf;
use thiserror::Error;

/// Domain errors represent violations found while reasoning about the graph.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("no manifest and no dependency list given")]
    EmptyInput,

    #[error("invalid manifest {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },
}
