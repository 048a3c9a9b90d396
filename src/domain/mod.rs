//! Domain layer: modules, the dependency graph and its reduction
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod entities;
pub mod error;
pub mod graph;
pub mod registry;
pub mod tree;
pub mod trimmer;

pub use entities::*;
pub use error::DomainError;
pub use graph::DependencyGraph;
pub use registry::{Hierarchy, ModuleRegistry, UnresolvedReference};
pub use tree::{DependencySource, Marker, TreeLine, TreePrinter, TreeRender};
pub use trimmer::{trim, PrunedResult, Redundancy, RelationTree, Trimmer};
