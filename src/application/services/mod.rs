//! Application services

pub mod trim;

pub use trim::{split_paths, BatchEntry, TrimInput, TrimReport, TrimService, Workspace};
