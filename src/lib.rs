//! deptrim: prune redundant declared dependencies from module manifests.
//!
//! A dependency declared by a module is redundant when it is already reached
//! through another declared dependency. [`domain::trim`] computes the minimal
//! sublist with the same transitive reach; the other layers find manifests,
//! load configuration and drive the command line tool.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
