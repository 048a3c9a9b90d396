//! Root-level transitive reduction of a declared dependency list.

use std::collections::BTreeMap;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::error::DomainError;
use crate::domain::graph::DependencyGraph;
use crate::domain::registry::ModuleRegistry;

/// A declared dependency removed because another entry already implies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redundancy {
    /// The removed entry
    pub name: String,
    /// First path from the implying entry down to `name`, both ends included
    pub path: Vec<String>,
}

impl Redundancy {
    /// The root entry that makes `name` redundant.
    pub fn implied_by(&self) -> &str {
        self.path.first().map(String::as_str).unwrap_or_default()
    }
}

/// Outcome of trimming one dependency list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrunedResult {
    /// Input list after duplicate collapse
    pub original: Vec<String>,
    /// Minimal equivalent list, in original order
    pub retained: Vec<String>,
    /// Entries dropped, in original order
    pub removed: Vec<Redundancy>,
    /// Unregistered names reached from the list (kept if they were entries)
    pub unknown: Vec<String>,
}

impl PrunedResult {
    /// True if the retained set differs from the original set.
    pub fn is_changed(&self) -> bool {
        !self.removed.is_empty()
    }
}

/// Removes entries that are reachable from another entry of the same list.
///
/// Each entry is tested against the fixed de-duplicated input minus itself,
/// never against a partially pruned list, so the outcome does not depend on
/// input order.
pub struct Trimmer<'g> {
    graph: &'g DependencyGraph,
}

impl<'g> Trimmer<'g> {
    pub fn new(graph: &'g DependencyGraph) -> Self {
        Self { graph }
    }

    /// Reduce `root` to its minimal equivalent subset.
    ///
    /// The graph must have been built from a list containing every entry of
    /// `root`; entries missing from the graph are treated like unknown modules.
    ///
    /// # Errors
    /// `CyclicDependency` if a cycle is reachable from any entry.
    #[instrument(level = "debug", skip(self))]
    pub fn reduce<S: AsRef<str> + std::fmt::Debug>(
        &self,
        root: &[S],
    ) -> Result<PrunedResult, DomainError> {
        let entries: Vec<&str> = root.iter().map(AsRef::as_ref).unique().collect();

        if let Some(cycle) = self.graph.cycle_from(&entries) {
            return Err(DomainError::CyclicDependency { cycle });
        }

        let mut retained = Vec::new();
        let mut removed = Vec::new();
        for &entry in &entries {
            if !self.graph.is_known(entry) {
                debug!("reduce: keeping unknown entry {}", entry);
                retained.push(entry.to_string());
                continue;
            }

            let implied_by = entries
                .iter()
                .copied()
                .filter(|&other| other != entry)
                .find(|&other| self.graph.reaches(other, entry));

            match implied_by {
                Some(other) => {
                    let path = self
                        .graph
                        .first_path(other, entry)
                        .unwrap_or_else(|| vec![other.to_string(), entry.to_string()]);
                    debug!("reduce: {} is implied by {}", entry, path.join(" -> "));
                    removed.push(Redundancy {
                        name: entry.to_string(),
                        path,
                    });
                }
                None => retained.push(entry.to_string()),
            }
        }

        Ok(PrunedResult {
            original: entries.iter().map(|s| s.to_string()).collect(),
            retained,
            removed,
            unknown: self.graph.unknown().to_vec(),
        })
    }
}

/// Build the graph for `root` and reduce it in one step.
pub fn trim<S: AsRef<str> + std::fmt::Debug>(
    root: &[S],
    registry: &ModuleRegistry,
) -> Result<PrunedResult, DomainError> {
    let graph = DependencyGraph::build(root, registry);
    Trimmer::new(&graph).reduce(root)
}

/// Forest made of the first paths between every ordered pair of root entries.
///
/// Its roots are the entries not reached from any other entry, i.e. the
/// pruned list; the branches show how each removed entry is reached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationTree {
    roots: Vec<String>,
    edges: BTreeMap<String, Vec<String>>,
}

impl RelationTree {
    #[instrument(level = "debug", skip(graph))]
    pub fn build<S: AsRef<str> + std::fmt::Debug>(root: &[S], graph: &DependencyGraph) -> Self {
        let entries: Vec<&str> = root.iter().map(AsRef::as_ref).unique().collect();
        let mut edges: BTreeMap<String, Vec<String>> = entries
            .iter()
            .map(|e| (e.to_string(), Vec::new()))
            .collect();

        for (&from, &to) in entries
            .iter()
            .cartesian_product(entries.iter())
            .filter(|(a, b)| a != b)
        {
            let Some(path) = graph.first_path(from, to) else {
                continue;
            };
            for (parent, child) in path.iter().tuple_windows() {
                let children = edges.entry(parent.clone()).or_default();
                if !children.contains(child) {
                    children.push(child.clone());
                }
                edges.entry(child.clone()).or_default();
            }
        }

        let roots = entries
            .iter()
            .filter(|e| !edges.values().flatten().any(|c| c == **e))
            .map(|e| e.to_string())
            .collect();

        Self { roots, edges }
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn children(&self, name: &str) -> &[String] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}
