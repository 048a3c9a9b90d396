//! Indented tree rendering of dependency lists.
//!
//! Rendering is lazy: [`TreeRender::lines`] returns an iterator that walks the
//! source on demand, and every call starts a fresh walk.

use std::collections::HashSet;
use std::fmt;

use termtree::Tree;
use tracing::instrument;

use crate::domain::graph::DependencyGraph;
use crate::domain::trimmer::RelationTree;

/// Default indentation width per level.
pub const DEFAULT_INDENT: usize = 4;

/// Anything that can answer "what does `name` depend on?" for rendering.
pub trait DependencySource {
    fn dependencies(&self, name: &str) -> &[String];

    fn is_unknown(&self, _name: &str) -> bool {
        false
    }
}

impl DependencySource for DependencyGraph {
    fn dependencies(&self, name: &str) -> &[String] {
        DependencyGraph::dependencies(self, name)
    }

    fn is_unknown(&self, name: &str) -> bool {
        !self.is_known(name)
    }
}

impl DependencySource for RelationTree {
    fn dependencies(&self, name: &str) -> &[String] {
        self.children(name)
    }
}

/// Why a line is not expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Subtree already printed earlier in this render
    Revisit,
    /// Name has no registry entry
    Unknown,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Revisit => write!(f, "(*)"),
            Marker::Unknown => write!(f, "(unknown)"),
        }
    }
}

/// One rendered line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    pub depth: usize,
    pub name: String,
    pub marker: Option<Marker>,
    indent: usize,
}

impl TreeLine {
    /// Name plus marker, without indentation.
    pub fn label(&self) -> String {
        match self.marker {
            Some(marker) => format!("{} {}", self.name, marker),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for TreeLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:width$}- {}",
            "",
            self.label(),
            width = self.depth * self.indent
        )
    }
}

/// Renders dependency lists as indented trees.
#[derive(Debug, Clone, Copy)]
pub struct TreePrinter {
    indent: usize,
    depth_limit: Option<usize>,
}

impl Default for TreePrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl TreePrinter {
    pub fn new() -> Self {
        Self {
            indent: DEFAULT_INDENT,
            depth_limit: None,
        }
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Print at most `limit` levels (`Some(1)` prints only the root entries,
    /// `Some(0)` prints nothing).
    pub fn with_depth_limit(mut self, limit: Option<usize>) -> Self {
        self.depth_limit = limit;
        self
    }

    /// Prepare a render of `root` against `source`. Nothing is walked yet.
    pub fn render<'a, S: DependencySource>(
        &self,
        root: &'a [String],
        source: &'a S,
    ) -> TreeRender<'a, S> {
        TreeRender {
            root,
            source,
            indent: self.indent,
            depth_limit: self.depth_limit,
        }
    }
}

/// A restartable render; iterate it as many times as needed.
pub struct TreeRender<'a, S> {
    root: &'a [String],
    source: &'a S,
    indent: usize,
    depth_limit: Option<usize>,
}

impl<S> Clone for TreeRender<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for TreeRender<'_, S> {}

impl<'a, S: DependencySource> TreeRender<'a, S> {
    pub fn lines(&self) -> TreeLines<'a, S> {
        TreeLines::new(*self)
    }

    /// Whole render as text, one line per entry, trailing newline included.
    #[instrument(level = "debug", skip(self))]
    pub fn to_text(&self) -> String {
        self.lines().map(|line| format!("{line}\n")).collect()
    }

    /// Same walk assembled into box-drawing trees, one per root entry.
    #[instrument(level = "debug", skip(self))]
    pub fn to_termtrees(&self) -> Vec<Tree<String>> {
        fn attach(stack: &mut Vec<Tree<String>>, roots: &mut Vec<Tree<String>>) {
            if let Some(tree) = stack.pop() {
                match stack.last_mut() {
                    Some(parent) => {
                        parent.push(tree);
                    }
                    None => roots.push(tree),
                }
            }
        }

        let mut roots = Vec::new();
        let mut stack: Vec<Tree<String>> = Vec::new();
        for line in self.lines() {
            while stack.len() > line.depth {
                attach(&mut stack, &mut roots);
            }
            stack.push(Tree::new(line.label()));
        }
        while !stack.is_empty() {
            attach(&mut stack, &mut roots);
        }
        roots
    }
}

impl<'a, S: DependencySource> IntoIterator for &TreeRender<'a, S> {
    type Item = TreeLine;
    type IntoIter = TreeLines<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines()
    }
}

/// Depth-first, declaration-ordered walk producing [`TreeLine`]s.
pub struct TreeLines<'a, S> {
    render: TreeRender<'a, S>,
    stack: Vec<(&'a str, usize)>,
    expanded: HashSet<&'a str>,
}

impl<'a, S: DependencySource> TreeLines<'a, S> {
    fn new(render: TreeRender<'a, S>) -> Self {
        // Push in reverse for left-to-right traversal
        let stack = if render.depth_limit == Some(0) {
            Vec::new()
        } else {
            render.root.iter().rev().map(|n| (n.as_str(), 0)).collect()
        };
        Self {
            render,
            stack,
            expanded: HashSet::new(),
        }
    }
}

impl<'a, S: DependencySource> Iterator for TreeLines<'a, S> {
    type Item = TreeLine;

    fn next(&mut self) -> Option<Self::Item> {
        let (name, depth) = self.stack.pop()?;
        let source: &'a S = self.render.source;
        let children = source.dependencies(name);

        let marker = if source.is_unknown(name) {
            Some(Marker::Unknown)
        } else if !children.is_empty() && self.expanded.contains(name) {
            Some(Marker::Revisit)
        } else {
            None
        };

        let within_limit = self.render.depth_limit.map_or(true, |limit| depth + 1 < limit);
        if marker.is_none() && !children.is_empty() && within_limit {
            self.expanded.insert(name);
            for child in children.iter().rev() {
                self.stack.push((child.as_str(), depth + 1));
            }
        }

        Some(TreeLine {
            depth,
            name: name.to_string(),
            marker,
            indent: self.render.indent,
        })
    }
}
