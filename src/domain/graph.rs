//! Dependency graph rooted at one declared dependency list.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use generational_arena::{Arena, Index};
use itertools::Itertools;
use tracing::{debug, instrument, trace};

use crate::domain::registry::ModuleRegistry;

/// Graph node for one module name.
#[derive(Debug)]
pub struct GraphNode {
    pub name: String,
    /// Declared dependency names, in declaration order
    pub depends: Vec<String>,
    /// Arena indices of `depends`
    pub edges: Vec<Index>,
    /// False if the registry has no entry for `name`
    pub known: bool,
}

/// Directed graph of "declares dependency on" edges.
///
/// Holds the synthetic root (the list being trimmed) plus every module
/// reachable from it, so a cycle found in the graph is always reachable from
/// the root. Cycles elsewhere in the registry are never loaded.
///
/// Closures are memoized per node for the lifetime of the graph. The memo
/// uses interior mutability, so a graph is meant to be owned by a single
/// worker; the registry it was built from is the shared part.
#[derive(Debug)]
pub struct DependencyGraph {
    arena: Arena<GraphNode>,
    index: HashMap<String, Index>,
    root: Vec<Index>,
    root_names: Vec<String>,
    unknown: Vec<String>,
    cycle: Option<Vec<String>>,
    closures: RefCell<HashMap<Index, Rc<HashSet<Index>>>>,
}

impl DependencyGraph {
    /// Build the graph for `root` using `registry` for every lookup beyond it.
    ///
    /// Duplicate root entries collapse to the first occurrence.
    #[instrument(level = "debug", skip(registry))]
    pub fn build<S: AsRef<str> + std::fmt::Debug>(root: &[S], registry: &ModuleRegistry) -> Self {
        let mut graph = Self {
            arena: Arena::new(),
            index: HashMap::new(),
            root: Vec::new(),
            root_names: Vec::new(),
            unknown: Vec::new(),
            cycle: None,
            closures: RefCell::new(HashMap::new()),
        };

        let mut queue = VecDeque::new();
        for name in root.iter().map(AsRef::as_ref).unique() {
            let idx = graph.intern(name, registry, &mut queue);
            graph.root.push(idx);
            graph.root_names.push(name.to_string());
        }

        // Breadth-first expansion of everything reachable from the root
        while let Some(idx) = queue.pop_front() {
            let depends: Vec<String> = match graph.arena.get(idx) {
                Some(node) => registry
                    .dependencies_of(&node.name)
                    .map(<[String]>::to_vec)
                    .unwrap_or_default(),
                None => continue,
            };
            let edges: Vec<Index> = depends
                .iter()
                .map(|d| graph.intern(d, registry, &mut queue))
                .collect();
            if let Some(node) = graph.arena.get_mut(idx) {
                node.depends = depends;
                node.edges = edges;
            }
        }

        graph.cycle = graph.find_cycle_from(&graph.root);
        debug!(
            "graph: {} nodes, {} unknown, cyclic={}",
            graph.arena.len(),
            graph.unknown.len(),
            graph.cycle.is_some()
        );
        graph
    }

    fn intern(&mut self, name: &str, registry: &ModuleRegistry, queue: &mut VecDeque<Index>) -> Index {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let known = registry.contains(name);
        if !known {
            self.unknown.push(name.to_string());
        }
        let idx = self.arena.insert(GraphNode {
            name: name.to_string(),
            depends: Vec::new(),
            edges: Vec::new(),
            known,
        });
        self.index.insert(name.to_string(), idx);
        if known {
            queue.push_back(idx);
        }
        idx
    }

    /// Root entries, de-duplicated, in declaration order.
    pub fn root(&self) -> &[String] {
        &self.root_names
    }

    /// Unknown names reached from the root, in discovery order.
    pub fn unknown(&self) -> &[String] {
        &self.unknown
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// True if `name` is in the graph and registered.
    pub fn is_known(&self, name: &str) -> bool {
        self.node(name).is_some_and(|n| n.known)
    }

    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.index.get(name).and_then(|&idx| self.arena.get(idx))
    }

    /// Declared dependencies of `name`, empty for unknown names.
    pub fn dependencies(&self, name: &str) -> &[String] {
        self.node(name).map(|n| n.depends.as_slice()).unwrap_or(&[])
    }

    fn name_of(&self, idx: Index) -> String {
        self.arena
            .get(idx)
            .map(|n| n.name.clone())
            .unwrap_or_default()
    }

    /// Every name reachable from `start` by following one or more edges.
    ///
    /// Start members are excluded unless a cycle leads back to them.
    /// Names not present in the graph contribute nothing.
    #[instrument(level = "trace", skip(self))]
    pub fn closure_from<S: AsRef<str> + std::fmt::Debug>(&self, start: &[S]) -> BTreeSet<String> {
        let mut reached: HashSet<Index> = HashSet::new();
        for idx in start.iter().filter_map(|s| self.index.get(s.as_ref())) {
            reached.extend(self.closure_of(*idx).iter().copied());
        }
        reached.into_iter().map(|idx| self.name_of(idx)).collect()
    }

    /// True if `to` is reachable from `from` by one or more edges.
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&f), Some(t)) => self.closure_of(f).contains(t),
            _ => false,
        }
    }

    fn closure_of(&self, start: Index) -> Rc<HashSet<Index>> {
        if let Some(c) = self.closures.borrow().get(&start) {
            return Rc::clone(c);
        }
        if self.cycle.is_some() {
            // Post-order memoization needs a DAG
            return Rc::new(self.reach(start));
        }

        let mut stack = vec![(start, false)];
        while let Some((idx, expanded)) = stack.pop() {
            if self.closures.borrow().contains_key(&idx) {
                continue;
            }
            let Some(node) = self.arena.get(idx) else {
                continue;
            };
            if !expanded {
                stack.push((idx, true));
                let memo = self.closures.borrow();
                for &child in node.edges.iter().rev() {
                    if !memo.contains_key(&child) {
                        stack.push((child, false));
                    }
                }
            } else {
                let mut set = HashSet::new();
                {
                    let memo = self.closures.borrow();
                    for child in &node.edges {
                        set.insert(*child);
                        if let Some(sub) = memo.get(child) {
                            set.extend(sub.iter().copied());
                        }
                    }
                }
                trace!("closure: {} -> {} nodes", node.name, set.len());
                self.closures.borrow_mut().insert(idx, Rc::new(set));
            }
        }

        self.closures
            .borrow()
            .get(&start)
            .cloned()
            .unwrap_or_default()
    }

    /// Plain breadth-first reachability, used when the graph has a cycle.
    fn reach(&self, start: Index) -> HashSet<Index> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<Index> = self
            .arena
            .get(start)
            .map(|n| n.edges.iter().copied().collect())
            .unwrap_or_default();
        while let Some(idx) = queue.pop_front() {
            if seen.insert(idx) {
                if let Some(node) = self.arena.get(idx) {
                    queue.extend(node.edges.iter().copied());
                }
            }
        }
        seen
    }

    /// First cycle reachable from the root, as a closed loop (`[A, B, A]`).
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        self.cycle.clone()
    }

    /// First cycle reachable from the given names, if any.
    pub fn cycle_from<S: AsRef<str>>(&self, start: &[S]) -> Option<Vec<String>> {
        let starts: Vec<Index> = start
            .iter()
            .filter_map(|s| self.index.get(s.as_ref()).copied())
            .collect();
        self.find_cycle_from(&starts)
    }

    /// Depth-first walk in declaration order; a back edge to a node still on
    /// the walk stack closes a cycle.
    fn find_cycle_from(&self, starts: &[Index]) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Active,
            Done,
        }

        let mut marks: HashMap<Index, Mark> = HashMap::new();
        for &start in starts {
            if marks.contains_key(&start) {
                continue;
            }
            marks.insert(start, Mark::Active);
            let mut stack: Vec<(Index, usize)> = vec![(start, 0)];

            while let Some(frame) = stack.last_mut() {
                let (idx, pos) = *frame;
                let edges = self.arena.get(idx).map(|n| n.edges.as_slice()).unwrap_or(&[]);
                if pos < edges.len() {
                    frame.1 += 1;
                    let child = edges[pos];
                    match marks.get(&child) {
                        Some(Mark::Active) => {
                            let from = stack.iter().position(|(i, _)| *i == child).unwrap_or(0);
                            let mut cycle: Vec<String> =
                                stack[from..].iter().map(|(i, _)| self.name_of(*i)).collect();
                            cycle.push(self.name_of(child));
                            debug!("cycle: {}", cycle.join(" -> "));
                            return Some(cycle);
                        }
                        Some(Mark::Done) => {}
                        None => {
                            marks.insert(child, Mark::Active);
                            stack.push((child, 0));
                        }
                    }
                } else {
                    marks.insert(idx, Mark::Done);
                    stack.pop();
                }
            }
        }
        None
    }

    /// First path from `from` to `to` found by a depth-first walk in
    /// declaration order, both ends included.
    pub fn first_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        let &start = self.index.get(from)?;
        let &target = self.index.get(to)?;
        if start == target {
            return Some(vec![from.to_string()]);
        }

        let mut visited = HashSet::from([start]);
        let mut stack: Vec<(Index, usize)> = vec![(start, 0)];
        while let Some(frame) = stack.last_mut() {
            let (idx, pos) = *frame;
            let edges = self.arena.get(idx).map(|n| n.edges.as_slice()).unwrap_or(&[]);
            if pos < edges.len() {
                frame.1 += 1;
                let child = edges[pos];
                if child == target {
                    let mut path: Vec<String> = stack.iter().map(|(i, _)| self.name_of(*i)).collect();
                    path.push(to.to_string());
                    return Some(path);
                }
                if visited.insert(child) {
                    stack.push((child, 0));
                }
            } else {
                stack.pop();
            }
        }
        None
    }
}
