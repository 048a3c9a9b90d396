//! Registry of known modules and their declared dependencies.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, instrument};

use crate::domain::entities::Module;
use crate::domain::error::DomainError;

/// Name → dependency list mapping, the format of hierarchy files.
pub type Hierarchy = BTreeMap<String, Vec<String>>;

/// A dependency reference that does not resolve to a registered module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UnresolvedReference {
    /// Module declaring the dependency
    pub module: String,
    /// Declared name with no registry entry
    pub missing: String,
}

/// Immutable universe of modules for one run.
///
/// Built once, then shared read-only by every graph and trimmer.
/// It is `Sync`, so batch trimming can borrow it from worker threads.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Module>,
}

impl ModuleRegistry {
    /// Build the registry from module names and a dependency lookup.
    ///
    /// The lookup is called exactly once per name. Registering a name twice
    /// keeps the last lookup result.
    #[instrument(level = "debug", skip_all)]
    pub fn load<I, S, F>(module_names: I, dependency_lookup: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str) -> Vec<String>,
    {
        let mut modules = HashMap::new();
        for name in module_names {
            let name = name.into();
            let depends = dependency_lookup(&name);
            modules.insert(name.clone(), Module::new(name, depends));
        }
        debug!("registry: loaded {} modules", modules.len());
        Self { modules }
    }

    /// Build the registry from a hierarchy map (`{"module": ["dep", ...]}`).
    pub fn from_hierarchy(hierarchy: &Hierarchy) -> Self {
        Self::load(hierarchy.keys().cloned(), |name| {
            hierarchy.get(name).cloned().unwrap_or_default()
        })
    }

    /// Build the registry from already constructed modules.
    pub fn from_modules(modules: impl IntoIterator<Item = Module>) -> Self {
        Self {
            modules: modules.into_iter().map(|m| (m.name.clone(), m)).collect(),
        }
    }

    /// Declared direct dependencies of `name`.
    pub fn dependencies_of(&self, name: &str) -> Result<&[String], DomainError> {
        self.modules
            .get(name)
            .map(|m| m.depends.as_slice())
            .ok_or_else(|| DomainError::UnknownModule(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Registered module names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Every declared dependency that has no registry entry, sorted.
    pub fn unresolved_references(&self) -> Vec<UnresolvedReference> {
        let mut refs: Vec<UnresolvedReference> = self
            .modules
            .values()
            .flat_map(|m| {
                m.depends
                    .iter()
                    .filter(|d| !self.modules.contains_key(d.as_str()))
                    .map(|d| UnresolvedReference {
                        module: m.name.clone(),
                        missing: d.clone(),
                    })
            })
            .collect();
        refs.sort();
        refs
    }

    /// Export as a hierarchy map, e.g. for writing a hierarchy file.
    pub fn to_hierarchy(&self) -> Hierarchy {
        self.modules
            .values()
            .map(|m| (m.name.clone(), m.depends.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ModuleRegistry {
        let mut h = Hierarchy::new();
        h.insert("A".into(), vec![]);
        h.insert("B".into(), vec!["A".into()]);
        h.insert("C".into(), vec!["A".into(), "B".into(), "Z".into()]);
        ModuleRegistry::from_hierarchy(&h)
    }

    #[test]
    fn given_registered_module_when_looking_up_then_returns_declared_order() {
        let reg = registry();
        assert_eq!(reg.dependencies_of("C").unwrap(), ["A", "B", "Z"]);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn given_unknown_module_when_looking_up_then_errors() {
        let reg = registry();
        assert_eq!(
            reg.dependencies_of("X"),
            Err(DomainError::UnknownModule("X".into()))
        );
    }

    #[test]
    fn given_dangling_reference_when_listing_unresolved_then_reports_it() {
        let reg = registry();
        assert_eq!(
            reg.unresolved_references(),
            vec![UnresolvedReference {
                module: "C".into(),
                missing: "Z".into()
            }]
        );
    }

    #[test]
    fn given_lookup_closure_when_loading_then_calls_it_per_name() {
        let reg = ModuleRegistry::load(["x", "y"], |name| match name {
            "y" => vec!["x".to_string(), "x".to_string()],
            _ => vec![],
        });
        assert_eq!(reg.dependencies_of("y").unwrap(), ["x"]);
        assert_eq!(reg.names(), vec!["x", "y"]);
    }
}
