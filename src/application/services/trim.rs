//! Trim service
//!
//! Loads the module universe from manifest directories and hierarchy files,
//! resolves what to trim, runs the reduction and writes results back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::{
    expand_env_vars, parse_dependency_list, replace_depends, trim, DomainError, Hierarchy,
    Manifest, Module, ModuleRegistry, PrunedResult,
};
use crate::infrastructure::traits::FileSystem;

/// What a single trim run works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrimInput {
    /// A module's manifest; its `depends` list is the root
    Manifest(Manifest),
    /// An explicit dependency list given on the command line
    List(Vec<String>),
}

impl TrimInput {
    pub fn dependencies(&self) -> &[String] {
        match self {
            TrimInput::Manifest(m) => &m.depends,
            TrimInput::List(deps) => deps,
        }
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        match self {
            TrimInput::Manifest(m) => Some(m),
            TrimInput::List(_) => None,
        }
    }
}

/// Outcome of trimming one input.
#[derive(Debug, Clone)]
pub struct TrimReport {
    pub input: TrimInput,
    pub result: PrunedResult,
}

/// One module's outcome in a batch run. Errors stay per module.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub manifest: Manifest,
    pub outcome: Result<PrunedResult, DomainError>,
}

/// Manifests found on the module paths plus the registry built from them.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Scanned manifests, sorted by module name
    pub manifests: Vec<Manifest>,
    pub registry: ModuleRegistry,
}

/// Split repeated, comma separated path arguments (`-p a,b -p c`).
pub fn split_paths(values: &[String]) -> Vec<PathBuf> {
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| PathBuf::from(expand_env_vars(s)))
        .collect()
}

/// Service for trimming module dependency lists.
pub struct TrimService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl TrimService {
    /// Create a new trim service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// Find and parse every manifest below `paths`.
    ///
    /// A module found under a later path replaces one of the same name found
    /// under an earlier path. Unparseable manifests are skipped with a warning.
    #[instrument(level = "debug", skip(self))]
    pub fn scan(&self, paths: &[PathBuf]) -> ApplicationResult<Vec<Manifest>> {
        let mut found: BTreeMap<String, Manifest> = BTreeMap::new();

        for dir in paths {
            if !self.fs.is_dir(dir) {
                return Err(ApplicationError::PathNotFound(dir.clone()));
            }

            for entry in WalkDir::new(dir)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| match e {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        warn!("skipping unreadable entry: {}", err);
                        None
                    }
                })
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.file_name().to_string_lossy() == self.settings.manifest_file)
            {
                let path = entry.into_path();
                let content = self
                    .fs
                    .read_to_string(&path)
                    .with_path_context("read manifest", &path)?;
                match Manifest::parse(&content, path) {
                    Ok(manifest) => {
                        if let Some(previous) = found.insert(manifest.module.clone(), manifest) {
                            debug!(
                                "scan: {} overrides {}",
                                previous.module,
                                previous.path.display()
                            );
                        }
                    }
                    Err(e) => warn!("skipping manifest: {}", e),
                }
            }
        }

        debug!("scan: found {} modules", found.len());
        Ok(found.into_values().collect())
    }

    /// Read a hierarchy JSON file (`{"module": ["dep", ...]}`).
    #[instrument(level = "debug", skip(self))]
    pub fn read_hierarchy(&self, path: &Path) -> ApplicationResult<Hierarchy> {
        if !self.fs.is_file(path) {
            return Err(ApplicationError::PathNotFound(path.to_path_buf()));
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read hierarchy", path)?;
        serde_json::from_str(&content).map_err(|e| ApplicationError::Hierarchy {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write the registry as a pretty printed hierarchy JSON file.
    #[instrument(level = "debug", skip(self, registry))]
    pub fn export_hierarchy(&self, registry: &ModuleRegistry, path: &Path) -> ApplicationResult<()> {
        let json = serde_json::to_string_pretty(&registry.to_hierarchy()).map_err(|e| {
            ApplicationError::Hierarchy {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs
                .create_dir_all(parent)
                .with_path_context("create directory", parent)?;
        }
        self.fs
            .write(path, &format!("{json}\n"))
            .with_path_context("write hierarchy", path)?;
        info!("exported {} modules to {}", registry.len(), path.display());
        Ok(())
    }

    /// Build the module universe.
    ///
    /// The hierarchy file is loaded first; modules scanned from `paths` replace
    /// hierarchy entries of the same name.
    ///
    /// # Errors
    /// `NoModuleSource` if neither paths nor a hierarchy file is given.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, paths: &[PathBuf], hierarchy: Option<&Path>) -> ApplicationResult<Workspace> {
        if paths.is_empty() && hierarchy.is_none() {
            return Err(ApplicationError::NoModuleSource);
        }

        let mut modules: BTreeMap<String, Module> = BTreeMap::new();
        if let Some(file) = hierarchy {
            for (name, deps) in self.read_hierarchy(file)? {
                modules.insert(name.clone(), Module::new(name, deps));
            }
        }

        let manifests = self.scan(paths)?;
        for manifest in &manifests {
            modules.insert(manifest.module.clone(), manifest.to_module());
        }

        let registry = ModuleRegistry::from_modules(modules.into_values());
        let unresolved = registry.unresolved_references();
        if !unresolved.is_empty() {
            debug!("load: {} unresolved references", unresolved.len());
        }
        info!("loaded {} modules", registry.len());

        Ok(Workspace {
            manifests,
            registry,
        })
    }

    /// Read one manifest. A module directory resolves to its manifest file.
    pub fn read_manifest(&self, path: &Path) -> ApplicationResult<Manifest> {
        let file = if self.fs.is_dir(path) {
            path.join(&self.settings.manifest_file)
        } else {
            path.to_path_buf()
        };
        if !self.fs.is_file(&file) {
            return Err(ApplicationError::PathNotFound(file));
        }

        let content = self
            .fs
            .read_to_string(&file)
            .with_path_context("read manifest", &file)?;
        Ok(Manifest::parse(&content, file)?)
    }

    /// Decide what to trim from a manifest path or a raw dependency list.
    ///
    /// # Errors
    /// `ConflictingInput` if both are given, `EmptyInput` if neither is given
    /// or the list holds no names.
    pub fn resolve_input(
        &self,
        manifest: Option<&Path>,
        deps: Option<&str>,
    ) -> ApplicationResult<TrimInput> {
        match (manifest, deps) {
            (Some(_), Some(_)) => Err(ApplicationError::ConflictingInput),
            (Some(path), None) => Ok(TrimInput::Manifest(self.read_manifest(path)?)),
            (None, Some(raw)) => {
                let list = parse_dependency_list(raw);
                if list.is_empty() {
                    return Err(DomainError::EmptyInput.into());
                }
                Ok(TrimInput::List(list))
            }
            (None, None) => Err(DomainError::EmptyInput.into()),
        }
    }

    /// Trim one input against the registry.
    #[instrument(level = "debug", skip(self, registry))]
    pub fn trim(&self, registry: &ModuleRegistry, input: TrimInput) -> ApplicationResult<TrimReport> {
        let result = trim(input.dependencies(), registry)?;
        for removed in &result.removed {
            debug!("trim: {} via {}", removed.name, removed.path.join(" -> "));
        }
        Ok(TrimReport { input, result })
    }

    /// Trim every manifest in parallel.
    ///
    /// Each worker builds its own graph against the shared registry.
    /// A cyclic module yields an error entry and does not affect the others.
    #[instrument(level = "debug", skip_all, fields(count = manifests.len()))]
    pub fn trim_all(&self, registry: &ModuleRegistry, manifests: Vec<Manifest>) -> Vec<BatchEntry> {
        let entries: Vec<BatchEntry> = manifests
            .into_par_iter()
            .map(|manifest| {
                let outcome = trim(&manifest.depends, registry);
                BatchEntry { manifest, outcome }
            })
            .collect();

        let failed = entries.iter().filter(|e| e.outcome.is_err()).count();
        debug!("trim_all: {} modules, {} failed", entries.len(), failed);
        entries
    }

    /// Rewrite the manifest's `depends` list with `retained`.
    ///
    /// The file is only touched when `result` removed something.
    ///
    /// # Returns
    /// `true` if the file was rewritten
    #[instrument(level = "debug", skip(self, result), fields(path = %manifest.path.display()))]
    pub fn write_back(&self, manifest: &Manifest, result: &PrunedResult) -> ApplicationResult<bool> {
        if !result.is_changed() {
            debug!("write_back: unchanged");
            return Ok(false);
        }

        let content = self
            .fs
            .read_to_string(&manifest.path)
            .with_path_context("read manifest", &manifest.path)?;
        let render = &self.settings.render;
        let updated = replace_depends(
            &content,
            &manifest.path,
            &result.retained,
            render.indent,
            render.quote,
        )?;
        self.fs
            .write(&manifest.path, &updated)
            .with_path_context("write manifest", &manifest.path)?;
        info!(
            "rewrote {}: removed {}",
            manifest.module,
            result.removed.iter().map(|r| r.name.as_str()).collect::<Vec<_>>().join(",")
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::RealFileSystem;
    use std::fs;
    use tempfile::TempDir;

    fn write_module(root: &Path, name: &str, deps: &[&str]) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        let list = deps
            .iter()
            .map(|d| format!("\"{d}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let path = dir.join("__manifest__.py");
        fs::write(
            &path,
            format!("{{\n    \"name\": \"{name}\",\n    \"depends\": [{list}],\n}}\n"),
        )
        .unwrap();
        path
    }

    fn service() -> TrimService {
        TrimService::new(Arc::new(RealFileSystem), Arc::new(Settings::default()))
    }

    #[test]
    fn given_comma_separated_values_when_splitting_then_flattens_in_order() {
        let values = vec!["a,b".to_string(), " c ".to_string(), ",".to_string()];

        let paths = split_paths(&values);

        assert_eq!(
            paths,
            vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );
    }

    #[test]
    fn given_same_module_in_two_paths_when_scanning_then_later_path_wins() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        write_module(&first, "sale", &["base"]);
        write_module(&second, "sale", &["mail"]);

        let manifests = service().scan(&[first, second.clone()]).unwrap();

        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].depends, vec!["mail"]);
        assert!(manifests[0].path.starts_with(&second));
    }

    #[cfg(unix)]
    #[test]
    fn given_unreadable_subdirectory_when_scanning_then_other_manifests_are_found() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        write_module(temp.path(), "sale", &["base"]);
        let locked = temp.path().join("locked");
        write_module(&locked, "hidden", &[]);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let result = service().scan(&[temp.path().to_path_buf()]);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let manifests = result.unwrap();
        assert!(manifests.iter().any(|m| m.module == "sale"));
    }

    #[test]
    fn given_both_inputs_when_resolving_then_conflicting_input() {
        let result = service().resolve_input(Some(Path::new("x")), Some("a"));

        assert!(matches!(result, Err(ApplicationError::ConflictingInput)));
    }

    #[test]
    fn given_blank_list_when_resolving_then_empty_input() {
        let result = service().resolve_input(None, Some(" , "));

        assert!(matches!(
            result,
            Err(ApplicationError::Domain(DomainError::EmptyInput))
        ));
    }

    #[test]
    fn given_no_sources_when_loading_then_no_module_source() {
        let result = service().load(&[], None);

        assert!(matches!(result, Err(ApplicationError::NoModuleSource)));
    }
}
