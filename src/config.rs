//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/deptrim/deptrim.toml`
//! 3. Local config: `<project_dir>/.deptrim.toml`
//! 4. Environment variables: `DEPTRIM_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::tree::DEFAULT_INDENT;
use crate::domain::{expand_env_vars, MANIFEST_FILE};

/// Output formatting for trees and rewritten manifests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    /// Spaces per indentation level
    pub indent: usize,
    /// Quote character used when rewriting `depends`
    pub quote: char,
    /// Maximum tree depth, unlimited if unset
    pub depth_limit: Option<usize>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT,
            quote: '"',
            depth_limit: None,
        }
    }
}

/// Raw render config for intermediate parsing (None = not specified).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawRenderConfig {
    pub indent: Option<usize>,
    pub quote: Option<char>,
    pub depth_limit: Option<usize>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub manifest_file: Option<String>,
    pub paths: Option<Vec<String>>,
    pub hierarchy: Option<PathBuf>,
    pub render: RawRenderConfig,
}

impl RawSettings {
    /// Resolve relative paths against the directory holding the config file.
    fn resolve_relative(mut self, base: &Path) -> Self {
        let resolve = |p: &str| -> String {
            let (neg, raw) = match p.strip_prefix('!') {
                Some(rest) => ("!", rest),
                None => ("", p),
            };
            let expanded = expand_env_vars(raw);
            if Path::new(&expanded).is_absolute() {
                format!("{neg}{expanded}")
            } else {
                format!("{neg}{}", base.join(expanded).display())
            }
        };
        if let Some(paths) = self.paths.as_mut() {
            *paths = paths.iter().map(|p| resolve(p.as_str())).collect();
        }
        if let Some(h) = self.hierarchy.as_mut() {
            *h = PathBuf::from(resolve(h.to_string_lossy().as_ref()));
        }
        self
    }
}

/// Unified configuration for deptrim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Manifest file name looked for in module directories
    pub manifest_file: String,
    /// Module directories scanned when no `-p` is given
    pub paths: Vec<PathBuf>,
    /// Hierarchy JSON used when no `-H` is given
    pub hierarchy: Option<PathBuf>,
    /// Output formatting
    pub render: RenderConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest_file: MANIFEST_FILE.to_string(),
            paths: Vec::new(),
            hierarchy: None,
            render: RenderConfig::default(),
        }
    }
}

/// Get the XDG config directory for deptrim.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "deptrim").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("deptrim.toml"))
}

/// Get the path to the local config file in a project directory.
pub fn local_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(".deptrim.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Merge path lists keeping order: base first, then new overlay entries.
///
/// Entries prefixed with `!` remove the corresponding entry.
///
/// ```ignore
/// merge_paths(&["a", "b"], &["c"])       // → ["a", "b", "c"]
/// merge_paths(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
/// ```
pub fn merge_paths(base: &[PathBuf], overlay: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = base.to_vec();
    for entry in overlay {
        if let Some(negated) = entry.strip_prefix('!') {
            result.retain(|p| p != Path::new(negated));
        } else if !result.iter().any(|p| p == Path::new(entry)) {
            result.push(PathBuf::from(entry));
        }
    }
    result
}

impl RenderConfig {
    fn merge(&self, overlay: &RawRenderConfig) -> Self {
        Self {
            indent: overlay.indent.unwrap_or(self.indent),
            quote: overlay.quote.unwrap_or(self.quote),
            depth_limit: overlay.depth_limit.or(self.depth_limit),
        }
    }
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.paths = self
            .paths
            .iter()
            .map(|p| PathBuf::from(expand_env_vars(&p.to_string_lossy())))
            .collect();
        self.hierarchy = self
            .hierarchy
            .as_ref()
            .map(|h| PathBuf::from(expand_env_vars(&h.to_string_lossy())));
    }

    /// Merge a local overlay: scalars replace, `paths` union with negation.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            manifest_file: overlay
                .manifest_file
                .clone()
                .unwrap_or_else(|| self.manifest_file.clone()),
            paths: overlay
                .paths
                .as_ref()
                .map(|o| merge_paths(&self.paths, o))
                .unwrap_or_else(|| self.paths.clone()),
            hierarchy: overlay.hierarchy.clone().or_else(|| self.hierarchy.clone()),
            render: self.render.merge(&overlay.render),
        }
    }

    /// Apply the global config onto defaults; `paths` REPLACES.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            paths: global
                .paths
                .as_ref()
                .map(|p| p.iter().map(|s| PathBuf::from(expand_env_vars(s))).collect())
                .unwrap_or_else(|| self.paths.clone()),
            ..self.merge_with(&RawSettings {
                paths: None,
                ..global.clone()
            })
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `project_dir` - Optional directory holding a local `.deptrim.toml`
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config (`paths` REPLACE defaults)
    /// 3. Local config (`paths` UNION with global, `!path` removes)
    /// 4. Environment variables: `DEPTRIM_*` prefix (REPLACE)
    pub fn load(project_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("config: global {}", global_path.display());
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(dir) = project_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!("config: local {}", local_path.display());
                let raw = load_raw_settings(&local_path)?.resolve_relative(dir);
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply DEPTRIM_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("DEPTRIM")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("paths")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("manifest_file") {
            settings.manifest_file = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("paths") {
            settings.paths = val.into_iter().map(PathBuf::from).collect();
        }
        if let Ok(val) = config.get_string("hierarchy") {
            settings.hierarchy = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get::<usize>("render.indent") {
            settings.render.indent = val;
        }
        if let Ok(val) = config.get_string("render.quote") {
            let mut chars = val.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => settings.render.quote = c,
                _ => {
                    return Err(ApplicationError::Config {
                        message: format!("DEPTRIM_RENDER__QUOTE must be one character, got {val:?}"),
                    })
                }
            }
        }
        if let Ok(val) = config.get::<usize>("render.depth_limit") {
            settings.render.depth_limit = Some(val);
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# deptrim configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/deptrim/deptrim.toml  (defines your baseline)
#   Local:  <project>/.deptrim.toml         (project-specific additions)
#   Env:    DEPTRIM_* environment variables (explicit overrides)
#
# `paths` in the local config is merged with the global list.
# Use "!path" to REMOVE an inherited entry:
#   paths = ["addons", "!../odoo/addons"]

# Manifest file looked for in every module directory
# manifest_file = "__manifest__.py"

# Module directories scanned when -p is not given
# paths = ["~/odoo/odoo/addons", "~/odoo/enterprise", "addons"]

# Pre-computed hierarchy used when -H is not given
# hierarchy = "~/odoo/trees/15.0.json"

[render]
# Spaces per tree level, also used when rewriting manifests
# indent = 4

# Quote character for rewritten depends entries
# quote = '"'

# Maximum tree depth
# depth_limit = 3
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::load(None).expect("load defaults");
        assert_eq!(settings.manifest_file, "__manifest__.py");
        assert_eq!(settings.render.indent, 4);
        assert_eq!(settings.render.quote, '"');
    }

    #[test]
    fn given_tilde_in_paths_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            paths: vec![PathBuf::from("~/odoo/addons")],
            hierarchy: Some(PathBuf::from("$HOME/trees/15.0.json")),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        assert!(settings.paths[0].to_string_lossy().starts_with(&home));
        assert!(settings
            .hierarchy
            .as_ref()
            .is_some_and(|h| h.to_string_lossy().starts_with(&home)));
    }

    #[test]
    fn test_merge_paths_union_keeps_order() {
        let base = vec![PathBuf::from("a"), PathBuf::from("b")];
        let result = merge_paths(&base, &["c".to_string(), "a".to_string()]);
        assert_eq!(
            result,
            vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]
        );
    }

    #[test]
    fn test_merge_paths_negation() {
        let base = vec![PathBuf::from("a"), PathBuf::from("b")];
        let result = merge_paths(&base, &["!a".to_string(), "c".to_string()]);
        assert_eq!(result, vec![PathBuf::from("b"), PathBuf::from("c")]);
    }

    #[test]
    fn test_apply_global_replaces_paths() {
        let base = Settings {
            paths: vec![PathBuf::from("a")],
            ..Settings::default()
        };
        let global = RawSettings {
            paths: Some(vec!["x".to_string()]),
            render: RawRenderConfig {
                indent: Some(2),
                ..RawRenderConfig::default()
            },
            ..RawSettings::default()
        };

        let result = base.apply_global(&global);

        assert_eq!(result.paths, vec![PathBuf::from("x")]);
        assert_eq!(result.render.indent, 2);
        assert_eq!(result.render.quote, '"');
    }

    #[test]
    fn test_template_parses() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("template is valid toml");
        assert!(raw.paths.is_none());
    }
}
