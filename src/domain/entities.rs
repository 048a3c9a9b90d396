//! Domain entities: modules and their manifests

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use crate::domain::error::DomainError;

/// Default manifest file name looked for inside module directories.
pub const MANIFEST_FILE: &str = "__manifest__.py";

/// `'depends': [` up to and including the opening bracket.
static DEPENDS_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']depends["']\s*:\s*\["#).unwrap());

/// Bare `'depends':` key, used to tell "absent" from "malformed".
static DEPENDS_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']depends["']\s*:"#).unwrap());

static QUOTED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).unwrap());

/// A module and its declared direct dependencies.
///
/// Duplicate declarations are collapsed on construction, keeping the first
/// occurrence so that display order follows the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub depends: Vec<String>,
}

impl Module {
    pub fn new<I, S>(name: impl Into<String>, depends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            depends: depends.into_iter().map(Into::into).unique().collect(),
        }
    }
}

/// A manifest file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Path to the manifest file
    pub path: PathBuf,
    /// Module name, taken from the directory holding the manifest
    pub module: String,
    /// Content of the `depends` entry, empty if the manifest has none
    pub depends: Vec<String>,
}

impl Manifest {
    /// Parse manifest content.
    ///
    /// Only the `depends` entry is interpreted. Items are the quoted strings
    /// inside the list; `#` comments inside the list are ignored.
    ///
    /// # Arguments
    /// * `content` - Manifest file content
    /// * `path` - Path to the manifest (its parent directory names the module)
    pub fn parse(content: &str, path: PathBuf) -> Result<Self, DomainError> {
        let module = module_name(&path).ok_or_else(|| DomainError::InvalidManifest {
            path: path.clone(),
            message: "cannot derive module name from path".to_string(),
        })?;

        let depends = match DependsEntry::find(content) {
            Some(entry) => parse_list_body(&content[entry.body]),
            None if DEPENDS_KEY.is_match(content) => {
                return Err(DomainError::InvalidManifest {
                    path,
                    message: "'depends' is not a closed list".to_string(),
                });
            }
            None => Vec::new(),
        };

        Ok(Self {
            path,
            module,
            depends,
        })
    }

    /// Turn the manifest into a registry entry.
    pub fn to_module(&self) -> Module {
        Module::new(self.module.clone(), self.depends.iter().cloned())
    }
}

/// Derive the module name from a manifest path (`addons/sale/__manifest__.py` → `sale`).
pub fn module_name(manifest_path: &Path) -> Option<String> {
    manifest_path
        .parent()?
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

/// Location of the `depends` entry inside manifest content.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DependsEntry {
    /// From the key's opening quote to the closing `]`, plus `,` if one follows
    span: Range<usize>,
    /// Between the brackets
    body: Range<usize>,
    trailing_comma: bool,
}

impl DependsEntry {
    fn find(content: &str) -> Option<Self> {
        let open = DEPENDS_OPEN.find(content)?;
        let close = open.end() + find_list_end(&content[open.end()..])?;

        let rest = &content[close + 1..];
        let gap = rest.len() - rest.trim_start().len();
        let trailing_comma = rest[gap..].starts_with(',');
        let end = if trailing_comma {
            close + 1 + gap + 1
        } else {
            close + 1
        };

        Some(Self {
            span: open.start()..end,
            body: open.end()..close,
            trailing_comma,
        })
    }
}

/// Offset of the `]` closing a list whose `[` precedes `s`.
///
/// Brackets inside string literals or `#` comments do not count.
fn find_list_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut in_comment = false;

    for (i, b) in s.bytes().enumerate() {
        if in_comment {
            in_comment = b != b'\n';
            continue;
        }
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'#' => in_comment = true,
            b'[' => depth += 1,
            b']' if depth == 0 => return Some(i),
            b']' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn parse_list_body(body: &str) -> Vec<String> {
    body.lines()
        .map(strip_trailing_comment)
        .flat_map(|line| {
            QUOTED_ITEM
                .captures_iter(line)
                .filter_map(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str().trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|s| !s.is_empty())
        .unique()
        .collect()
}

/// Strip trailing comment from a line, respecting quotes.
/// `"sale",  # needed for orders` → `"sale",`
/// `"we#ird"` → `"we#ird"` (# inside quotes is not a comment)
fn strip_trailing_comment(s: &str) -> &str {
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    for (i, b) in s.bytes().enumerate() {
        match b {
            b'\'' if !in_double_quote => in_single_quote = !in_single_quote,
            b'"' if !in_single_quote => in_double_quote = !in_double_quote,
            b'#' if !in_single_quote && !in_double_quote => return &s[..i],
            _ => {}
        }
    }
    s
}

/// Render a `depends` entry close to what pre-commit formatters produce,
/// without the comma that separates it from the next entry:
///
/// ```text
/// "depends": [
///         "dep1",
///         "dep2",
///     ]
/// ```
pub fn render_depends(deps: &[String], indent: usize, quote: char) -> String {
    let spacing = " ".repeat(indent);
    let mut out = format!("{quote}depends{quote}: [\n");
    for dep in deps {
        out.push_str(&format!("{spacing}{spacing}{quote}{dep}{quote},\n"));
    }
    out.push_str(&format!("{spacing}]"));
    out
}

/// Replace the `depends` entry of manifest `content` with `deps`.
///
/// Everything outside the entry is preserved byte for byte; a comma after the
/// old list is kept, whitespace between the list and that comma is not.
pub fn replace_depends(
    content: &str,
    path: &Path,
    deps: &[String],
    indent: usize,
    quote: char,
) -> Result<String, DomainError> {
    let entry = DependsEntry::find(content).ok_or_else(|| DomainError::InvalidManifest {
        path: path.to_path_buf(),
        message: "no 'depends' list to replace".to_string(),
    })?;

    let mut out = String::with_capacity(content.len());
    out.push_str(&content[..entry.span.start]);
    out.push_str(&render_depends(deps, indent, quote));
    if entry.trailing_comma {
        out.push(',');
    }
    out.push_str(&content[entry.span.end..]);
    Ok(out)
}

/// Parse a user supplied comma separated list (`"sale, stock,sale"`).
///
/// Entries are trimmed, empty entries dropped and duplicates collapsed
/// keeping the first occurrence.
pub fn parse_dependency_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unique()
        .collect()
}

/// Expand environment variables in a path string.
///
/// Supports `$VAR`, `${VAR}` and `~` for the home directory.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
