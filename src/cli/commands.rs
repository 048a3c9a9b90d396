//! Command dispatch: turns parsed arguments into service calls and output

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::application::services::{split_paths, TrimService, Workspace};
use crate::cli::args::{Cli, Commands, ConfigCommands, InputArgs, SourceArgs};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{DependencyGraph, RelationTree, TreePrinter, Trimmer};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Execute a parsed command line.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    if let Commands::Completion { shell } = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|e| InfraError::io("resolve", Path::new("."), e))?,
    };
    let settings = Settings::load(Some(project_dir.as_path()))?;
    debug!("execute_command: settings={:?}", settings);
    let container = ServiceContainer::new(settings);

    match &cli.command {
        Commands::Trim {
            input,
            sources,
            show_tree,
            in_place,
            strict,
        } => cmd_trim(&container, input, sources, *show_tree, *in_place, *strict),
        Commands::Tree {
            input,
            sources,
            pruned,
            depth,
            ascii,
        } => cmd_tree(&container, input, sources, *pruned, *depth, *ascii),
        Commands::Batch {
            sources,
            in_place,
            strict,
        } => cmd_batch(&container, sources, *in_place, *strict),
        Commands::Export { sources, output } => cmd_export(&container, sources, output),
        Commands::Config { command } => cmd_config(&container, command, &project_dir),
        Commands::Completion { .. } => Ok(()),
    }
}

/// Command line sources win over configured ones.
fn load_workspace(container: &ServiceContainer, sources: &SourceArgs) -> CliResult<Workspace> {
    let paths = if sources.paths.is_empty() {
        container.settings.paths.clone()
    } else {
        split_paths(&sources.paths)
    };
    let hierarchy = sources
        .hierarchy
        .clone()
        .or_else(|| container.settings.hierarchy.clone());

    Ok(container
        .trim_service()
        .load(&paths, hierarchy.as_deref())?)
}

fn warn_unknown(unknown: &[String]) {
    for name in unknown {
        output::unknown_module(name);
    }
}

fn printer(container: &ServiceContainer, depth: Option<usize>) -> TreePrinter {
    let render = &container.settings.render;
    TreePrinter::new()
        .with_indent(render.indent)
        .with_depth_limit(depth.or(render.depth_limit))
}

#[instrument(skip(container))]
fn cmd_trim(
    container: &ServiceContainer,
    input: &InputArgs,
    sources: &SourceArgs,
    show_tree: bool,
    in_place: bool,
    strict: bool,
) -> CliResult<()> {
    let service = container.trim_service();
    let input = service.resolve_input(input.manifest.as_deref(), input.depends.as_deref())?;
    let workspace = load_workspace(container, sources)?;

    let report = service.trim(&workspace.registry, input)?;
    let result = &report.result;
    warn_unknown(&result.unknown);

    if show_tree {
        let graph = DependencyGraph::build(&result.original, &workspace.registry);
        let tree = RelationTree::build(&result.original, &graph);
        print!("{}", printer(container, None).render(tree.roots(), &tree).to_text());
    }

    output::retained(&result.retained);

    if in_place {
        if let Some(manifest) = report.input.manifest() {
            if service.write_back(manifest, result)? {
                output::rewritten(&manifest.path);
            }
        }
    }

    if strict && !result.unknown.is_empty() {
        return Err(CliError::UnknownModules(result.unknown.clone()));
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_tree(
    container: &ServiceContainer,
    input: &InputArgs,
    sources: &SourceArgs,
    pruned: bool,
    depth: Option<usize>,
    ascii: bool,
) -> CliResult<()> {
    let service = container.trim_service();
    let input = service.resolve_input(input.manifest.as_deref(), input.depends.as_deref())?;
    let workspace = load_workspace(container, sources)?;

    let declared = input.dependencies();
    let graph = DependencyGraph::build(declared, &workspace.registry);
    warn_unknown(graph.unknown());

    let root: Vec<String> = if pruned {
        Trimmer::new(&graph)
            .reduce(declared)
            .map_err(ApplicationError::from)?
            .retained
    } else {
        graph.root().to_vec()
    };

    let render = printer(container, depth).render(&root, &graph);
    if ascii {
        print!("{}", render.to_text());
    } else {
        for tree in render.to_termtrees() {
            print!("{tree}");
        }
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_batch(
    container: &ServiceContainer,
    sources: &SourceArgs,
    in_place: bool,
    strict: bool,
) -> CliResult<()> {
    let service: &TrimService = container.trim_service();
    let Workspace {
        manifests,
        registry,
    } = load_workspace(container, sources)?;

    let entries = service.trim_all(&registry, manifests);
    let total = entries.len();
    let mut changed = 0;
    let mut failed = 0;
    let mut unknown = BTreeSet::new();

    for entry in &entries {
        match &entry.outcome {
            Ok(result) => {
                unknown.extend(result.unknown.iter().cloned());
                if !result.is_changed() {
                    continue;
                }
                changed += 1;
                output::module_header(&entry.manifest.module);
                for removed in &result.removed {
                    output::removal(removed);
                }
                if in_place && service.write_back(&entry.manifest, result)? {
                    output::rewritten(&entry.manifest.path);
                }
            }
            Err(e) => {
                failed += 1;
                output::module_failed(&entry.manifest.module, e);
            }
        }
    }

    output::batch_summary(total, changed, failed);

    let unknown: Vec<String> = unknown.into_iter().collect();
    warn_unknown(&unknown);

    if failed > 0 {
        return Err(CliError::BatchFailed { failed, total });
    }
    if strict && !unknown.is_empty() {
        return Err(CliError::UnknownModules(unknown));
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_export(container: &ServiceContainer, sources: &SourceArgs, output_file: &Path) -> CliResult<()> {
    let workspace = load_workspace(container, sources)?;
    container
        .trim_service()
        .export_hierarchy(&workspace.registry, output_file)?;
    output::action("Exported", &output_file.display());
    Ok(())
}

fn cmd_config(
    container: &ServiceContainer,
    command: &ConfigCommands,
    project_dir: &Path,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            print!("{}", container.settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path: PathBuf = if *global {
                global_config_path()
                    .ok_or_else(|| CliError::Usage("no config directory available".into()))?
            } else {
                local_config_path(project_dir)
            };
            if container.fs.exists(&path) {
                return Err(CliError::InvalidArgs(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                container
                    .fs
                    .create_dir_all(parent)
                    .map_err(|e| InfraError::io("create", parent, e))?;
            }
            container
                .fs
                .write(&path, &Settings::template())
                .map_err(|e| InfraError::io("write", &path, e))?;
            output::action("Created", &path.display());
            Ok(())
        }
        ConfigCommands::Path => {
            let status = |p: &Path| {
                if container.fs.exists(p) {
                    "exists"
                } else {
                    "not found"
                }
            };
            match global_config_path() {
                Some(p) => output::info(&format!("Global: {} ({})", p.display(), status(&p))),
                None => output::info("Global: unavailable"),
            }
            let local = local_config_path(project_dir);
            output::info(&format!("Local:  {} ({})", local.display(), status(&local)));
            Ok(())
        }
    }
}
