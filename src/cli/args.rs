//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

/// Prune redundant declared dependencies from module manifests
#[derive(Parser, Debug)]
#[command(name = "deptrim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Project directory for local config (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where modules come from: manifest directories and/or a hierarchy file.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Module paths, repeatable and comma separated; later paths win
    #[arg(short, long = "paths", value_name = "PATHS", value_hint = ValueHint::DirPath)]
    pub paths: Vec<String>,

    /// Dependency hierarchy JSON file
    #[arg(short = 'H', long, value_hint = ValueHint::FilePath)]
    pub hierarchy: Option<PathBuf>,
}

/// What to trim: a manifest or an explicit list.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Manifest file or module directory
    #[arg(value_hint = ValueHint::AnyPath, conflicts_with = "depends")]
    pub manifest: Option<PathBuf>,

    /// Comma separated dependency list instead of a manifest
    #[arg(short, long, value_name = "DEPS")]
    pub depends: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the minimal dependency list of a manifest or list
    Trim {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        sources: SourceArgs,

        /// Show how removed entries are reached
        #[arg(short = 't', long)]
        show_tree: bool,

        /// Rewrite the manifest in place
        #[arg(short, long, requires = "manifest")]
        in_place: bool,

        /// Fail if unknown modules are referenced
        #[arg(long)]
        strict: bool,
    },

    /// Render the dependency tree of a manifest or list
    Tree {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        sources: SourceArgs,

        /// Render the trimmed list instead of the declared one
        #[arg(long)]
        pruned: bool,

        /// Print at most N levels
        #[arg(long, value_name = "N")]
        depth: Option<usize>,

        /// Plain indented text instead of box drawing
        #[arg(long)]
        ascii: bool,
    },

    /// Trim every manifest found on the module paths
    Batch {
        #[command(flatten)]
        sources: SourceArgs,

        /// Rewrite manifests in place
        #[arg(short, long)]
        in_place: bool,

        /// Fail if unknown modules are referenced
        #[arg(long)]
        strict: bool,
    },

    /// Write the scanned hierarchy as JSON
    Export {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output file
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,
}
