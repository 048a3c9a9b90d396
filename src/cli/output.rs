//! Terminal output for trim reports
//!
//! Data (retained lists, trees) goes to stdout uncolored; diagnostics go to
//! stderr. `colored` honours NO_COLOR, CLICOLOR and CLICOLOR_FORCE.

use std::fmt::Display;
use std::path::Path;

use colored::Colorize;

use crate::domain::Redundancy;

/// `error: ...` on stderr
pub fn error(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// `Warning: ...` on stderr
pub fn warning(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

pub fn unknown_module(name: &str) {
    warning(&format!("unknown module '{name}' kept as declared"));
}

/// Machine readable result: the retained list, comma separated.
pub fn retained(names: &[String]) {
    println!("{}", names.join(","));
}

/// Module name heading a batch report block.
pub fn module_header(module: &str) {
    println!("{}", module.cyan().bold());
}

/// `  - base (via sale -> mail -> base)`
pub fn removal(removed: &Redundancy) {
    println!(
        "  {} {} (via {})",
        "-".red(),
        removed.name,
        removed.path.join(" -> ")
    );
}

pub fn module_failed(module: &str, reason: &(impl Display + ?Sized)) {
    println!("  {} {}: {}", "✗".red(), module, reason);
}

/// A manifest was rewritten on disk.
pub fn rewritten(path: &Path) {
    println!("  {} {}", "✓".green(), path.display());
}

/// Completed action with a green label (`Exported: out.json`).
pub fn action(label: &str, msg: &(impl Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

pub fn batch_summary(total: usize, changed: usize, failed: usize) {
    let failed_text = format!("{failed} failed");
    let failed_text = if failed > 0 {
        failed_text.red().to_string()
    } else {
        failed_text
    };
    println!("{total} modules, {changed} with redundant dependencies, {failed_text}");
}

/// Plain line on stdout.
pub fn info(msg: &(impl Display + ?Sized)) {
    println!("{}", msg);
}
