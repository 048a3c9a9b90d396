//! End-to-end tests through the CLI argument model and command dispatch.

use std::fs;
use std::path::Path;

use clap::Parser;
use rstest::rstest;
use tempfile::TempDir;

use deptrim::cli::{execute_command, Cli, CliError};
use deptrim::exitcode;
use deptrim::util::testing;

fn create_module(root: &Path, name: &str, deps: &[&str]) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    let list = deps
        .iter()
        .map(|d| format!("'{d}'"))
        .collect::<Vec<_>>()
        .join(", ");
    fs::write(
        dir.join("__manifest__.py"),
        format!("{{\n    'name': '{name}',\n    'depends': [{list}],\n}}\n"),
    )
    .unwrap();
}

fn project() -> TempDir {
    testing::init_test_setup();
    let temp = TempDir::new().unwrap();
    let addons = temp.path().join("addons");
    create_module(&addons, "base", &[]);
    create_module(&addons, "mail", &["base"]);
    create_module(&addons, "sale", &["mail", "base"]);
    temp
}

fn run(args: &[&str]) -> Result<(), CliError> {
    let cli = Cli::try_parse_from(args).expect("valid arguments");
    execute_command(&cli)
}

#[rstest]
#[case(&["deptrim", "trim", "addons/sale", "-d", "base"])]
#[case(&["deptrim", "trim", "-d", "base", "-i"])]
#[case(&["deptrim", "tree", "--depth", "deep"])]
#[case(&["deptrim", "frobnicate"])]
fn given_invalid_arguments_when_parsing_then_rejected(#[case] args: &[&str]) {
    assert!(Cli::try_parse_from(args).is_err());
}

#[test]
fn given_repeated_verbose_flags_when_parsing_then_counts_them() {
    let cli = Cli::try_parse_from(["deptrim", "-vv", "batch", "-p", "a,b", "-p", "c"]).unwrap();

    assert_eq!(cli.verbose, 2);
}

#[test]
fn given_manifest_with_redundant_dependency_when_trim_in_place_then_rewrites_it() {
    // Arrange
    let temp = project();
    let dir = temp.path().to_str().unwrap();
    let addons = temp.path().join("addons");
    let manifest = addons.join("sale/__manifest__.py");

    // Act
    run(&[
        "deptrim",
        "-C",
        dir,
        "trim",
        manifest.to_str().unwrap(),
        "-p",
        addons.to_str().unwrap(),
        "-i",
    ])
    .unwrap();

    // Assert
    let content = fs::read_to_string(&manifest).unwrap();
    assert!(content.contains("\"depends\": [\n        \"mail\",\n    ],"));
    assert!(content.contains("'name': 'sale',"));
}

#[test]
fn given_unknown_dependency_when_strict_then_data_error() {
    let temp = project();
    let dir = temp.path().to_str().unwrap();
    let addons = temp.path().join("addons");

    let err = run(&[
        "deptrim",
        "-C",
        dir,
        "trim",
        "-d",
        "sale,ghost",
        "-p",
        addons.to_str().unwrap(),
        "--strict",
    ])
    .unwrap_err();

    assert!(matches!(&err, CliError::UnknownModules(names) if names == &["ghost".to_string()]));
    assert_eq!(err.exit_code(), exitcode::DATAERR);
}

#[test]
fn given_no_module_source_when_trimming_then_usage_error() {
    let temp = project();
    let dir = temp.path().to_str().unwrap();

    let err = run(&["deptrim", "-C", dir, "trim", "-d", "sale"]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::USAGE);
}

#[test]
fn given_no_input_when_trimming_then_usage_error() {
    let temp = project();
    let dir = temp.path().to_str().unwrap();

    let err = run(&["deptrim", "-C", dir, "trim", "-p", "addons"]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::USAGE);
}

#[test]
fn given_cyclic_module_when_batch_then_fails_after_reporting_all() {
    let temp = project();
    let dir = temp.path().to_str().unwrap();
    let addons = temp.path().join("addons");
    create_module(&addons, "loop_a", &["loop_b"]);
    create_module(&addons, "loop_b", &["loop_a"]);

    let err = run(&[
        "deptrim",
        "-C",
        dir,
        "batch",
        "-p",
        addons.to_str().unwrap(),
        "-i",
    ])
    .unwrap_err();

    assert!(matches!(err, CliError::BatchFailed { failed: 2, total: 5 }));
    let sale = fs::read_to_string(addons.join("sale/__manifest__.py")).unwrap();
    assert!(sale.contains("\"mail\","), "other modules are still rewritten");
}

#[test]
fn given_local_config_paths_when_exporting_then_uses_them() {
    let temp = project();
    let dir = temp.path().to_str().unwrap();
    fs::write(temp.path().join(".deptrim.toml"), "paths = [\"addons\"]\n").unwrap();
    let out = temp.path().join("hierarchy.json");

    run(&["deptrim", "-C", dir, "export", "-o", out.to_str().unwrap()]).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["sale"], serde_json::json!(["mail", "base"]));
}

#[test]
fn given_existing_local_config_when_init_then_refuses_to_overwrite() {
    let temp = project();
    let dir = temp.path().to_str().unwrap();

    run(&["deptrim", "-C", dir, "config", "init"]).unwrap();
    let err = run(&["deptrim", "-C", dir, "config", "init"]).unwrap_err();

    assert!(temp.path().join(".deptrim.toml").is_file());
    assert_eq!(err.exit_code(), exitcode::USAGE);
}
