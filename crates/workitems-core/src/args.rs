//! Argument lists for the external tools.
//!
//! Pure functions: identical inputs give identical output, no environment
//! reads. The CLI uses them to preview commands; validators use them to spawn.

use std::path::{Path, PathBuf};

use crate::paths;

/// `tsc` arguments checking `config` without emitting output.
///
/// `config` is written relative to `project_root` when it lives under it;
/// the tool runs with `project_root` as its working directory.
pub fn build_type_script_args(project_root: &Path, config: &Path, extra: &[String]) -> Vec<String> {
    let mut args = vec![
        "--project".to_string(),
        display_path(project_root, config),
        "--noEmit".to_string(),
        "--pretty".to_string(),
        "false".to_string(),
    ];
    args.extend(extra.iter().cloned());
    args
}

/// `eslint` arguments linting `targets` with machine-readable output.
pub fn build_eslint_args(project_root: &Path, targets: &[PathBuf], extra: &[String]) -> Vec<String> {
    let mut args = vec![
        "--format".to_string(),
        "json".to_string(),
        "--no-error-on-unmatched-pattern".to_string(),
    ];
    args.extend(extra.iter().cloned());
    args.extend(targets.iter().map(|t| display_path(project_root, t)));
    args
}

/// `madge` arguments listing circular imports under `source_root` as JSON.
pub fn build_madge_args(
    project_root: &Path,
    source_root: &Path,
    extensions: &[String],
    extra: &[String],
) -> Vec<String> {
    let mut args = vec!["--circular".to_string(), "--json".to_string()];
    if !extensions.is_empty() {
        let exts: Vec<&str> = extensions.iter().map(|e| e.trim_start_matches('.')).collect();
        args.push("--extensions".to_string());
        args.push(exts.join(","));
    }
    args.extend(extra.iter().cloned());
    args.push(display_path(project_root, source_root));
    args
}

fn display_path(project_root: &Path, path: &Path) -> String {
    paths::to_slash(&paths::relative_to(project_root, path))
}
