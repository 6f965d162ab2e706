use crate::output::{print_json, print_rows};
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};
use workitems_core::args::build_madge_args;
use workitems_core::config::WarnLevel;
use workitems_core::scope::{self, TypeCheckTarget};
use workitems_core::tool::{locate_tool, ToolKind};
use workitems_core::{
    build_eslint_args, build_type_script_args, paths, run_validation, TokioProcessRunner,
    ValidationContext, ValidationReport, ValidationSettings, ValidatorKind,
};

#[derive(Args)]
pub struct ValidateArgs {
    /// Only check these files (default: the whole project)
    #[arg(long, num_args = 1.., value_name = "PATH")]
    files: Vec<PathBuf>,

    /// Validators to run, comma separated: type-check, lint, circular (default: all)
    #[arg(long, value_delimiter = ',', value_name = "KIND")]
    only: Vec<ValidatorKind>,

    /// Per-step timeout in seconds, 0 for none (overrides config)
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Run validators one after another instead of concurrently
    #[arg(long)]
    sequential: bool,
}

pub fn run(root: &Path, args: ValidateArgs, json: bool, verbose: bool) -> anyhow::Result<()> {
    let mut settings = ValidationSettings::load(root).context("failed to load config")?;
    apply_overrides(&mut settings, &args, verbose);

    for w in settings.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!("config: {}", w.message),
            WarnLevel::Error => tracing::error!("config: {}", w.message),
        }
    }

    let ctx = if args.files.is_empty() {
        ValidationContext::full(root)
    } else {
        let cwd = std::env::current_dir().context("failed to read current directory")?;
        let files: Vec<PathBuf> = args
            .files
            .iter()
            .map(|f| anchor_file(root, &cwd, f))
            .collect();
        ValidationContext::files(root, files)?
    };

    if settings.verbose && !json {
        for line in command_lines(&ctx, &settings) {
            println!("{line}");
        }
    }

    let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let report = rt.block_on(run_validation(
        &ctx,
        &args.only,
        &settings,
        &TokioProcessRunner::new(),
    ));
    // A timed-out import-graph scan may still be running on a blocking thread.
    rt.shutdown_background();

    if json {
        print_json(&report)?;
    } else {
        print_report(&report, settings.verbose);
    }

    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!(
            "{failed} of {} validation steps failed",
            report.steps.len()
        );
    }
    Ok(())
}

/// Resolve a `--files` entry typed relative to `cwd` into a path the core
/// reads correctly: absolute, or relative to `root`.
fn anchor_file(root: &Path, cwd: &Path, file: &Path) -> PathBuf {
    let abs = paths::normalize(&cwd.join(file));
    if abs.starts_with(root) {
        return abs;
    }
    // `root` and `cwd` may name the same tree through different symlinks.
    match (root.canonicalize(), abs.canonicalize()) {
        (Ok(real_root), Ok(real_file)) => match real_file.strip_prefix(&real_root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => abs,
        },
        _ => abs,
    }
}

fn apply_overrides(settings: &mut ValidationSettings, args: &ValidateArgs, verbose: bool) {
    if let Some(secs) = args.timeout {
        settings.timeout_seconds = secs;
    }
    if args.sequential {
        settings.parallel = false;
    }
    if verbose {
        settings.verbose = true;
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn print_report(report: &ValidationReport, verbose: bool) {
    let rows: Vec<Vec<String>> = report
        .steps
        .iter()
        .map(|step| {
            let mut row = vec![
                if step.result.success { "ok" } else { "FAIL" }.to_string(),
                step.kind.to_string(),
            ];
            if verbose {
                row.push(format!("{}ms", step.duration_ms));
                if let Some(kind) = step.result.kind {
                    row.push(kind.as_str().to_string());
                }
            }
            row
        })
        .collect();
    print_rows(&rows);

    for step in report.failures() {
        if let Some(error) = &step.result.error {
            eprintln!("\n[{}] {}", step.kind, error);
        }
    }
}

/// The tool command lines a run would use, as shell-like preview lines.
fn command_lines(ctx: &ValidationContext, settings: &ValidationSettings) -> Vec<String> {
    let root = ctx.project_root();
    let plan = scope::resolve(ctx, settings);

    let config = match &plan.type_check {
        TypeCheckTarget::BaseConfig(path) => path.clone(),
        TypeCheckTarget::Ephemeral(req) => req
            .directory
            .join(format!("{}<random>.json", paths::EPHEMERAL_CONFIG_PREFIX)),
    };
    let tsc = locate_tool(root, ToolKind::TypeScript, settings.type_check.command.as_deref());
    let eslint = locate_tool(root, ToolKind::Eslint, settings.lint.command.as_deref());

    let mut lines = vec![
        preview(
            &tsc,
            build_type_script_args(root, &config, &settings.type_check.extra_args),
        ),
        preview(
            &eslint,
            build_eslint_args(root, &plan.lint_targets, &settings.lint.extra_args),
        ),
    ];
    match settings.circular.command.as_deref() {
        Some(cmd) if !cmd.trim().is_empty() => {
            let madge = locate_tool(root, ToolKind::Madge, Some(cmd));
            lines.push(preview(
                &madge,
                build_madge_args(
                    root,
                    &plan.source_root,
                    &settings.extensions,
                    &settings.circular.extra_args,
                ),
            ));
        }
        _ => lines.push(format!(
            "# circular: built-in import graph over {}",
            paths::to_slash(&paths::relative_to(root, &plan.source_root))
        )),
    }
    lines
}

fn preview(program: &str, args: Vec<String>) -> String {
    format!("$ {program} {}", args.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ValidateArgs,
    }

    fn parse(argv: &[&str]) -> ValidateArgs {
        let mut full = vec!["validate"];
        full.extend_from_slice(argv);
        Harness::parse_from(full).args
    }

    #[test]
    fn only_accepts_comma_list() {
        let args = parse(&["--only", "lint,circular"]);
        assert_eq!(args.only, vec![ValidatorKind::Lint, ValidatorKind::Circular]);
    }

    #[test]
    fn unknown_validator_is_rejected() {
        let err = Harness::try_parse_from(["validate", "--only", "format"]).err();
        assert!(err.is_some());
    }

    #[test]
    fn flags_override_loaded_settings() {
        let args = parse(&["--timeout", "0", "--sequential", "--files", "src/a.ts", "src/b.ts"]);
        let mut settings = ValidationSettings::default();
        apply_overrides(&mut settings, &args, true);
        assert_eq!(settings.timeout(), None);
        assert!(!settings.parallel);
        assert!(settings.verbose);
        assert_eq!(args.files.len(), 2);
    }

    #[test]
    fn files_are_anchored_at_the_working_directory() {
        let root = Path::new("/repo");
        assert_eq!(
            anchor_file(root, Path::new("/repo/src"), Path::new("a.ts")),
            PathBuf::from("/repo/src/a.ts")
        );
        assert_eq!(
            anchor_file(root, Path::new("/repo/src/deep"), Path::new("../b.ts")),
            PathBuf::from("/repo/src/b.ts")
        );
        assert_eq!(
            anchor_file(root, Path::new("/elsewhere"), Path::new("/repo/c.ts")),
            PathBuf::from("/repo/c.ts")
        );
    }

    #[test]
    fn preview_uses_located_programs_and_configured_madge() {
        let mut settings = ValidationSettings::default();
        settings.lint.command = Some("tools/eslint".to_string());
        settings.circular.command = Some("madge".to_string());
        let ctx = ValidationContext::full("/repo");

        let lines = command_lines(&ctx, &settings);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("--project tsconfig.json"));
        assert!(lines[1].starts_with("$ /repo/tools/eslint --format json"));
        assert_eq!(lines[2], "$ madge --circular --json --extensions ts,tsx,js,jsx,mjs,cjs src");
    }

    #[test]
    fn preview_names_builtin_cycle_check() {
        let ctx = ValidationContext::full("/repo");
        let lines = command_lines(&ctx, &ValidationSettings::default());
        assert_eq!(lines[2], "# circular: built-in import graph over src");
    }

    #[test]
    fn no_flags_keep_settings() {
        let args = parse(&[]);
        let mut settings = ValidationSettings::default();
        apply_overrides(&mut settings, &args, false);
        assert_eq!(settings, ValidationSettings::default());
    }
}
