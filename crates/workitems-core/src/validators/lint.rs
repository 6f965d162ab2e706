use std::path::PathBuf;

use crate::args::build_eslint_args;
use crate::classify;
use crate::config::ValidationSettings;
use crate::context::{ValidationContext, ValidationStepResult};
use crate::runner::{Invocation, ProcessRunner};
use crate::tool::{locate_tool, ToolKind};

/// Lint `targets` (root-relative files or the source directory).
pub async fn run(
    ctx: &ValidationContext,
    targets: &[PathBuf],
    settings: &ValidationSettings,
    runner: &dyn ProcessRunner,
) -> ValidationStepResult {
    let root = ctx.project_root();
    let program = locate_tool(root, ToolKind::Eslint, settings.lint.command.as_deref());
    let args = build_eslint_args(root, targets, &settings.lint.extra_args);
    let invocation = Invocation::new(program, args, root).with_timeout(settings.timeout());
    let output = runner.spawn(invocation).wait().await;
    classify::lint_outcome(root, &output).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::runner::ProcessOutput;
    use crate::scope::resolve;
    use crate::scripted::ScriptedRunner;

    const UNUSED_VAR: &str = r#"[{"filePath":"/repo/src/a.ts","messages":[{"ruleId":"@typescript-eslint/no-unused-vars","severity":2,"message":"'unused' is assigned a value but never used.","line":1,"column":7}],"errorCount":1,"warningCount":0}]"#;

    async fn lint(ctx: &ValidationContext, runner: &ScriptedRunner) -> ValidationStepResult {
        let settings = ValidationSettings::default();
        let plan = resolve(ctx, &settings);
        run(ctx, &plan.lint_targets, &settings, runner).await
    }

    #[tokio::test]
    async fn violation_fails_with_lint_summary() {
        let runner = ScriptedRunner::new().respond("eslint", ProcessOutput::exited(1, UNUSED_VAR, ""));
        let result = lint(&ValidationContext::full("/repo"), &runner).await;
        assert!(!result.success);
        let err = result.error.unwrap();
        assert!(err.contains("1 lint error"), "got: {err}");
        assert!(err.contains("no-unused-vars"));
        assert_eq!(result.kind, Some(FailureKind::ToolReportedFailure));
    }

    #[tokio::test]
    async fn clean_run_passes() {
        let runner = ScriptedRunner::new().respond("eslint", ProcessOutput::exited(0, "[]", ""));
        let result = lint(&ValidationContext::full("/repo"), &runner).await;
        assert!(result.success);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn full_scope_lints_source_dir() {
        let runner = ScriptedRunner::new();
        let _ = lint(&ValidationContext::full("/repo"), &runner).await;
        let call = &runner.calls_to("eslint")[0];
        assert_eq!(call.args.last().map(String::as_str), Some("src"));
        assert!(call.args.windows(2).any(|w| w == ["--format", "json"]));
    }

    #[tokio::test]
    async fn files_scope_lints_only_requested_files() {
        let runner = ScriptedRunner::new();
        let ctx = ValidationContext::files("/repo", ["/repo/src/b.ts", "src/a.ts"]).unwrap();
        let _ = lint(&ctx, &runner).await;
        let call = &runner.calls_to("eslint")[0];
        let n = call.args.len();
        assert_eq!(call.args[n - 2..], ["src/b.ts", "src/a.ts"]);
    }

    #[tokio::test]
    async fn missing_eslint_is_tool_not_found() {
        let runner = ScriptedRunner::new().missing("eslint");
        let result = lint(&ValidationContext::full("/repo"), &runner).await;
        assert_eq!(result.kind, Some(FailureKind::ToolNotFound));
        assert!(result.error.unwrap().contains("eslint"));
    }
}
