use std::path::Path;

use crate::args::build_type_script_args;
use crate::classify;
use crate::config::ValidationSettings;
use crate::context::{ValidationContext, ValidationStepResult};
use crate::ephemeral::EphemeralConfig;
use crate::error::Result;
use crate::runner::{Invocation, ProcessRunner};
use crate::scope::TypeCheckTarget;
use crate::tool::{locate_tool, ToolKind};

/// Type-check the project, or only the requested files through an
/// ephemeral configuration that is removed before this returns.
pub async fn run(
    ctx: &ValidationContext,
    target: &TypeCheckTarget,
    settings: &ValidationSettings,
    runner: &dyn ProcessRunner,
) -> ValidationStepResult {
    check(ctx, target, settings, runner).await.into()
}

async fn check(
    ctx: &ValidationContext,
    target: &TypeCheckTarget,
    settings: &ValidationSettings,
    runner: &dyn ProcessRunner,
) -> Result<()> {
    let root = ctx.project_root();
    match target {
        TypeCheckTarget::BaseConfig(config) => run_tsc(root, config, settings, runner).await,
        TypeCheckTarget::Ephemeral(req) => {
            // Dropping `ephemeral` deletes the file, so an early return or
            // panic inside `run_tsc` cannot leak it.
            let ephemeral = EphemeralConfig::acquire(req)?;
            let outcome = run_tsc(root, ephemeral.path(), settings, runner).await;
            let released = ephemeral.release();
            match (outcome, released) {
                (Ok(()), released) => released,
                (Err(e), Ok(())) => Err(e),
                (Err(e), Err(cleanup)) => {
                    tracing::warn!(error = %cleanup, "ephemeral config cleanup failed");
                    Err(e)
                }
            }
        }
    }
}

async fn run_tsc(
    root: &Path,
    config: &Path,
    settings: &ValidationSettings,
    runner: &dyn ProcessRunner,
) -> Result<()> {
    let program = locate_tool(
        root,
        ToolKind::TypeScript,
        settings.type_check.command.as_deref(),
    );
    let args = build_type_script_args(root, config, &settings.type_check.extra_args);
    let invocation = Invocation::new(program, args, root).with_timeout(settings.timeout());
    let output = runner.spawn(invocation).wait().await;
    classify::type_check_outcome(&output)
}
