use std::path::Path;

use crate::args::build_madge_args;
use crate::classify;
use crate::config::ValidationSettings;
use crate::context::{ValidationContext, ValidationStepResult};
use crate::error::{Result, ValidationError};
use crate::graph::ImportGraph;
use crate::runner::{Invocation, ProcessRunner};
use crate::tool::{locate_tool, ToolKind};

const GRAPH_TOOL: &str = "import graph";

/// Check the whole source tree for import cycles.
///
/// The context scope is deliberately ignored: a cycle can run through files
/// outside any requested subset. The built-in graph is used unless
/// `circular.command` is configured, in which case `runner` drives that tool.
pub async fn run(
    ctx: &ValidationContext,
    source_root: &Path,
    settings: &ValidationSettings,
    runner: &dyn ProcessRunner,
) -> ValidationStepResult {
    let outcome = match settings.circular.command.as_deref() {
        Some(cmd) if !cmd.trim().is_empty() => {
            run_external(ctx.project_root(), source_root, settings, runner).await
        }
        _ => run_builtin(source_root, settings).await,
    };
    outcome.into()
}

async fn run_external(
    root: &Path,
    source_root: &Path,
    settings: &ValidationSettings,
    runner: &dyn ProcessRunner,
) -> Result<()> {
    let program = locate_tool(root, ToolKind::Madge, settings.circular.command.as_deref());
    let args = build_madge_args(
        root,
        source_root,
        &settings.extensions,
        &settings.circular.extra_args,
    );
    let invocation = Invocation::new(program, args, root).with_timeout(settings.timeout());
    let output = runner.spawn(invocation).wait().await;
    classify::madge_outcome(&output)
}

async fn run_builtin(source_root: &Path, settings: &ValidationSettings) -> Result<()> {
    let src = source_root.to_path_buf();
    let extensions = settings.extensions.clone();
    let task = tokio::task::spawn_blocking(move || {
        let graph = ImportGraph::build(&src, &extensions)?;
        tracing::debug!(modules = graph.module_count(), root = %src.display(), "import graph built");
        Ok::<_, ValidationError>(graph.find_cycles())
    });

    let joined = match settings.timeout() {
        None => task.await,
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                return Err(ValidationError::TimedOut {
                    tool: GRAPH_TOOL.to_string(),
                    seconds: limit.as_secs(),
                })
            }
        },
    };

    let cycles = joined
        .map_err(|e| ValidationError::UnexpectedCrash {
            tool: GRAPH_TOOL.to_string(),
            detail: e.to_string(),
        })?
        .map_err(|e| ValidationError::UnexpectedCrash {
            tool: GRAPH_TOOL.to_string(),
            detail: e.to_string(),
        })?;

    if cycles.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::CircularDependencies { cycles })
    }
}
