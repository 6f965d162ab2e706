//! Runs a set of validators for one context and aggregates the outcome.
//!
//! All requested validators always run; one failing never stops the
//! others. Steps come back in request order regardless of which finished
//! first.

use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::config::ValidationSettings;
use crate::context::{ValidationContext, ValidationStepResult};
use crate::runner::ProcessRunner;
use crate::scope;
use crate::validators::{run_validator, ValidatorKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub kind: ValidatorKind,
    #[serde(flatten)]
    pub result: ValidationStepResult,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub started_at: DateTime<Utc>,
    /// True only if every step succeeded.
    pub success: bool,
    pub steps: Vec<StepReport>,
}

impl ValidationReport {
    pub fn get(&self, kind: ValidatorKind) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| !s.result.success)
    }
}

/// Deduplicate `kinds`, keeping the first occurrence. Empty means all three.
pub fn requested_kinds(kinds: &[ValidatorKind]) -> Vec<ValidatorKind> {
    if kinds.is_empty() {
        return ValidatorKind::ALL.to_vec();
    }
    let mut out: Vec<ValidatorKind> = Vec::with_capacity(kinds.len());
    for kind in kinds {
        if !out.contains(kind) {
            out.push(*kind);
        }
    }
    out
}

/// Run `kinds` against `ctx` and collect one step per distinct validator.
///
/// Steps run concurrently unless `settings.parallel` is off.
pub async fn run_validation(
    ctx: &ValidationContext,
    kinds: &[ValidatorKind],
    settings: &ValidationSettings,
    runner: &dyn ProcessRunner,
) -> ValidationReport {
    let started_at = Utc::now();
    let kinds = requested_kinds(kinds);
    let plan = scope::resolve(ctx, settings);

    tracing::debug!(
        root = %ctx.project_root().display(),
        scope = ?ctx.scope(),
        steps = kinds.len(),
        parallel = settings.parallel,
        "starting validation"
    );

    let plan = &plan;
    let run_step = move |kind: ValidatorKind| {
        async move {
            let started = Instant::now();
            let result = run_validator(kind, ctx, plan, settings, runner).await;
            let duration_ms = started.elapsed().as_millis() as u64;
            log_step(kind, &result, duration_ms);
            StepReport {
                kind,
                result,
                duration_ms,
            }
        }
    };

    let steps = if settings.parallel {
        join_all(kinds.iter().copied().map(run_step)).await
    } else {
        let mut steps = Vec::with_capacity(kinds.len());
        for kind in kinds.iter().copied() {
            steps.push(run_step(kind).await);
        }
        steps
    };

    let success = steps.iter().all(|s| s.result.success);
    ValidationReport {
        started_at,
        success,
        steps,
    }
}

fn log_step(kind: ValidatorKind, result: &ValidationStepResult, duration_ms: u64) {
    if result.success {
        tracing::info!(step = %kind, duration_ms, "passed");
    } else {
        tracing::info!(
            step = %kind,
            duration_ms,
            failure = result.kind.map(|k| k.as_str()).unwrap_or("unknown"),
            "failed"
        );
    }
}
