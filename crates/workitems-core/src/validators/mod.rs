//! The three validators.
//!
//! Every validator takes the run context, its slice of the [`RunPlan`], the
//! run settings and an injected [`ProcessRunner`], and always returns a
//! [`ValidationStepResult`]. Spawn failures, non-zero exits, crashes,
//! timeouts and config I/O errors all end up in the result, never in a panic
//! or an `Err` crossing this boundary.

pub mod circular;
pub mod lint;
pub mod type_check;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ValidationSettings;
use crate::context::{ValidationContext, ValidationStepResult};
use crate::runner::ProcessRunner;
use crate::scope::RunPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValidatorKind {
    TypeCheck,
    Lint,
    Circular,
}

impl ValidatorKind {
    pub const ALL: [ValidatorKind; 3] = [
        ValidatorKind::TypeCheck,
        ValidatorKind::Lint,
        ValidatorKind::Circular,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidatorKind::TypeCheck => "type-check",
            ValidatorKind::Lint => "lint",
            ValidatorKind::Circular => "circular",
        }
    }
}

impl fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "type-check" | "typecheck" | "types" | "tsc" => Ok(ValidatorKind::TypeCheck),
            "lint" | "eslint" => Ok(ValidatorKind::Lint),
            "circular" | "cycles" | "circular-dependency" => Ok(ValidatorKind::Circular),
            other => Err(format!(
                "unknown validator '{other}': expected type-check, lint or circular"
            )),
        }
    }
}

/// Run one validator against its part of `plan`.
pub async fn run_validator(
    kind: ValidatorKind,
    ctx: &ValidationContext,
    plan: &RunPlan,
    settings: &ValidationSettings,
    runner: &dyn ProcessRunner,
) -> ValidationStepResult {
    match kind {
        ValidatorKind::TypeCheck => type_check::run(ctx, &plan.type_check, settings, runner).await,
        ValidatorKind::Lint => lint::run(ctx, &plan.lint_targets, settings, runner).await,
        ValidatorKind::Circular => circular::run(ctx, &plan.source_root, settings, runner).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("type-check".parse(), Ok(ValidatorKind::TypeCheck));
        assert_eq!("TSC".parse(), Ok(ValidatorKind::TypeCheck));
        assert_eq!("eslint".parse(), Ok(ValidatorKind::Lint));
        assert_eq!(" cycles ".parse(), Ok(ValidatorKind::Circular));
        assert!("format".parse::<ValidatorKind>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for kind in ValidatorKind::ALL {
            assert_eq!(kind.to_string().parse(), Ok(kind));
        }
    }

    #[test]
    fn serializes_kebab_case() {
        let json = serde_json::to_string(&ValidatorKind::TypeCheck).unwrap();
        assert_eq!(json, "\"type-check\"");
    }
}
