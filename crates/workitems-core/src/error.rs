use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{tool} not found: install the `{package}` package in node_modules or put it on PATH")]
    ToolNotFound { tool: String, package: String },

    #[error("{tool} reported failures:\n{summary}")]
    ToolReportedFailure { tool: String, summary: String },

    #[error("{}", describe_cycles(.cycles))]
    CircularDependencies { cycles: Vec<Vec<String>> },

    #[error("ephemeral config error: {0}")]
    ConfigGeneration(String),

    #[error("{tool} crashed: {detail}")]
    UnexpectedCrash { tool: String, detail: String },

    #[error("{tool} timed out after {seconds}s")]
    TimedOut { tool: String, seconds: u64 },

    #[error("file-scoped validation requires at least one file")]
    EmptyFileSet,

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ValidationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ValidationError::ToolNotFound { .. } => FailureKind::ToolNotFound,
            ValidationError::ToolReportedFailure { .. }
            | ValidationError::CircularDependencies { .. } => FailureKind::ToolReportedFailure,
            ValidationError::ConfigGeneration(_) => FailureKind::ConfigGenerationFailure,
            ValidationError::UnexpectedCrash { .. } => FailureKind::UnexpectedCrash,
            ValidationError::TimedOut { .. } => FailureKind::TimedOut,
            ValidationError::EmptyFileSet
            | ValidationError::Config(_)
            | ValidationError::Yaml(_)
            | ValidationError::Json(_) => FailureKind::InvalidRequest,
            ValidationError::Io(_) => FailureKind::UnexpectedCrash,
        }
    }
}

fn describe_cycles(cycles: &[Vec<String>]) -> String {
    let noun = if cycles.len() == 1 {
        "dependency"
    } else {
        "dependencies"
    };
    format!(
        "{} circular {noun} found:\n{}",
        cycles.len(),
        format_cycles(cycles)
    )
}

/// One numbered line per cycle, closing back on its first module.
pub fn format_cycles(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .enumerate()
        .map(|(i, cycle)| {
            let mut chain = cycle.clone();
            if let Some(first) = cycle.first() {
                chain.push(first.clone());
            }
            format!("  {}) {}", i + 1, chain.join(" -> "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Coarse classification of a failed step.
///
/// Only `ToolReportedFailure` means the code under check has a problem; every
/// other kind points at the environment or the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ToolNotFound,
    ToolReportedFailure,
    ConfigGenerationFailure,
    UnexpectedCrash,
    TimedOut,
    InvalidRequest,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ToolNotFound => "tool_not_found",
            FailureKind::ToolReportedFailure => "tool_reported_failure",
            FailureKind::ConfigGenerationFailure => "config_generation_failure",
            FailureKind::UnexpectedCrash => "unexpected_crash",
            FailureKind::TimedOut => "timed_out",
            FailureKind::InvalidRequest => "invalid_request",
        }
    }
}

pub type Result<T> = std::result::Result<T, ValidationError>;
