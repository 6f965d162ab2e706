use crate::error::{FailureKind, Result, ValidationError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ValidationScope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationScope {
    /// Whole project, checked against the base configuration.
    Full,
    /// A named subset of files, checked through an ephemeral configuration.
    Files,
}

// ---------------------------------------------------------------------------
// ValidationContext
// ---------------------------------------------------------------------------

/// What to validate. Built once per run and never mutated afterwards.
///
/// Construct through [`ValidationContext::full`] or
/// [`ValidationContext::files`]; the latter rejects an empty file set so a
/// validator never sees `Files` scope without files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationContext {
    project_root: PathBuf,
    scope: ValidationScope,
    files: Vec<PathBuf>,
}

impl ValidationContext {
    pub fn full(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            scope: ValidationScope::Full,
            files: Vec::new(),
        }
    }

    pub fn files<I, P>(project_root: impl Into<PathBuf>, files: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let files: Vec<PathBuf> = files.into_iter().map(Into::into).collect();
        if files.is_empty() {
            return Err(ValidationError::EmptyFileSet);
        }
        Ok(Self {
            project_root: project_root.into(),
            scope: ValidationScope::Files,
            files,
        })
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn scope(&self) -> ValidationScope {
        self.scope
    }

    /// Requested files in caller order. Empty for `Full` scope.
    pub fn requested_files(&self) -> &[PathBuf] {
        &self.files
    }
}

// ---------------------------------------------------------------------------
// ValidationStepResult
// ---------------------------------------------------------------------------

/// Outcome of one validator invocation.
///
/// `error` is set exactly when `success` is false. It holds a summary derived
/// from the tool output, never the raw output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStepResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, rename = "failure", skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
}

impl ValidationStepResult {
    pub fn passed() -> Self {
        Self {
            success: true,
            error: None,
            kind: None,
        }
    }

    pub fn failed(err: &ValidationError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            kind: Some(err.kind()),
        }
    }
}

impl From<Result<()>> for ValidationStepResult {
    fn from(outcome: Result<()>) -> Self {
        match outcome {
            Ok(()) => Self::passed(),
            Err(e) => Self::failed(&e),
        }
    }
}
