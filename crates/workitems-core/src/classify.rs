//! Pure classifiers from raw process output to step outcomes.
//!
//! Each classifier looks only at the exit status and the captured streams.
//! None of them spawn anything, so they are tested with synthetic output.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::context::ValidationStepResult;
use crate::error::{Result, ValidationError};
use crate::paths;
use crate::runner::{ExitStatus, ProcessOutput};
use crate::tool::ToolKind;

/// Tool output quoted in an error is capped to its last 10 KiB.
pub const MAX_QUOTED_OUTPUT: usize = 10 * 1024;

const MAX_DIAGNOSTIC_LINES: usize = 20;
const MAX_LINT_LINES: usize = 50;

// ---------------------------------------------------------------------------
// Shared status handling
// ---------------------------------------------------------------------------

/// Failures every tool shares: could not start, killed, timed out.
/// `None` means the tool exited normally with a code.
pub fn status_failure(tool: ToolKind, output: &ProcessOutput) -> Option<ValidationError> {
    let name = tool.binary().to_string();
    match &output.status {
        ExitStatus::Code { .. } => None,
        ExitStatus::SpawnFailed {
            not_found: true, ..
        } => Some(ValidationError::ToolNotFound {
            tool: name,
            package: tool.package().to_string(),
        }),
        ExitStatus::SpawnFailed { message, .. } => Some(ValidationError::UnexpectedCrash {
            tool: name,
            detail: message.clone(),
        }),
        ExitStatus::Signal { signal } => {
            let detail = match signal {
                Some(sig) => format!("terminated by signal {sig}"),
                None => "terminated without an exit status".to_string(),
            };
            Some(ValidationError::UnexpectedCrash {
                tool: name,
                detail: with_output(detail, output),
            })
        }
        ExitStatus::TimedOut { after_ms } => Some(ValidationError::TimedOut {
            tool: name,
            seconds: after_ms.div_ceil(1000),
        }),
    }
}

fn exit_code(output: &ProcessOutput) -> i32 {
    match output.status {
        ExitStatus::Code { code } => code,
        _ => -1,
    }
}

fn with_output(detail: String, output: &ProcessOutput) -> String {
    let text = output.combined();
    if text.is_empty() {
        detail
    } else {
        format!("{detail}\n{}", cap_tail(&text, MAX_QUOTED_OUTPUT))
    }
}

/// Keep the last `max` bytes of `text`, cut on a char boundary.
pub fn cap_tail(text: &str, max: usize) -> &str {
    let trimmed = text.trim();
    if trimmed.len() <= max {
        return trimmed;
    }
    let mut start = trimmed.len() - max;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    &trimmed[start..]
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{n} {}", if n == 1 { one } else { many })
}

// ---------------------------------------------------------------------------
// Type check
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticCategory {
    Type,
    Syntax,
    Configuration,
}

impl DiagnosticCategory {
    /// TS1xxx are parser errors, TS5xxx/TS6xxx compiler-option and project
    /// errors, everything else comes from the checker.
    pub fn from_code(code: u32) -> Self {
        match code / 1000 {
            1 => DiagnosticCategory::Syntax,
            5 | 6 => DiagnosticCategory::Configuration,
            _ => DiagnosticCategory::Type,
        }
    }

    fn noun(&self, n: usize) -> String {
        match self {
            DiagnosticCategory::Type => plural(n, "type error", "type errors"),
            DiagnosticCategory::Syntax => plural(n, "syntax error", "syntax errors"),
            DiagnosticCategory::Configuration => {
                plural(n, "configuration error", "configuration errors")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDiagnostic {
    pub file: Option<String>,
    pub code: u32,
    pub line: String,
}

impl TypeDiagnostic {
    pub fn category(&self) -> DiagnosticCategory {
        DiagnosticCategory::from_code(self.code)
    }
}

fn ts_error_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?P<file>.+?)(?:\(\d+,\d+\):?|:\d+:\d+)\s*-?\s*)?error TS(?P<code>\d+):")
            .unwrap()
    })
}

/// Every `error TSnnnn` line in `text`.
pub fn parse_type_diagnostics(text: &str) -> Vec<TypeDiagnostic> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            let caps = ts_error_re().captures(line)?;
            let code = caps.name("code")?.as_str().parse().ok()?;
            Some(TypeDiagnostic {
                file: caps.name("file").map(|m| m.as_str().to_string()),
                code,
                line: line.to_string(),
            })
        })
        .collect()
}

pub(crate) fn type_check_outcome(output: &ProcessOutput) -> Result<()> {
    if let Some(err) = status_failure(ToolKind::TypeScript, output) {
        return Err(err);
    }
    let code = exit_code(output);
    if code == 0 {
        return Ok(());
    }

    let diagnostics = parse_type_diagnostics(&output.combined());
    let summary = if diagnostics.is_empty() {
        let text = output.combined();
        if text.is_empty() {
            format!("type check failed with exit code {code}")
        } else {
            format!(
                "type check failed with exit code {code}\n{}",
                cap_tail(&text, MAX_QUOTED_OUTPUT)
            )
        }
    } else {
        summarize_type_diagnostics(&diagnostics)
    };

    Err(ValidationError::ToolReportedFailure {
        tool: ToolKind::TypeScript.binary().to_string(),
        summary,
    })
}

fn summarize_type_diagnostics(diagnostics: &[TypeDiagnostic]) -> String {
    let categories: BTreeSet<DiagnosticCategory> =
        diagnostics.iter().map(TypeDiagnostic::category).collect();
    let counts: Vec<String> = categories
        .iter()
        .map(|cat| cat.noun(diagnostics.iter().filter(|d| d.category() == *cat).count()))
        .collect();
    let files: BTreeSet<&str> = diagnostics.iter().filter_map(|d| d.file.as_deref()).collect();

    let mut summary = counts.join(", ");
    if !files.is_empty() {
        summary.push_str(&format!(" in {}", plural(files.len(), "file", "files")));
    }
    for d in diagnostics.iter().take(MAX_DIAGNOSTIC_LINES) {
        summary.push_str("\n  ");
        summary.push_str(&d.line);
    }
    if diagnostics.len() > MAX_DIAGNOSTIC_LINES {
        summary.push_str(&format!(
            "\n  ... and {} more",
            diagnostics.len() - MAX_DIAGNOSTIC_LINES
        ));
    }
    summary
}

/// Classify a `tsc --noEmit` run.
pub fn classify_type_check(output: &ProcessOutput) -> ValidationStepResult {
    type_check_outcome(output).into()
}

// ---------------------------------------------------------------------------
// Lint
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintFile {
    file_path: String,
    #[serde(default)]
    messages: Vec<EslintMessage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintMessage {
    #[serde(default)]
    rule_id: Option<String>,
    #[serde(default)]
    severity: u8,
    message: String,
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
}

fn parse_eslint_json(stdout: &str) -> Option<Vec<EslintFile>> {
    // Some wrappers print a banner before the JSON array.
    let start = stdout.find('[')?;
    serde_json::from_str(stdout[start..].trim()).ok()
}

pub(crate) fn lint_outcome(project_root: &Path, output: &ProcessOutput) -> Result<()> {
    if let Some(err) = status_failure(ToolKind::Eslint, output) {
        return Err(err);
    }
    let tool = ToolKind::Eslint.binary().to_string();
    let code = exit_code(output);
    match code {
        0 => Ok(()),
        // ESLint uses 2 for its own failures: bad config, missing plugin, crash.
        2 => Err(ValidationError::UnexpectedCrash {
            tool,
            detail: with_output(
                "exited with code 2 (configuration or internal error)".to_string(),
                output,
            ),
        }),
        _ => {
            let summary = match parse_eslint_json(&output.stdout) {
                Some(files) => summarize_eslint(project_root, &files),
                None => {
                    let text = output.combined();
                    format!(
                        "lint violations reported (exit code {code})\n{}",
                        cap_tail(&text, MAX_QUOTED_OUTPUT)
                    )
                }
            };
            Err(ValidationError::ToolReportedFailure { tool, summary })
        }
    }
}

fn summarize_eslint(project_root: &Path, files: &[EslintFile]) -> String {
    let mut errors = 0;
    let mut warnings = 0;
    let mut lines = Vec::new();
    let mut dirty_files = 0;

    for file in files.iter().filter(|f| !f.messages.is_empty()) {
        dirty_files += 1;
        let rel = paths::to_slash(&paths::relative_to(project_root, Path::new(&file.file_path)));
        for msg in &file.messages {
            let severity = if msg.severity >= 2 {
                errors += 1;
                "error"
            } else {
                warnings += 1;
                "warning"
            };
            let rule = msg
                .rule_id
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            lines.push(format!(
                "{rel}:{}:{} {severity} {}{rule}",
                msg.line.unwrap_or(0),
                msg.column.unwrap_or(0),
                msg.message.trim()
            ));
        }
    }

    let mut summary = format!(
        "{} and {} in {}",
        plural(errors, "lint error", "lint errors"),
        plural(warnings, "warning", "warnings"),
        plural(dirty_files, "file", "files")
    );
    for line in lines.iter().take(MAX_LINT_LINES) {
        summary.push_str("\n  ");
        summary.push_str(line);
    }
    if lines.len() > MAX_LINT_LINES {
        summary.push_str(&format!("\n  ... and {} more", lines.len() - MAX_LINT_LINES));
    }
    summary
}

/// Classify an `eslint --format json` run.
pub fn classify_lint(project_root: &Path, output: &ProcessOutput) -> ValidationStepResult {
    lint_outcome(project_root, output).into()
}

// ---------------------------------------------------------------------------
// Circular dependencies (external tool)
// ---------------------------------------------------------------------------

pub(crate) fn madge_outcome(output: &ProcessOutput) -> Result<()> {
    if let Some(err) = status_failure(ToolKind::Madge, output) {
        return Err(err);
    }
    let start = output.stdout.find('[');
    let parsed: Option<Vec<Vec<String>>> =
        start.and_then(|s| serde_json::from_str(output.stdout[s..].trim()).ok());

    match parsed {
        Some(cycles) if cycles.is_empty() => Ok(()),
        Some(cycles) => Err(ValidationError::CircularDependencies { cycles }),
        None if exit_code(output) == 0 => Ok(()),
        None => Err(ValidationError::UnexpectedCrash {
            tool: ToolKind::Madge.binary().to_string(),
            detail: with_output(
                format!("exited with code {} and no cycle report", exit_code(output)),
                output,
            ),
        }),
    }
}

/// Classify a `madge --circular --json` run.
pub fn classify_circular(output: &ProcessOutput) -> ValidationStepResult {
    madge_outcome(output).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    const TSC_TYPE_ERRORS: &str = "src/index.ts(3,7): error TS2322: Type 'string' is not assignable to type 'number'.\nsrc/util.ts(10,1): error TS2304: Cannot find name 'foo'.\n";

    #[test]
    fn tsc_zero_exit_passes() {
        let r = classify_type_check(&ProcessOutput::exited(0, "", ""));
        assert!(r.success);
        assert!(r.error.is_none());
    }

    #[test]
    fn tsc_type_errors_are_summarized() {
        let r = classify_type_check(&ProcessOutput::exited(2, TSC_TYPE_ERRORS, ""));
        assert!(!r.success);
        let err = r.error.unwrap();
        assert!(err.contains("2 type errors in 2 files"), "got: {err}");
        assert!(err.contains("TS2322"));
        assert_eq!(r.kind, Some(FailureKind::ToolReportedFailure));
    }

    #[test]
    fn tsc_categories_are_named() {
        let out = "src/a.ts(1,5): error TS1005: ';' expected.\nerror TS5083: Cannot read file 'tsconfig.json'.\n";
        let err = classify_type_check(&ProcessOutput::exited(1, out, ""))
            .error
            .unwrap();
        assert!(err.contains("1 syntax error"), "got: {err}");
        assert!(err.contains("1 configuration error"), "got: {err}");
    }

    #[test]
    fn tsc_without_diagnostics_still_mentions_type_check() {
        let err = classify_type_check(&ProcessOutput::exited(1, "", "something odd"))
            .error
            .unwrap();
        assert!(err.to_lowercase().contains("type check failed with exit code 1"));
        assert!(err.contains("something odd"));
    }

    #[test]
    fn tsc_pretty_format_is_recognized() {
        let diags = parse_type_diagnostics("src/a.ts:3:7 - error TS2322: Type 'x'.\n");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].file.as_deref(), Some("src/a.ts"));
        assert_eq!(diags[0].category(), DiagnosticCategory::Type);
    }

    #[test]
    fn missing_tool_is_not_a_violation() {
        let out = ProcessOutput::with_status(ExitStatus::SpawnFailed {
            not_found: true,
            message: "nope".into(),
        });
        let r = classify_type_check(&out);
        assert_eq!(r.kind, Some(FailureKind::ToolNotFound));
        assert!(r.error.unwrap().contains("tsc not found"));
    }

    #[test]
    fn signal_is_unexpected_crash() {
        let out = ProcessOutput::with_status(ExitStatus::Signal { signal: Some(9) });
        let r = classify_lint(Path::new("/repo"), &out);
        assert_eq!(r.kind, Some(FailureKind::UnexpectedCrash));
        assert!(r.error.unwrap().contains("signal 9"));
    }

    #[test]
    fn timeout_is_distinct() {
        let out = ProcessOutput::with_status(ExitStatus::TimedOut { after_ms: 1500 });
        let r = classify_type_check(&out);
        assert_eq!(r.kind, Some(FailureKind::TimedOut));
        assert_eq!(r.error.as_deref(), Some("tsc timed out after 2s"));
    }

    #[test]
    fn eslint_json_is_summarized() {
        let json = r#"[
            {"filePath":"/repo/src/a.ts","messages":[
                {"ruleId":"no-unused-vars","severity":2,"message":"'x' is assigned a value but never used.","line":3,"column":7},
                {"ruleId":"prefer-const","severity":1,"message":"Use const.","line":4,"column":1}
            ],"errorCount":1,"warningCount":1},
            {"filePath":"/repo/src/b.ts","messages":[],"errorCount":0,"warningCount":0}
        ]"#;
        let r = classify_lint(Path::new("/repo"), &ProcessOutput::exited(1, json, ""));
        assert!(!r.success);
        let err = r.error.unwrap();
        assert!(err.contains("1 lint error and 1 warning in 1 file"), "got: {err}");
        assert!(err.contains("src/a.ts:3:7 error 'x' is assigned a value but never used. (no-unused-vars)"));
        assert!(!err.contains("src/b.ts"));
    }

    #[test]
    fn eslint_unparseable_output_falls_back_to_text() {
        let r = classify_lint(
            Path::new("/repo"),
            &ProcessOutput::exited(1, "src/a.ts\n  3:7  error  no-unused-vars", ""),
        );
        let err = r.error.unwrap();
        assert!(err.contains("lint violations reported"));
        assert!(err.contains("no-unused-vars"));
    }

    #[test]
    fn eslint_exit_two_is_crash() {
        let r = classify_lint(
            Path::new("/repo"),
            &ProcessOutput::exited(2, "", "Oops! Something went wrong!"),
        );
        assert_eq!(r.kind, Some(FailureKind::UnexpectedCrash));
        assert!(r.error.unwrap().contains("Something went wrong"));
    }

    #[test]
    fn eslint_clean_passes() {
        let r = classify_lint(Path::new("/repo"), &ProcessOutput::exited(0, "[]", ""));
        assert!(r.success);
    }

    #[test]
    fn madge_cycles_fail() {
        let r = classify_circular(&ProcessOutput::exited(1, r#"[["a.ts","b.ts"]]"#, ""));
        assert!(!r.success);
        assert!(r.error.unwrap().contains("a.ts -> b.ts -> a.ts"));
    }

    #[test]
    fn madge_empty_report_passes() {
        assert!(classify_circular(&ProcessOutput::exited(0, "[]\n", "")).success);
    }

    #[test]
    fn madge_garbage_with_failure_code_is_crash() {
        let r = classify_circular(&ProcessOutput::exited(1, "", "TypeError: x"));
        assert_eq!(r.kind, Some(FailureKind::UnexpectedCrash));
    }

    #[test]
    fn cap_tail_keeps_end_on_char_boundary() {
        let text = format!("{}é-end", "a".repeat(20));
        let capped = cap_tail(&text, 5);
        assert!(capped.ends_with("-end"));
        assert!(capped.len() <= 5);
    }
}
