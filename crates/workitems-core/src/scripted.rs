use std::collections::HashMap;
use std::sync::Mutex;

use crate::runner::{ExitStatus, Invocation, ProcessHandle, ProcessOutput, ProcessRunner};

type SpawnHook = Box<dyn Fn(&Invocation) + Send + Sync>;

/// A [`ProcessRunner`] that never starts a process.
///
/// Responses are keyed by program name (`tsc`, `eslint`, ...). Programs with
/// no scripted response get the default, which is a clean exit with no
/// output. Every invocation is recorded for later assertions.
pub struct ScriptedRunner {
    responses: Mutex<HashMap<String, ProcessOutput>>,
    default: ProcessOutput,
    calls: Mutex<Vec<Invocation>>,
    on_spawn: Option<SpawnHook>,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            default: ProcessOutput::exited(0, "", ""),
            calls: Mutex::new(Vec::new()),
            on_spawn: None,
        }
    }

    /// Respond to `program` with `output`.
    pub fn respond(self, program: &str, output: ProcessOutput) -> Self {
        if let Ok(mut r) = self.responses.lock() {
            r.insert(program.to_string(), output);
        }
        self
    }

    /// Respond to `program` as if its binary were missing.
    pub fn missing(self, program: &str) -> Self {
        let message = format!("failed to spawn '{program}': No such file or directory");
        self.respond(
            program,
            ProcessOutput::with_status(ExitStatus::SpawnFailed {
                not_found: true,
                message,
            }),
        )
    }

    pub fn with_default(mut self, output: ProcessOutput) -> Self {
        self.default = output;
        self
    }

    /// Run `hook` synchronously inside every `spawn`, before the response is
    /// returned. Lets tests observe the filesystem while a tool "runs".
    pub fn on_spawn(mut self, hook: impl Fn(&Invocation) + Send + Sync + 'static) -> Self {
        self.on_spawn = Some(Box::new(hook));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.program_name() == program)
            .collect()
    }
}

impl ProcessRunner for ScriptedRunner {
    fn spawn(&self, invocation: Invocation) -> ProcessHandle {
        if let Some(hook) = &self.on_spawn {
            hook(&invocation);
        }
        let output = self
            .responses
            .lock()
            .ok()
            .and_then(|r| r.get(invocation.program_name()).cloned())
            .unwrap_or_else(|| self.default.clone());
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation);
        }
        ProcessHandle::ready(output)
    }
}

impl std::fmt::Debug for ScriptedRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRunner")
            .field("calls", &self.calls().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn returns_scripted_response_by_program_name() {
        let runner = ScriptedRunner::new().respond("tsc", ProcessOutput::exited(2, "boom", ""));
        let out = runner
            .spawn(Invocation::new("/repo/node_modules/.bin/tsc", vec![], "/repo"))
            .wait()
            .await;
        assert_eq!(out.status, ExitStatus::code(2));
        assert_eq!(out.stdout, "boom");
    }

    #[tokio::test]
    async fn unscripted_program_gets_default() {
        let runner = ScriptedRunner::new();
        let out = runner
            .spawn(Invocation::new("eslint", vec![], "/repo"))
            .wait()
            .await;
        assert!(out.status.success());
        assert_eq!(runner.calls_to("eslint").len(), 1);
    }

    #[tokio::test]
    async fn default_response_can_be_replaced() {
        let runner = ScriptedRunner::new().with_default(ProcessOutput::exited(1, "", "nope"));
        let out = runner
            .spawn(Invocation::new("anything", vec![], "/repo"))
            .wait()
            .await;
        assert_eq!(out.status, ExitStatus::code(1));
        assert_eq!(out.stderr, "nope");
    }

    #[tokio::test]
    async fn missing_reports_not_found() {
        let runner = ScriptedRunner::new().missing("madge");
        let out = runner
            .spawn(Invocation::new("madge", vec![], "/repo"))
            .wait()
            .await;
        assert!(matches!(
            out.status,
            ExitStatus::SpawnFailed {
                not_found: true,
                ..
            }
        ));
    }

    #[test]
    fn hook_runs_once_per_spawn() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let runner = ScriptedRunner::new().on_spawn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let _ = runner.spawn(Invocation::new("tsc", vec![], "/"));
        let _ = runner.spawn(Invocation::new("eslint", vec![], "/"));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(runner.calls().len(), 2);
    }
}
