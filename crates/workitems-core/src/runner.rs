//! Process runner capability.
//!
//! Validators never spawn processes themselves. They hand an [`Invocation`]
//! to a [`ProcessRunner`] passed in by the caller and classify the
//! [`ProcessOutput`] it returns. Production uses [`TokioProcessRunner`]; unit
//! tests use [`crate::scripted::ScriptedRunner`].

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// A single command to run: program, argument list and spawn options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: cwd.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// File name of the program, e.g. `tsc` for `/repo/node_modules/.bin/tsc`.
    pub fn program_name(&self) -> &str {
        std::path::Path::new(&self.program)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.program)
    }

    /// The command line as a single display string.
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

// ---------------------------------------------------------------------------
// ExitStatus / ProcessOutput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExitStatus {
    /// The process exited normally with this code.
    Code { code: i32 },
    /// The process was terminated by a signal (Unix). `None` when the
    /// platform reported no code and no signal.
    Signal { signal: Option<i32> },
    /// The process never started.
    SpawnFailed { not_found: bool, message: String },
    /// The process outlived its timeout and was killed.
    TimedOut { after_ms: u64 },
}

impl ExitStatus {
    pub fn code(code: i32) -> Self {
        ExitStatus::Code { code }
    }

    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Code { code: 0 })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
    pub duration_ms: u64,
}

impl ProcessOutput {
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            status: ExitStatus::code(code),
            duration_ms: 0,
        }
    }

    pub fn with_status(status: ExitStatus) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            status,
            duration_ms: 0,
        }
    }

    /// stdout and stderr joined, whichever are non-empty.
    pub fn combined(&self) -> String {
        let out = self.stdout.trim_end();
        let err = self.stderr.trim_end();
        match (out.is_empty(), err.is_empty()) {
            (true, _) => err.to_string(),
            (_, true) => out.to_string(),
            _ => format!("{out}\n{err}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ProcessRunner / ProcessHandle
// ---------------------------------------------------------------------------

/// Resolves to the [`ProcessOutput`] once the process has terminated.
pub struct ProcessHandle {
    inner: BoxFuture<'static, ProcessOutput>,
}

impl ProcessHandle {
    pub fn new(fut: BoxFuture<'static, ProcessOutput>) -> Self {
        Self { inner: fut }
    }

    /// A handle that is already complete.
    pub fn ready(output: ProcessOutput) -> Self {
        Self {
            inner: futures::future::ready(output).boxed(),
        }
    }

    pub async fn wait(self) -> ProcessOutput {
        self.inner.await
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle").finish_non_exhaustive()
    }
}

pub trait ProcessRunner: Send + Sync {
    /// Start `invocation`. Failure to start is reported through the handle as
    /// [`ExitStatus::SpawnFailed`], never as a panic or early error.
    fn spawn(&self, invocation: Invocation) -> ProcessHandle;
}

// ---------------------------------------------------------------------------
// TokioProcessRunner
// ---------------------------------------------------------------------------

/// Runs real OS processes on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for TokioProcessRunner {
    fn spawn(&self, invocation: Invocation) -> ProcessHandle {
        ProcessHandle::new(run_process(invocation).boxed())
    }
}

async fn run_process(invocation: Invocation) -> ProcessOutput {
    let start = Instant::now();
    tracing::debug!(command = %invocation.display(), cwd = %invocation.cwd.display(), "spawning");

    let mut child = match Command::new(&invocation.program)
        .args(&invocation.args)
        .current_dir(&invocation.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(c) => c,
        Err(e) => {
            let not_found = e.kind() == std::io::ErrorKind::NotFound;
            return ProcessOutput::with_status(ExitStatus::SpawnFailed {
                not_found,
                message: format!("failed to spawn '{}': {e}", invocation.program),
            });
        }
    };

    // Drain both pipes concurrently so a chatty tool never blocks on a full
    // pipe buffer while we wait for it to exit.
    let stdout_buf = Arc::new(Mutex::new(Vec::new()));
    let stderr_buf = Arc::new(Mutex::new(Vec::new()));
    let stdout_task = child
        .stdout
        .take()
        .map(|s| tokio::spawn(drain(s, Arc::clone(&stdout_buf))));
    let stderr_task = child
        .stderr
        .take()
        .map(|s| tokio::spawn(drain(s, Arc::clone(&stderr_buf))));

    let waited = match invocation.timeout {
        None => Some(child.wait().await),
        Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
    };

    let status = match waited {
        Some(Ok(status)) => exit_status(status),
        Some(Err(e)) => ExitStatus::SpawnFailed {
            not_found: false,
            message: format!("wait failed: {e}"),
        },
        None => {
            let _ = child.kill().await;
            let after_ms = invocation
                .timeout
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default();
            tracing::warn!(command = %invocation.display(), after_ms, "process timed out, killed");
            ExitStatus::TimedOut { after_ms }
        }
    };

    // Readers see EOF once the process (and its pipes) are gone. A killed
    // process may leave grandchildren holding the pipes open, so after a
    // timeout keep whatever was read so far.
    let timed_out = matches!(status, ExitStatus::TimedOut { .. });
    for task in [stdout_task, stderr_task].into_iter().flatten() {
        if timed_out {
            task.abort();
        } else {
            let _ = task.await;
        }
    }

    ProcessOutput {
        stdout: take_lossy(&stdout_buf),
        stderr: take_lossy(&stderr_buf),
        status,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

async fn drain<R: AsyncRead + Unpin>(mut reader: R, buf: Arc<Mutex<Vec<u8>>>) {
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if let Ok(mut b) = buf.lock() {
                    b.extend_from_slice(&chunk[..n]);
                }
            }
        }
    }
}

fn take_lossy(buf: &Mutex<Vec<u8>>) -> String {
    buf.lock()
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default()
}

fn exit_status(status: std::process::ExitStatus) -> ExitStatus {
    if let Some(code) = status.code() {
        return ExitStatus::Code { code };
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        ExitStatus::Signal {
            signal: status.signal(),
        }
    }
    #[cfg(not(unix))]
    {
        ExitStatus::Signal { signal: None }
    }
}
