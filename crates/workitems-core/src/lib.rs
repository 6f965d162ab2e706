pub mod args;
pub mod classify;
pub mod config;
pub mod context;
pub mod ephemeral;
pub mod error;
pub mod graph;
pub mod orchestrator;
pub mod paths;
pub mod runner;
pub mod scope;
pub mod scripted;
pub mod tool;
pub mod validators;

pub use args::{build_eslint_args, build_type_script_args};
pub use config::ValidationSettings;
pub use context::{ValidationContext, ValidationScope, ValidationStepResult};
pub use error::{FailureKind, Result, ValidationError};
pub use orchestrator::{run_validation, StepReport, ValidationReport};
pub use runner::{ExitStatus, Invocation, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use scripted::ScriptedRunner;
pub use validators::ValidatorKind;
