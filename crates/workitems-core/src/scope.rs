use std::path::PathBuf;

use crate::config::ValidationSettings;
use crate::context::{ValidationContext, ValidationScope};
use crate::paths;

/// What the ephemeral config manager needs to write a file-restricted
/// type-check configuration. The unique file path is chosen at acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemeralConfigRequest {
    /// Directory the config is written into (the project root).
    pub directory: PathBuf,
    /// Absolute path of the configuration being extended.
    pub base_config: PathBuf,
    /// Root-relative files to check, in caller order.
    pub included_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeCheckTarget {
    BaseConfig(PathBuf),
    Ephemeral(EphemeralConfigRequest),
}

/// Per-validator configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub type_check: TypeCheckTarget,
    /// Root-relative lint targets: the requested files, or the source dir.
    pub lint_targets: Vec<PathBuf>,
    /// Absolute source directory. Cycle detection always covers all of it.
    pub source_root: PathBuf,
}

/// Turn a context into the configuration each validator needs. Pure.
pub fn resolve(ctx: &ValidationContext, settings: &ValidationSettings) -> RunPlan {
    let root = ctx.project_root();
    let base_config = settings.base_config_path(root);
    let source_root = settings.source_root(root);

    match ctx.scope() {
        ValidationScope::Full => RunPlan {
            type_check: TypeCheckTarget::BaseConfig(base_config),
            lint_targets: vec![paths::relative_to(root, &source_root)],
            source_root,
        },
        ValidationScope::Files => {
            let files: Vec<PathBuf> = ctx
                .requested_files()
                .iter()
                .map(|f| paths::relative_to(root, f))
                .collect();
            RunPlan {
                type_check: TypeCheckTarget::Ephemeral(EphemeralConfigRequest {
                    directory: root.to_path_buf(),
                    base_config,
                    included_files: files.clone(),
                }),
                lint_targets: files,
                source_root,
            }
        }
    }
}
