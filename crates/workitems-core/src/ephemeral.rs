//! File-restricted type-check configurations.
//!
//! An [`EphemeralConfig`] lives for exactly one type-check invocation. It is
//! written under the project root with a random file name so concurrent runs
//! never collide, and it is deleted when released or dropped, whichever comes
//! first. Dropping covers early returns and panics between acquisition and
//! release.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Result, ValidationError};
use crate::paths;
use crate::scope::EphemeralConfigRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemeralConfigDescriptor {
    pub path: PathBuf,
    pub base_config: PathBuf,
    pub included_files: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct EphemeralConfig {
    file: Option<NamedTempFile>,
    descriptor: EphemeralConfigDescriptor,
}

impl EphemeralConfig {
    /// Write a config extending `req.base_config` that checks exactly
    /// `req.included_files`.
    pub fn acquire(req: &EphemeralConfigRequest) -> Result<Self> {
        if req.included_files.is_empty() {
            return Err(ValidationError::EmptyFileSet);
        }
        if !req.base_config.is_file() {
            return Err(ValidationError::ConfigGeneration(format!(
                "base config {} not found",
                req.base_config.display()
            )));
        }

        let body = render_config(&req.directory, &req.base_config, &req.included_files)?;

        let mut file = tempfile::Builder::new()
            .prefix(paths::EPHEMERAL_CONFIG_PREFIX)
            .suffix(".json")
            .rand_bytes(10)
            .tempfile_in(&req.directory)
            .map_err(|e| {
                ValidationError::ConfigGeneration(format!(
                    "cannot create config in {}: {e}",
                    req.directory.display()
                ))
            })?;
        let written = file.write_all(body.as_bytes()).and_then(|()| file.flush());
        if let Err(e) = written {
            return Err(ValidationError::ConfigGeneration(format!(
                "cannot write {}: {e}",
                file.path().display()
            )));
        }

        let descriptor = EphemeralConfigDescriptor {
            path: file.path().to_path_buf(),
            base_config: req.base_config.clone(),
            included_files: req.included_files.clone(),
        };
        tracing::debug!(path = %descriptor.path.display(), files = descriptor.included_files.len(), "ephemeral config written");

        Ok(Self {
            file: Some(file),
            descriptor,
        })
    }

    pub fn path(&self) -> &Path {
        &self.descriptor.path
    }

    pub fn descriptor(&self) -> &EphemeralConfigDescriptor {
        &self.descriptor
    }

    /// Delete the config now and report whether deletion succeeded.
    pub fn release(mut self) -> Result<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        file.close().map_err(|e| {
            ValidationError::ConfigGeneration(format!(
                "cannot delete {}: {e}",
                self.descriptor.path.display()
            ))
        })?;
        tracing::debug!(path = %self.descriptor.path.display(), "ephemeral config removed");
        Ok(())
    }
}

/// JSON body of a config in `dir` extending `base` and limited to `files`.
pub fn render_config(dir: &Path, base: &Path, files: &[PathBuf]) -> Result<String> {
    let base_rel = paths::relative_to(dir, base);
    let extends = if base_rel.is_absolute() {
        paths::to_slash(&base_rel)
    } else {
        format!("./{}", paths::to_slash(&base_rel))
    };
    let files: Vec<String> = files
        .iter()
        .map(|f| paths::to_slash(&paths::relative_to(dir, f)))
        .collect();

    let doc = serde_json::json!({
        "extends": extends,
        "compilerOptions": { "noEmit": true },
        "files": files,
        "include": [],
    });
    Ok(serde_json::to_string_pretty(&doc)?)
}
