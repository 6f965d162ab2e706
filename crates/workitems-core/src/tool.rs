//! Location of the external analysis tools.
//!
//! Resolution order for each tool:
//! 1. the `command` configured in `.workitems/config.yaml`
//! 2. `<root>/node_modules/.bin/<name>` (project-local install)
//! 3. `<name>` found on `PATH`
//! 4. the bare name, so the spawn fails and is reported as a missing tool

use std::path::Path;

use crate::paths;

/// The external tools validators can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    TypeScript,
    Eslint,
    Madge,
}

impl ToolKind {
    pub fn binary(&self) -> &'static str {
        match self {
            ToolKind::TypeScript => "tsc",
            ToolKind::Eslint => "eslint",
            ToolKind::Madge => "madge",
        }
    }

    /// npm package that ships the binary, used in "not found" hints.
    pub fn package(&self) -> &'static str {
        match self {
            ToolKind::TypeScript => "typescript",
            ToolKind::Eslint => "eslint",
            ToolKind::Madge => "madge",
        }
    }
}

pub fn locate_tool(root: &Path, kind: ToolKind, configured: Option<&str>) -> String {
    if let Some(cmd) = configured.map(str::trim).filter(|c| !c.is_empty()) {
        // Relative commands with a directory part are taken as root-relative.
        let as_path = Path::new(cmd);
        if as_path.is_relative() && as_path.components().count() > 1 {
            return root.join(as_path).to_string_lossy().into_owned();
        }
        return cmd.to_string();
    }

    let local = paths::node_bin(root, kind.binary());
    if local.is_file() {
        return local.to_string_lossy().into_owned();
    }

    if let Ok(found) = which::which(kind.binary()) {
        return found.to_string_lossy().into_owned();
    }

    kind.binary().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn binary_names_are_stable() {
        assert_eq!(ToolKind::TypeScript.binary(), "tsc");
        assert_eq!(ToolKind::Eslint.binary(), "eslint");
        assert_eq!(ToolKind::Madge.binary(), "madge");
        assert_eq!(ToolKind::TypeScript.package(), "typescript");
    }

    #[test]
    fn configured_command_wins() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            locate_tool(dir.path(), ToolKind::Eslint, Some("my-eslint")),
            "my-eslint"
        );
    }

    #[test]
    fn configured_relative_path_is_rooted() {
        let dir = TempDir::new().unwrap();
        let located = locate_tool(dir.path(), ToolKind::Eslint, Some("tools/eslint"));
        assert_eq!(
            located,
            dir.path().join("tools/eslint").to_string_lossy().into_owned()
        );
    }

    #[test]
    fn prefers_project_local_install() {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("node_modules/.bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("tsc"), "#!/bin/sh\n").unwrap();
        let located = locate_tool(dir.path(), ToolKind::TypeScript, None);
        assert_eq!(located, bin.join("tsc").to_string_lossy().into_owned());
    }

    #[test]
    fn blank_configured_command_is_ignored() {
        let dir = TempDir::new().unwrap();
        let located = locate_tool(dir.path(), ToolKind::Madge, Some("   "));
        assert!(located.ends_with("madge"));
    }
}
