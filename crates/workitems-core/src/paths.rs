use std::path::{Component, Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const WORKITEMS_DIR: &str = ".workitems";
pub const CONFIG_FILE: &str = ".workitems/config.yaml";
pub const NODE_BIN_DIR: &str = "node_modules/.bin";

/// Prefix of every ephemeral type-check configuration written under the root.
pub const EPHEMERAL_CONFIG_PREFIX: &str = ".tsconfig.workitems-";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn node_bin(root: &Path, name: &str) -> PathBuf {
    root.join(NODE_BIN_DIR).join(name)
}

/// Express `path` relative to `root` when it lives under it.
///
/// Relative inputs are taken as already root-relative. Absolute paths outside
/// the root are returned unchanged.
pub fn relative_to(root: &Path, path: &Path) -> PathBuf {
    if path.is_relative() {
        return normalize(path);
    }
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => PathBuf::from("."),
        Ok(rel) => normalize(rel),
        Err(_) => path.to_path_buf(),
    }
}

/// Lexically drop `.` components and fold `..` into a preceding normal
/// component. Leading `..` are kept; `..` directly under the root is dropped.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                let last = out.components().next_back();
                let foldable = matches!(last, Some(Component::Normal(_)));
                let at_root = matches!(last, Some(Component::RootDir | Component::Prefix(_)));
                if foldable {
                    out.pop();
                } else if !at_root {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Render a path with forward slashes for tool configs and module names.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| match c {
            Component::RootDir => String::new(),
            other => other.as_os_str().to_string_lossy().into_owned(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_to_strips_root() {
        let rel = relative_to(Path::new("/repo"), Path::new("/repo/src/a.ts"));
        assert_eq!(rel, PathBuf::from("src/a.ts"));
    }

    #[test]
    fn relative_to_keeps_outside_paths() {
        let rel = relative_to(Path::new("/repo"), Path::new("/elsewhere/a.ts"));
        assert_eq!(rel, PathBuf::from("/elsewhere/a.ts"));
    }

    #[test]
    fn relative_inputs_are_normalized() {
        let rel = relative_to(Path::new("/repo"), Path::new("./src/../lib/x.ts"));
        assert_eq!(rel, PathBuf::from("lib/x.ts"));
    }

    #[test]
    fn normalize_keeps_every_leading_parent() {
        assert_eq!(
            normalize(Path::new("../../shared/x.ts")),
            PathBuf::from("../../shared/x.ts")
        );
        assert_eq!(normalize(Path::new("a/../../x")), PathBuf::from("../x"));
        assert_eq!(normalize(Path::new("a/b/../c")), PathBuf::from("a/c"));
    }

    #[test]
    fn normalize_stops_at_filesystem_root() {
        assert_eq!(normalize(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize(Path::new("/repo/../../y")), PathBuf::from("/y"));
    }

    #[test]
    fn relative_to_keeps_paths_above_root() {
        let rel = relative_to(Path::new("/repo"), Path::new("../../shared/x.ts"));
        assert_eq!(rel, PathBuf::from("../../shared/x.ts"));
    }

    #[test]
    fn to_slash_joins_components() {
        assert_eq!(to_slash(Path::new("src/util/index.ts")), "src/util/index.ts");
        assert_eq!(to_slash(Path::new("/shared/tsconfig.json")), "/shared/tsconfig.json");
    }

    #[test]
    fn config_path_under_workitems_dir() {
        assert_eq!(
            config_path(Path::new("/repo")),
            PathBuf::from("/repo/.workitems/config.yaml")
        );
    }
}
