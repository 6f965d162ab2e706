use std::path::{Path, PathBuf};

use workitems_core::paths::WORKITEMS_DIR;

/// Markers tried in order; the first one found walking upward wins.
const MARKERS: &[&str] = &[WORKITEMS_DIR, "package.json", ".git"];

/// Resolve the project root.
///
/// Priority:
/// 1. `--root` flag / `WORKITEMS_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.workitems/`
/// 3. Walk upward from `cwd` looking for `package.json`
/// 4. Walk upward from `cwd` looking for `.git/`
/// 5. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root_from(&cwd).unwrap_or(cwd)
}

fn find_root_from(start: &Path) -> Option<PathBuf> {
    MARKERS.iter().find_map(|marker| {
        start
            .ancestors()
            .find(|dir| dir.join(marker).exists())
            .map(Path::to_path_buf)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_root_wins() {
        let dir = TempDir::new().unwrap();
        let result = resolve_root(Some(dir.path()));
        assert_eq!(result, dir.path());
    }

    #[test]
    fn finds_workitems_dir_above_package_json() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".workitems")).unwrap();
        let pkg = dir.path().join("packages/app");
        std::fs::create_dir_all(pkg.join("src/deep")).unwrap();
        std::fs::write(pkg.join("package.json"), "{}").unwrap();

        let found = find_root_from(&pkg.join("src/deep")).unwrap();
        assert_eq!(found, dir.path());
    }

    #[test]
    fn package_json_beats_git() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        let pkg = dir.path().join("web");
        std::fs::create_dir_all(pkg.join("src")).unwrap();
        std::fs::write(pkg.join("package.json"), "{}").unwrap();

        assert_eq!(find_root_from(&pkg.join("src")).unwrap(), pkg);
    }
}
