use dorgu_core::paths::APP_CONFIG_FILE;
use std::path::{Path, PathBuf};

/// Resolve the workspace root.
///
/// Priority:
/// 1. `--root` flag / `DORGU_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.dorgu.yaml`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root(&cwd)
}

fn find_upward(start: &Path, found: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    start.ancestors().find(|dir| found(dir)).map(Path::to_path_buf)
}

fn find_root(start: &Path) -> PathBuf {
    find_upward(start, |d| d.join(APP_CONFIG_FILE).is_file())
        .or_else(|| find_upward(start, |d| d.join(".git").is_dir()))
        .unwrap_or_else(|| start.to_path_buf())
}
