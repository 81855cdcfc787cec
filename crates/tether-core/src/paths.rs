use std::path::{Component, Path, PathBuf};

/// File name of the dependency graph snapshot produced by the planner.
pub const GRAPH_FILE_NAME: &str = "tether.graph.json";

/// Environment variable overriding the snapshot location.
pub const GRAPH_PATH_ENV: &str = "TETHER_GRAPH";

/// Environment variable whose value is prepended to the executable
/// search path at CLI startup.
pub const BIN_PATH_ENV: &str = "TETHER_BIN_PATH";

/// Find the dependency graph snapshot by walking up from `cwd`.
///
/// Returns the first `tether.graph.json` found, or `None` if the walk
/// reaches the filesystem root without a hit.
#[must_use]
pub fn find_graph_file(cwd: &Path) -> Option<PathBuf> {
    let mut current = cwd.to_path_buf();

    loop {
        let candidate = current.join(GRAPH_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Slash-separated rendering of a path (backslashes normalized away).
#[must_use]
pub fn to_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Whether a path carries the trailing separator that marks it as a
/// directory. The marker is significant: relative requests resolve
/// against the path itself rather than its parent, and install
/// directories only match the location index in their slash-terminated
/// form.
#[must_use]
pub fn denotes_directory(path: &Path) -> bool {
    path.as_os_str().to_string_lossy().ends_with(['/', '\\'])
}

/// Append a trailing slash if `path` does not already end with one.
#[must_use]
pub fn ensure_trailing_slash(mut path: String) -> String {
    if !path.ends_with('/') {
        path.push('/');
    }
    path
}

/// Lexically normalize a path: collapse `.` components and fold `..`
/// into the preceding component where one exists. No filesystem access,
/// so symlinked components are deliberately not expanded.
#[must_use]
pub fn clean(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }

    out.iter().collect()
}

/// Lexical relative path from `base` to `path`.
///
/// Both inputs are cleaned first. When the two share no common prefix
/// (different drives, or a relative `base` that climbs above itself),
/// the cleaned `path` is returned unchanged rather than a bogus `..`
/// chain.
#[must_use]
pub fn relative_to(base: &Path, path: &Path) -> PathBuf {
    let base = clean(base);
    let target = clean(path);

    let mut target_iter = target.components();
    let mut base_iter = base.components();
    let mut out: Vec<Component<'_>> = Vec::new();

    loop {
        match (target_iter.next(), base_iter.next()) {
            (None, None) => break,
            (Some(t), None) => {
                out.push(t);
                out.extend(target_iter);
                break;
            }
            (None, Some(_)) => out.push(Component::ParentDir),
            (Some(t), Some(b)) if out.is_empty() && t == b => {}
            (Some(t), Some(Component::CurDir)) => {
                out.push(t);
                out.extend(target_iter);
                break;
            }
            (Some(_), Some(Component::Prefix(_) | Component::RootDir)) => {
                return target;
            }
            (Some(_), Some(Component::ParentDir)) => {
                return target;
            }
            (Some(t), Some(_)) => {
                out.push(Component::ParentDir);
                for _ in base_iter.by_ref() {
                    out.push(Component::ParentDir);
                }
                out.push(t);
                out.extend(target_iter);
                break;
            }
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }

    out.iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_clean_collapses_dots() {
        assert_eq!(clean(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(clean(Path::new("a/./b")), PathBuf::from("a/b"));
        assert_eq!(clean(Path::new("./x")), PathBuf::from("x"));
    }

    #[test]
    fn test_clean_keeps_leading_parents_for_relative_paths() {
        assert_eq!(clean(Path::new("../../a")), PathBuf::from("../../a"));
        assert_eq!(clean(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_clean_clamps_parent_at_root() {
        assert_eq!(clean(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn test_clean_empty_is_current_dir() {
        assert_eq!(clean(Path::new("")), PathBuf::from("."));
        assert_eq!(clean(Path::new("a/..")), PathBuf::from("."));
    }

    #[test]
    fn test_relative_to_descendant() {
        assert_eq!(
            relative_to(Path::new("/repo"), Path::new("/repo/pkgs/a/lib.js")),
            PathBuf::from("pkgs/a/lib.js")
        );
    }

    #[test]
    fn test_relative_to_sibling() {
        assert_eq!(
            relative_to(Path::new("/repo/a"), Path::new("/repo/b/c")),
            PathBuf::from("../b/c")
        );
    }

    #[test]
    fn test_relative_to_outside_base() {
        assert_eq!(
            relative_to(Path::new("/repo/deep/nest"), Path::new("/store/pkg")),
            PathBuf::from("../../../store/pkg")
        );
    }

    #[test]
    fn test_relative_to_same_path() {
        assert_eq!(
            relative_to(Path::new("/repo"), Path::new("/repo")),
            PathBuf::from(".")
        );
    }

    #[test]
    fn test_denotes_directory() {
        assert!(denotes_directory(Path::new("/a/b/")));
        assert!(!denotes_directory(Path::new("/a/b")));
    }

    #[test]
    fn test_find_graph_file_walks_up() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(GRAPH_FILE_NAME), "{}").unwrap();

        let found = find_graph_file(&nested);
        assert_eq!(found, Some(dir.path().join(GRAPH_FILE_NAME)));
    }

    #[test]
    fn test_find_graph_file_missing() {
        let dir = tempdir().unwrap();
        assert_eq!(find_graph_file(dir.path()), None);
    }
}
