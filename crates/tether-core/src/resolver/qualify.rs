//! Extension, main-field and index resolution.

use super::{ResolveError, ResolveOptions, Resolver};
use crate::paths;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound on manifest main-field redirections. Manifests whose main
/// entries point at each other would otherwise restart the loop forever;
/// hitting the cap fails the resolution instead.
const MAIN_REDIRECTION_LIMIT: usize = 32;

impl Resolver {
    /// Turn an unqualified path into a concrete loadable file by probing
    /// extensions, manifest main entries and directory indexes.
    pub fn resolve_unqualified(
        &self,
        unqualified_path: &Path,
        options: &ResolveOptions,
    ) -> Result<PathBuf, ResolveError> {
        apply_extension_resolution(unqualified_path, self.extensions(options)).ok_or_else(|| {
            ResolveError::QualifiedPathResolution {
                unqualified_path: unqualified_path.to_path_buf(),
                request: None,
                issuer: None,
            }
        })
    }
}

/// Folder access and extension selection.
///
/// The loop restarts whenever a manifest main entry moves the path, and
/// only when it actually moved it.
fn apply_extension_resolution(unqualified_path: &Path, extensions: &[String]) -> Option<PathBuf> {
    let mut path = unqualified_path.to_path_buf();

    for _ in 0..MAIN_REDIRECTION_LIMIT {
        let metadata = fs::metadata(&path).ok();
        let is_dir = metadata.as_ref().is_some_and(fs::Metadata::is_dir);

        // An existing plain file ends the search.
        if metadata.is_some() && !is_dir {
            return Some(resolve_final_symlink(&path));
        }

        if is_dir {
            if let Some(main) = manifest_main(&path) {
                let next = paths::clean(&path.join(main));
                if next != path {
                    path = next;
                    continue;
                }
            }
        }

        // Extensions are appended, never substituted: "x.config"
        // qualifies to "x.config.js", not "x.js".
        for extension in extensions {
            let candidate = append_extension(&path, extension);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if is_dir {
            for extension in extensions {
                let index = path.join(format!("index{extension}"));
                if index.is_file() {
                    return Some(index);
                }
            }
        }

        return None;
    }

    None
}

/// Resolve the last path component through a single symlink hop.
///
/// Only the final component is followed, never the full path: earlier
/// symlinks carry the peer-dependency disambiguation context and must
/// stay intact. A bin symlink still resolves to its real file, so
/// relative requests issued from it anchor next to the link target.
fn resolve_final_symlink(path: &Path) -> PathBuf {
    let is_link = fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false);
    if !is_link {
        return path.to_path_buf();
    }

    match fs::read_link(path) {
        Ok(target) => {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            paths::clean(&base.join(target))
        }
        Err(_) => path.to_path_buf(),
    }
}

/// The manifest main entry of `dir`, if present and parseable.
/// Unreadable or invalid manifests behave as if they declared no main.
fn manifest_main(dir: &Path) -> Option<String> {
    let text = fs::read_to_string(dir.join("package.json")).ok()?;
    let manifest: Value = serde_json::from_str(&text).ok()?;
    manifest
        .get("main")?
        .as_str()
        .map(ToString::to_string)
}

fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(extension);
    PathBuf::from(os)
}
