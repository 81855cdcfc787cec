//! Request classification and dependency-edge lookup.

use super::error::HostFallbackReason;
use super::{ResolveError, ResolveOptions, Resolver};
use crate::builtins;
use crate::graph::Locator;
use crate::paths;
use std::path::{Path, PathBuf};

impl Resolver {
    /// Transform a request into an unqualified path.
    ///
    /// The result identifies a package/subpath but is not loadable yet:
    /// no extension probing, no directory-to-index or main-field
    /// resolution has happened. `Ok(None)` means the request names a
    /// builtin and the host loader should take over.
    ///
    /// Issuers that denote a directory must end with a slash; otherwise
    /// relative requests resolve against the issuer's parent.
    ///
    /// This phase is a pure function of `(request, issuer, snapshot)`:
    /// apart from host deferral it never touches the filesystem, so
    /// identical inputs always yield the identical path or the identical
    /// error kind, and callers may cache results freely.
    pub fn resolve_to_unqualified(
        &self,
        request: &str,
        issuer: &Path,
        options: &ResolveOptions,
    ) -> Result<Option<PathBuf>, ResolveError> {
        if options.consider_builtins && builtins::is_builtin(request) {
            return Ok(None);
        }

        if let Some(pattern) = &self.config.ignore_pattern {
            if pattern.is_match(&paths::to_slashes(issuer)) {
                return self
                    .host_resolution(request, issuer, HostFallbackReason::IgnoredIssuer)
                    .map(Some);
            }
        }

        let Some((dependency_name, subpath)) = split_bare_request(request) else {
            // Path requests resolve lexically against the issuer; no
            // dependency check applies.
            return Ok(Some(resolve_path_request(request, issuer)));
        };

        let issuer_locator = match self.find_package_locator(issuer)? {
            Some(locator) => locator.clone(),
            // The issuer is not part of the managed tree; whatever
            // resolution governs it governs this request too.
            None => {
                return self
                    .host_resolution(request, issuer, HostFallbackReason::UnownedIssuer)
                    .map(Some);
            }
        };

        let issuer_info = self.graph.package(&issuer_locator).ok_or_else(|| {
            ResolveError::Internal {
                message: format!(
                    "no manifest for {issuer_locator}, which the location index owns (this is probably an internal error)"
                ),
            }
        })?;

        // Outer None: never declared. Inner None: declared peer
        // dependency with no resolution. The distinction drives the
        // error kind below and must not be collapsed.
        let mut reference: Option<Option<String>> =
            issuer_info.dependencies.get(dependency_name).cloned();

        // A miss on a non-top-level issuer can still be rescued by the
        // fallback list; the first entry that declares the name at all
        // wins.
        if reference.is_none() && !issuer_locator.is_top_level() {
            for fallback in self.graph.fallback() {
                let info = self.graph.package(fallback).ok_or_else(|| {
                    ResolveError::Internal {
                        message: format!("fallback locator {fallback} has no manifest"),
                    }
                })?;

                if let Some(entry) = info.dependencies.get(dependency_name) {
                    reference = Some(entry.clone());
                    break;
                }
            }
        }

        let reference = match reference {
            Some(Some(reference)) => reference,
            Some(None) => {
                return Err(ResolveError::MissingPeerDependency {
                    request: request.to_string(),
                    issuer: issuer.to_path_buf(),
                    issuer_locator,
                    dependency_name: dependency_name.to_string(),
                });
            }
            None => {
                return Err(ResolveError::UndeclaredDependency {
                    request: request.to_string(),
                    issuer: issuer.to_path_buf(),
                    dependency_name: dependency_name.to_string(),
                    candidates: issuer_info.dependencies.keys().cloned().collect(),
                    issuer_locator,
                });
            }
        };

        let dependency_locator = Locator::new(dependency_name, reference);
        let install_dir = self
            .graph
            .package(&dependency_locator)
            .map(|info| self.graph.install_dir(info))
            .unwrap_or_default();

        if install_dir.as_os_str().is_empty() {
            return Err(ResolveError::MissingDependency {
                request: request.to_string(),
                issuer: issuer.to_path_buf(),
                dependency_locator,
            });
        }

        let unqualified = match subpath {
            Some(subpath) => paths::clean(&install_dir.join(subpath)),
            None => install_dir,
        };

        Ok(Some(unqualified))
    }

    fn host_resolution(
        &self,
        request: &str,
        issuer: &Path,
        reason: HostFallbackReason,
    ) -> Result<PathBuf, ResolveError> {
        self.host
            .resolve(request, issuer)
            .ok_or_else(|| ResolveError::HostResolution {
                request: request.to_string(),
                issuer: issuer.to_path_buf(),
                reason,
            })
    }
}

/// Split a bare request into dependency name and optional subpath.
/// Returns `None` for path requests (relative, absolute, drive-letter
/// and UNC forms), which never go through the dependency tables.
fn split_bare_request(request: &str) -> Option<(&str, Option<&str>)> {
    if request.is_empty() || is_path_request(request) {
        return None;
    }

    // A scoped name spans two segments: "@scope/name".
    let name_end = if request.starts_with('@') {
        let Some(first_slash) = request.find('/') else {
            return Some((request, None));
        };
        request[first_slash + 1..]
            .find('/')
            .map(|offset| first_slash + 1 + offset)
    } else {
        request.find('/')
    };

    match name_end {
        Some(end) => Some((&request[..end], non_empty(&request[end + 1..]))),
        None => Some((request, None)),
    }
}

fn non_empty(subpath: &str) -> Option<&str> {
    if subpath.is_empty() {
        None
    } else {
        Some(subpath)
    }
}

fn is_path_request(request: &str) -> bool {
    if request == "." || request == ".." {
        return true;
    }

    if request.starts_with("./") || request.starts_with("../") || request.starts_with('/') {
        return true;
    }

    // Windows forms: UNC shares and drive letters.
    if request.starts_with("\\\\") {
        return true;
    }
    let bytes = request.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Resolve a path request lexically against the issuer.
fn resolve_path_request(request: &str, issuer: &Path) -> PathBuf {
    let request_path = Path::new(request);
    if request_path.has_root() {
        return paths::clean(request_path);
    }

    let base = if paths::denotes_directory(issuer) {
        issuer.to_path_buf()
    } else {
        issuer
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    };

    paths::clean(&base.join(request_path))
}
