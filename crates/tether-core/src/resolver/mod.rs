//! Dependency-scoped request resolution.
//!
//! Resolution happens in two phases. The first transforms a request into
//! an "unqualified" path: the package name is swapped for its install
//! directory, but the result may not be loadable yet (no extension, a
//! directory, a manifest main entry). The second qualifies that path
//! into a concrete file. [`Resolver::resolve_request`] runs both in one
//! go; the phases stay public for hosts that cache in between.
//!
//! Every cross-package step checks a declared dependency edge in the
//! graph; there is no ambient directory-tree search.

mod error;
mod locate;
mod qualify;
mod request;

pub use error::{codes, HostFallbackReason, ResolveError};

use crate::graph::DependencyGraph;
use crate::paths;
use regex_lite::Regex;
use std::path::{Path, PathBuf};

/// Extensions probed when qualifying a path, in priority order.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".json", ".node"];

/// The reserved request name that resolves to the resolver's own
/// interface rather than to a file on disk.
pub const API_MODULE_NAME: &str = "tetherapi";

/// The surrounding loader's resolution algorithm.
///
/// Consulted only when the issuer is ignored by configuration or not
/// owned by the dependency graph. Implementations resolve with their own
/// search rules and must not route back through [`Resolver`]; returning
/// `None` means the host could not resolve the request either.
///
/// Host loaders integrating the resolver route every module load and
/// module-path probe through [`Resolver::resolve_request`], serve
/// builtins and [`API_MODULE_NAME`] themselves, and keep their own load
/// cache keyed by the qualified path.
pub trait HostResolver: Send + Sync + std::fmt::Debug {
    fn resolve(&self, request: &str, issuer: &Path) -> Option<PathBuf>;
}

/// Host resolver that never resolves anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHostResolver;

impl HostResolver for NoHostResolver {
    fn resolve(&self, _request: &str, _issuer: &Path) -> Option<PathBuf> {
        None
    }
}

/// Resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Extensions to probe during qualification (in order).
    pub extensions: Vec<String>,

    /// Issuers matching this pattern bypass the graph entirely and
    /// resolve through the host. Useful for legacy subtrees that carry
    /// their own nested dependency layout.
    pub ignore_pattern: Option<Regex>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
            ignore_pattern: None,
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Treat builtin names as handled by the host loader.
    pub consider_builtins: bool,

    /// Extension override for this call; `None` uses the resolver's
    /// configured list.
    pub extensions: Option<Vec<String>>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            consider_builtins: true,
            extensions: None,
        }
    }
}

/// Outcome of a combined resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The request names a builtin; the host loader takes over.
    Deferred,
    /// A concrete, loadable file.
    Path(PathBuf),
    /// The reserved self-reference request; expose the resolver API.
    Api,
}

/// The resolution engine over one immutable graph snapshot.
///
/// All methods take `&self`: resolution is synchronous, has no shared
/// mutable state, and is safe to call concurrently from many threads.
#[derive(Debug)]
pub struct Resolver {
    graph: DependencyGraph,
    config: ResolverConfig,
    host: Box<dyn HostResolver>,
}

impl Resolver {
    #[must_use]
    pub fn new(graph: DependencyGraph) -> Self {
        Self {
            graph,
            config: ResolverConfig::default(),
            host: Box::new(NoHostResolver),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: impl HostResolver + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Resolve a request to a loadable file in one go.
    ///
    /// Apart from one deterministic exception there are no automatic
    /// retries: when the failure came from deferred host resolution and
    /// the issuer was not in canonical form, the resolution is retried
    /// once with the canonicalized issuer. A retry that succeeds still
    /// fails the call, with [`ResolveError::SymlinkedPath`] naming the
    /// canonical issuer - the actual bug is the caller invoking modules
    /// through a symlinked path, and that error says how to fix it.
    pub fn resolve_request(
        &self,
        request: &str,
        issuer: &Path,
        options: &ResolveOptions,
    ) -> Result<Resolution, ResolveError> {
        if request == API_MODULE_NAME {
            return Ok(Resolution::Api);
        }

        let Some(unqualified) = self.resolve_with_canonical_retry(request, issuer, options)?
        else {
            return Ok(Resolution::Deferred);
        };

        match self.resolve_unqualified(&unqualified, options) {
            Ok(path) => Ok(Resolution::Path(path)),
            Err(ResolveError::QualifiedPathResolution {
                unqualified_path, ..
            }) => Err(ResolveError::QualifiedPathResolution {
                unqualified_path,
                request: Some(request.to_string()),
                issuer: Some(issuer.to_path_buf()),
            }),
            Err(other) => Err(other),
        }
    }

    /// Identical to [`resolve_request`](Self::resolve_request), for
    /// collaborators that require a completion-callback convention. The
    /// callback is invoked exactly once, synchronously, with either a
    /// result or an error.
    pub fn resolve_request_deferred<F>(
        &self,
        request: &str,
        issuer: &Path,
        options: &ResolveOptions,
        done: F,
    ) where
        F: FnOnce(Result<Resolution, ResolveError>),
    {
        done(self.resolve_request(request, issuer, options));
    }

    /// First resolution phase plus the single-shot canonical-issuer
    /// recovery described on [`resolve_request`](Self::resolve_request).
    fn resolve_with_canonical_retry(
        &self,
        request: &str,
        issuer: &Path,
        options: &ResolveOptions,
    ) -> Result<Option<PathBuf>, ResolveError> {
        let original = match self.resolve_to_unqualified(request, issuer, options) {
            Ok(path) => return Ok(path),
            Err(error @ ResolveError::HostResolution { .. }) => error,
            Err(error) => return Err(error),
        };

        let Some(real_issuer) = canonical_issuer(issuer) else {
            return Err(original);
        };
        if real_issuer == issuer {
            return Err(original);
        }

        match self.resolve_to_unqualified(request, &real_issuer, options) {
            Ok(_) => Err(ResolveError::SymlinkedPath {
                request: request.to_string(),
                issuer: issuer.to_path_buf(),
                real_issuer,
            }),
            Err(_) => Err(original),
        }
    }

    pub(crate) fn extensions<'a>(&'a self, options: &'a ResolveOptions) -> &'a [String] {
        options
            .extensions
            .as_deref()
            .unwrap_or(&self.config.extensions)
    }
}

/// Canonicalize an issuer, keeping its trailing-slash directory marker.
fn canonical_issuer(issuer: &Path) -> Option<PathBuf> {
    let real = dunce::canonicalize(issuer).ok()?;

    if paths::denotes_directory(issuer) && !paths::denotes_directory(&real) {
        let mut os = real.into_os_string();
        os.push("/");
        return Some(PathBuf::from(os));
    }

    Some(real)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LocationRecord, PackageRecord};
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn package(
        name: Option<&str>,
        reference: Option<&str>,
        location: &str,
        dependencies: &[(&str, Option<&str>)],
    ) -> PackageRecord {
        PackageRecord {
            name: name.map(ToString::to_string),
            reference: reference.map(ToString::to_string),
            location: location.to_string(),
            dependencies: dependencies
                .iter()
                .map(|(dep, dep_ref)| ((*dep).to_string(), dep_ref.map(ToString::to_string)))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn owned_location(path: &str, name: Option<&str>, reference: Option<&str>) -> LocationRecord {
        LocationRecord {
            path: path.to_string(),
            blacklisted: false,
            name: name.map(ToString::to_string),
            reference: reference.map(ToString::to_string),
        }
    }

    /// A project with a top-level package depending on "dep", which in
    /// turn carries an unsatisfied peer and a dangling declared edge.
    /// The root is canonicalized so symlink assertions stay meaningful
    /// on platforms with symlinked temp directories.
    fn fixture() -> (TempDir, PathBuf, Resolver) {
        let dir = TempDir::new().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        let root = root.as_path();

        fs::create_dir_all(root.join("store/dep/lib")).unwrap();
        fs::write(root.join("index.js"), "").unwrap();
        fs::write(root.join("store/dep/entry.js"), "").unwrap();
        fs::write(root.join("store/dep/lib/util.js"), "").unwrap();
        fs::write(
            root.join("store/dep/package.json"),
            r#"{ "name": "dep", "main": "entry.js" }"#,
        )
        .unwrap();

        let packages = vec![
            package(None, None, "./", &[("dep", Some("1.0.0"))]),
            package(
                Some("dep"),
                Some("1.0.0"),
                "./store/dep/",
                &[("peer-thing", None), ("ghost", Some("9.9.9"))],
            ),
            // Declared and referenced, but never materialized on disk.
            package(Some("ghost"), Some("9.9.9"), "", &[]),
        ];
        let locations = vec![
            owned_location("./", None, None),
            owned_location("./store/dep/", Some("dep"), Some("1.0.0")),
        ];

        let graph =
            DependencyGraph::from_records(root.to_path_buf(), packages, locations);
        let root = root.to_path_buf();
        (dir, root, Resolver::new(graph))
    }

    #[test]
    fn test_combined_resolution_uses_manifest_main() {
        let (_dir, root, resolver) = fixture();
        let issuer = root.join("index.js");

        let resolution = resolver
            .resolve_request("dep", &issuer, &ResolveOptions::default())
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::Path(root.join("store/dep/entry.js"))
        );
    }

    #[test]
    fn test_combined_resolution_subpath() {
        let (_dir, root, resolver) = fixture();
        let issuer = root.join("index.js");

        let resolution = resolver
            .resolve_request("dep/lib/util", &issuer, &ResolveOptions::default())
            .unwrap();
        assert_eq!(
            resolution,
            Resolution::Path(root.join("store/dep/lib/util.js"))
        );
    }

    #[test]
    fn test_builtins_defer_to_host() {
        let (_dir, root, resolver) = fixture();
        let issuer = root.join("index.js");

        let resolution = resolver
            .resolve_request("fs", &issuer, &ResolveOptions::default())
            .unwrap();
        assert_eq!(resolution, Resolution::Deferred);

        // With builtins out of consideration, "fs" is an ordinary (and
        // here undeclared) package name.
        let options = ResolveOptions {
            consider_builtins: false,
            ..ResolveOptions::default()
        };
        let error = resolver.resolve_request("fs", &issuer, &options).unwrap_err();
        assert_eq!(error.code(), codes::UNDECLARED_DEPENDENCY);
    }

    #[test]
    fn test_api_self_reference_from_any_issuer() {
        let (_dir, root, resolver) = fixture();

        for issuer in [
            root.join("index.js"),
            root.join("store/dep/entry.js"),
            PathBuf::from("/nowhere/at/all.js"),
        ] {
            let resolution = resolver
                .resolve_request(API_MODULE_NAME, &issuer, &ResolveOptions::default())
                .unwrap();
            assert_eq!(resolution, Resolution::Api);
        }
    }

    #[test]
    fn test_identical_inputs_identical_outcome() {
        let (_dir, root, resolver) = fixture();
        let issuer = root.join("index.js");
        let options = ResolveOptions::default();

        let first = resolver.resolve_request("dep", &issuer, &options).unwrap();
        let second = resolver.resolve_request("dep", &issuer, &options).unwrap();
        assert_eq!(first, second);

        let first = resolver
            .resolve_request("left-pad", &issuer, &options)
            .unwrap_err();
        let second = resolver
            .resolve_request("left-pad", &issuer, &options)
            .unwrap_err();
        assert_eq!(first.code(), second.code());
    }

    #[test]
    fn test_deferred_variant_invokes_callback_once() {
        let (_dir, root, resolver) = fixture();
        let issuer = root.join("index.js");

        let mut calls = 0;
        resolver.resolve_request_deferred(
            "dep",
            &issuer,
            &ResolveOptions::default(),
            |outcome| {
                calls += 1;
                assert!(outcome.is_ok());
            },
        );
        assert_eq!(calls, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_issuer_is_diagnosed() {
        let (_dir, root, resolver) = fixture();

        // A symlink outside the graph pointing into the owned tree: the
        // raw issuer falls through to the host (and fails), while the
        // canonical issuer would have resolved.
        let elsewhere = TempDir::new().unwrap();
        std::os::unix::fs::symlink(root.join("store/dep"), elsewhere.path().join("alias"))
            .unwrap();

        let issuer = elsewhere.path().join("alias/entry.js");
        let error = resolver
            .resolve_request("dep", &issuer, &ResolveOptions::default())
            .unwrap_err();
        assert_eq!(error.code(), codes::SYMLINKED_PATH_DETECTED);
    }

    #[test]
    fn test_unowned_issuer_failure_is_not_masked() {
        let (_dir, _root, resolver) = fixture();

        // The canonical form of this issuer is just as unowned as the
        // raw one, so the retry cannot apply and the host failure
        // surfaces unchanged.
        let elsewhere = TempDir::new().unwrap();
        fs::write(elsewhere.path().join("script.js"), "").unwrap();

        let error = resolver
            .resolve_request(
                "dep",
                &elsewhere.path().join("script.js"),
                &ResolveOptions::default(),
            )
            .unwrap_err();
        assert_eq!(error.code(), codes::BUILTIN_RESOLUTION_FAIL);
    }
}
